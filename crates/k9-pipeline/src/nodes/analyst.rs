//! Cognitive consolidation of the engine facts
//!
//! Reads `analysis.engine` and `risk_enrichment`, writes the sibling
//! judgement subtrees. Tolerates empty upstream data.
//!
//! Without enrichment every risk receives the global OPG/OCC counts and is
//! flagged [`CountsScope::Global`]; all risks then share one support level.

use super::NodeContext;
use crate::analysis::{
    Alignment, CountsScope, EngineFacts, OccRecord, OperationalEvidence, ProactiveAlignment, RiskEnrichment,
    RiskObservations, RiskSummary, RiskTrajectory, SupportLevel, TemporalState, ThresholdFlag, ThresholdRule,
    ThresholdStatus, Thresholds,
};
use super::data_engine::{OCC, OPG};
use crate::error::PipelineError;
use crate::state::PipelineState;
use std::collections::{BTreeMap, BTreeSet};

/// Consolidate engine output into judgements
///
/// # Errors
/// Never fails.
pub fn run(mut state: PipelineState, _ctx: &NodeContext) -> Result<PipelineState, PipelineError> {
    let context = state
        .context_bundle
        .as_ref()
        .map(|c| (c.version_contexto.clone(), c.areas_operacionales.clone()));
    let enrichment = state.risk_enrichment.clone();
    let engine = state.analysis.as_ref().and_then(|a| a.engine.clone());
    if engine.is_none() {
        tracing::warn!("Analyst running without engine facts");
    }
    let engine = engine.unwrap_or_default();

    let risk_trajectories = trajectories(&engine);
    let observations_summary = observation_support(&engine, enrichment.as_ref());
    let operational_evidence = evidence(&observations_summary, enrichment.as_ref());
    let risk_summary = summarize(&engine, &risk_trajectories, &operational_evidence);
    let proactive_comparison = compare(&engine);
    let thresholds = thresholds(&engine, &risk_trajectories);

    tracing::debug!(
        "Analyst: dominant={:?} relevant={:?} supported={}",
        risk_summary.dominant_risk,
        risk_summary.relevant_risk,
        operational_evidence.supported_risks.len()
    );
    let entry = format!(
        "Analyst: consolidación cognitiva (dominante={}, relevante={}, riesgos con soporte={}, alineaciones={}{}).",
        risk_summary.dominant_risk.as_deref().unwrap_or("ninguno"),
        risk_summary.relevant_risk.as_deref().unwrap_or("ninguno"),
        operational_evidence.supported_risks.len(),
        proactive_comparison.len(),
        if enrichment.is_none() { ", conteos globales" } else { "" }
    );

    let analysis = state.analysis_mut();
    if let Some((version, areas)) = context {
        analysis.context_version = Some(version);
        analysis.areas_analizadas = Some(areas);
    }
    analysis.risk_trajectories = Some(risk_trajectories);
    analysis.observations_summary = Some(observations_summary);
    analysis.operational_evidence = Some(operational_evidence);
    analysis.risk_summary = Some(risk_summary);
    analysis.proactive_comparison = Some(proactive_comparison);
    analysis.thresholds = Some(thresholds);
    state.note(entry);
    Ok(state)
}

fn trajectories(engine: &EngineFacts) -> BTreeMap<String, RiskTrajectory> {
    engine
        .risk_trends
        .iter()
        .map(|(risk, trend)| {
            (
                risk.clone(),
                RiskTrajectory {
                    weekly_values: trend.weekly_values.clone(),
                    trend_direction: trend.trend_direction,
                    temporal_state: TemporalState::from(trend.trend_direction),
                },
            )
        })
        .collect()
}

fn observation_support(
    engine: &EngineFacts,
    enrichment: Option<&RiskEnrichment>,
) -> BTreeMap<String, RiskObservations> {
    let mut risks: BTreeSet<&String> = engine.risk_trends.keys().collect();
    if let Some(e) = enrichment {
        risks.extend(e.by_risk.keys());
    }

    let global = |kind: &str| engine.observations.summary.by_type.get(kind).copied().unwrap_or(0);

    risks
        .into_iter()
        .map(|risk| {
            let summary = match enrichment {
                Some(e) => {
                    let linked = e.by_risk.get(risk);
                    let occ_count = linked.map_or(0, |l| l.occ_events.len());
                    let critical_control_failures = linked.map_or(0, |l| l.critical_control_failures());
                    RiskObservations {
                        opg_count: engine.observations.by_risk.get(risk).map_or(0, |c| c.opg),
                        occ_count,
                        critical_control_failures,
                        support_level: SupportLevel::from_counts(occ_count, critical_control_failures),
                        counts_scope: CountsScope::PerRisk,
                    }
                }
                None => {
                    let occ_count = global(OCC);
                    RiskObservations {
                        opg_count: global(OPG),
                        occ_count,
                        critical_control_failures: 0,
                        support_level: SupportLevel::from_counts(occ_count, 0),
                        counts_scope: CountsScope::Global,
                    }
                }
            };
            (risk.clone(), summary)
        })
        .collect()
}

fn evidence(
    support: &BTreeMap<String, RiskObservations>,
    enrichment: Option<&RiskEnrichment>,
) -> OperationalEvidence {
    let supported_risks = support
        .iter()
        .filter(|(_, s)| s.occ_count > 0 && s.support_level != SupportLevel::None)
        .map(|(risk, _)| risk.clone())
        .collect();
    let has_critical_control_failures = support
        .iter()
        .map(|(risk, s)| (risk.clone(), s.critical_control_failures > 0))
        .collect();

    let occ_enriched = enrichment
        .map(|e| {
            e.by_risk
                .iter()
                .flat_map(|(risk, events)| {
                    events.occ_events.iter().map(move |ev| OccRecord {
                        risk_id: risk.clone(),
                        week: ev.week,
                        is_control_critico: ev.is_control_critico,
                        control_critico_id: ev.control_critico_id.clone(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    OperationalEvidence {
        supported_risks,
        has_critical_control_failures,
        occ_enriched,
        total_occ: enrichment.map_or(0, |e| e.summary.total_occ),
        occ_with_critical_control: enrichment.map_or(0, |e| e.summary.occ_with_critical_control),
    }
}

/// Risk with the strictly highest mean criticality; ties keep the
/// lexicographically first id
pub(crate) fn dominant_risk(engine: &EngineFacts) -> Option<String> {
    let mut best: Option<(&String, f64)> = None;
    for (risk, signal) in &engine.weekly_signals {
        if best.map_or(true, |(_, top)| signal.avg_criticidad > top) {
            best = Some((risk, signal.avg_criticidad));
        }
    }
    best.map(|(risk, _)| risk.clone())
}

/// Degrading risk other than the dominant one with the highest mean
/// criticality, falling back to the trajectory mean
fn relevant_risk(
    engine: &EngineFacts,
    trajectories: &BTreeMap<String, RiskTrajectory>,
    dominant: Option<&str>,
) -> Option<String> {
    let mut best: Option<(&String, f64)> = None;
    for (risk, trajectory) in trajectories {
        if trajectory.temporal_state != TemporalState::Degrading || Some(risk.as_str()) == dominant {
            continue;
        }
        #[allow(clippy::cast_precision_loss)]
        let weight = engine.weekly_signals.get(risk).map_or_else(
            || {
                let values = &trajectory.weekly_values;
                values.iter().sum::<f64>() / values.len().max(1) as f64
            },
            |s| s.avg_criticidad,
        );
        if best.map_or(true, |(_, top)| weight > top) {
            best = Some((risk, weight));
        }
    }
    best.map(|(risk, _)| risk.clone())
}

fn summarize(
    engine: &EngineFacts,
    trajectories: &BTreeMap<String, RiskTrajectory>,
    evidence: &OperationalEvidence,
) -> RiskSummary {
    let dominant_risk = dominant_risk(engine);
    let relevant_risk = relevant_risk(engine, trajectories, dominant_risk.as_deref());
    let has_operational_support = dominant_risk
        .iter()
        .chain(relevant_risk.iter())
        .any(|r| evidence.supported_risks.contains(r));
    RiskSummary {
        dominant_risk,
        relevant_risk,
        has_operational_support,
    }
}

fn compare(engine: &EngineFacts) -> BTreeMap<String, ProactiveAlignment> {
    engine
        .proactivo_vs_k9
        .iter()
        .map(|(risk, cmp)| {
            (
                risk.clone(),
                ProactiveAlignment {
                    avg_rank_k9: cmp.avg_rank_k9,
                    avg_rank_proactivo: cmp.avg_rank_proactivo,
                    rank_delta: cmp.rank_delta,
                    alignment: Alignment::from_delta(cmp.rank_delta),
                },
            )
        })
        .collect()
}

fn thresholds(engine: &EngineFacts, trajectories: &BTreeMap<String, RiskTrajectory>) -> Thresholds {
    let definition = ThresholdRule::default();
    let by_risk = trajectories
        .iter()
        .map(|(risk, trajectory)| {
            let is_degrading = trajectory.temporal_state == TemporalState::Degrading;
            let is_top3_ratio = engine.weekly_signals.get(risk).map(|s| s.is_top3_ratio);
            let meets_top3_ratio = is_top3_ratio.is_some_and(|r| r >= definition.top3_ratio_min);
            let trend_ok = is_degrading || !definition.requires_degrading_trend;
            let status = if trend_ok && meets_top3_ratio {
                ThresholdStatus::ApproachingThreshold
            } else {
                ThresholdStatus::BelowThreshold
            };
            (
                risk.clone(),
                ThresholdFlag {
                    status,
                    is_degrading,
                    is_top3_ratio,
                    meets_top3_ratio,
                },
            )
        })
        .collect();
    Thresholds { definition, by_risk }
}
