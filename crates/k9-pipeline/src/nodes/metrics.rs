//! Renderable metrics and the single visualization hint
//!
//! Read-only over every cognitive subtree; the only write is
//! `analysis.metrics`.

use super::NodeContext;
use crate::analysis::{
    Analysis, ChartType, Metrics, Rankings, RisksByRole, Tables, TimeSeries, VisualSuggestion,
};
use crate::error::PipelineError;
use crate::state::PipelineState;
use crate::text::{Keyword, QueryText};
use std::collections::{BTreeMap, BTreeSet};

/// Explicit comparison language
const COMPARE: &[Keyword] = &[Keyword::Phrase("compar"), Keyword::Phrase("versus"), Keyword::Word("vs")];

/// Build `analysis.metrics`
///
/// # Errors
/// Never fails.
pub fn run(mut state: PipelineState, _ctx: &NodeContext) -> Result<PipelineState, PipelineError> {
    let query = QueryText::new(state.user_query());
    let Some(metrics) = state.analysis.as_ref().map(|a| build(a, &query)) else {
        state.note("Metrics: analysis no disponible, no se generan métricas.");
        return Ok(state);
    };

    let suggestion = metrics
        .visual_suggestions
        .first()
        .map_or_else(|| "ninguna".to_string(), |s| s.metric.clone());
    tracing::debug!("Metrics: suggestion {}", suggestion);
    state.analysis_mut().metrics = Some(metrics);
    state.note(format!(
        "Metrics: métricas deterministas generadas a partir del analysis (sugerencia: {suggestion})."
    ));
    Ok(state)
}

fn build(analysis: &Analysis, query: &QueryText) -> Metrics {
    let risk_summary = analysis.risk_summary.as_ref();
    let trajectories = analysis.risk_trajectories.as_ref().filter(|t| !t.is_empty());
    let evidence = analysis.operational_evidence.as_ref();

    let rankings = Rankings {
        risks_by_role: risk_summary.map(|s| RisksByRole {
            dominant_risk: s.dominant_risk.clone(),
            relevant_risk: s.relevant_risk.clone(),
        }),
    };
    let time_series = TimeSeries {
        risk_trajectories: trajectories.cloned(),
    };
    let tables = Tables {
        occ_by_risk: evidence.map(|e| {
            let mut counts: BTreeMap<String, usize> = BTreeMap::new();
            for record in &e.occ_enriched {
                *counts.entry(record.risk_id.clone()).or_default() += 1;
            }
            counts
        }),
    };

    let visual_suggestions = suggest(analysis, query).into_iter().take(1).collect();

    Metrics {
        rankings,
        time_series,
        tables,
        visual_suggestions,
    }
}

/// First matching rule wins
fn suggest(analysis: &Analysis, query: &QueryText) -> Option<VisualSuggestion> {
    let risk_summary = analysis.risk_summary.as_ref();

    // rule 1: time evolution
    if let Some(trajectories) = &analysis.risk_trajectories {
        let with_series: Vec<String> = trajectories
            .iter()
            .filter(|(_, t)| t.weekly_values.len() >= 2)
            .map(|(risk, _)| risk.clone())
            .collect();
        if !with_series.is_empty() {
            return Some(VisualSuggestion {
                chart: ChartType::LineChart,
                metric: "risk_trajectories".to_string(),
                entities: with_series,
                why: "Existen trayectorias temporales por riesgo".to_string(),
                question: "¿Quieres ver la evolución temporal de los riesgos?".to_string(),
            });
        }
    }

    // rule 2: multi-risk comparison
    let mut comparable: BTreeSet<String> = BTreeSet::new();
    if let Some(trajectories) = &analysis.risk_trajectories {
        comparable.extend(trajectories.keys().cloned());
    }
    if let Some(evidence) = &analysis.operational_evidence {
        comparable.extend(evidence.supported_risks.iter().cloned());
    }
    if query.contains_any(COMPARE) {
        if let Some(summary) = risk_summary {
            comparable.extend(summary.named().into_iter().map(str::to_string));
        }
    }
    if comparable.len() >= 2 {
        let entities: Vec<String> = comparable.into_iter().collect();
        return Some(VisualSuggestion {
            chart: ChartType::BarChart,
            metric: "risk_comparison".to_string(),
            question: format!("¿Quieres comparar métricamente los riesgos {}?", entities.join(", ")),
            entities,
            why: "Existen múltiples riesgos comparables en el análisis".to_string(),
        });
    }

    // rule 3: priority ranking
    let entities: Vec<String> = risk_summary
        .map(|s| s.named().into_iter().map(str::to_string).collect())
        .unwrap_or_default();
    if !entities.is_empty() {
        return Some(VisualSuggestion {
            chart: ChartType::BarChart,
            metric: "risk_priority".to_string(),
            entities,
            why: "Existe jerarquía de riesgos (dominante vs relevante)".to_string(),
            question: "¿Quieres ver el ranking de riesgos por prioridad?".to_string(),
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{
        OccRecord, OperationalEvidence, RiskSummary, RiskTrajectory, TemporalState, TrendDirection,
    };
    use pretty_assertions::assert_eq;

    fn trajectory(values: &[f64]) -> RiskTrajectory {
        RiskTrajectory {
            weekly_values: values.to_vec(),
            trend_direction: TrendDirection::Flat,
            temporal_state: TemporalState::Stable,
        }
    }

    fn summary(dominant: Option<&str>, relevant: Option<&str>) -> RiskSummary {
        RiskSummary {
            dominant_risk: dominant.map(str::to_string),
            relevant_risk: relevant.map(str::to_string),
            has_operational_support: false,
        }
    }

    fn metrics_for(query: &str, analysis: Analysis) -> Metrics {
        let state = PipelineState::new(query).with_analysis(analysis);
        run(state, &NodeContext::empty()).unwrap().analysis.unwrap().metrics.unwrap()
    }

    #[test]
    fn line_chart_wins_when_any_series_has_two_points() {
        let mut trajectories = BTreeMap::new();
        trajectories.insert("R01".to_string(), trajectory(&[0.1, 0.2]));
        trajectories.insert("R02".to_string(), trajectory(&[0.3]));
        let m = metrics_for(
            "comparar riesgos",
            Analysis {
                risk_trajectories: Some(trajectories),
                risk_summary: Some(summary(Some("R02"), Some("R01"))),
                ..Analysis::default()
            },
        );
        assert_eq!(m.visual_suggestions.len(), 1);
        let s = &m.visual_suggestions[0];
        assert_eq!(s.chart, ChartType::LineChart);
        assert_eq!(s.metric, "risk_trajectories");
        assert_eq!(s.entities, vec!["R01"]);
        assert!(s.question.contains("evolución"));
    }

    #[test]
    fn comparison_from_supported_and_compared_risks() {
        let m = metrics_for(
            "R01 vs R03",
            Analysis {
                operational_evidence: Some(OperationalEvidence {
                    supported_risks: vec!["R03".into()],
                    ..OperationalEvidence::default()
                }),
                risk_summary: Some(summary(Some("R01"), None)),
                ..Analysis::default()
            },
        );
        let s = &m.visual_suggestions[0];
        assert_eq!(s.metric, "risk_comparison");
        assert_eq!(s.entities, vec!["R01", "R03"]);
        assert!(s.question.contains("comparar"));
    }

    #[test]
    fn compare_word_must_be_whole_for_vs() {
        // "invsersion" contains "vs" but is not comparison language
        let m = metrics_for(
            "invsersion",
            Analysis {
                operational_evidence: Some(OperationalEvidence {
                    supported_risks: vec!["R03".into()],
                    ..OperationalEvidence::default()
                }),
                risk_summary: Some(summary(Some("R01"), None)),
                ..Analysis::default()
            },
        );
        assert_eq!(m.visual_suggestions[0].metric, "risk_priority");
    }

    #[test]
    fn priority_chart_over_named_risks() {
        let m = metrics_for(
            "resumen",
            Analysis {
                risk_summary: Some(summary(Some("R02"), Some("R01"))),
                ..Analysis::default()
            },
        );
        let s = &m.visual_suggestions[0];
        assert_eq!(s.metric, "risk_priority");
        assert_eq!(s.entities, vec!["R02", "R01"]);
        assert!(s.question.contains("ranking"));
        assert_eq!(m.rankings.risks_by_role.unwrap().dominant_risk.as_deref(), Some("R02"));
    }

    #[test]
    fn no_suggestion_without_risks() {
        let m = metrics_for("resumen", Analysis::default());
        assert!(m.visual_suggestions.is_empty());
    }

    #[test]
    fn occ_table_counts_by_risk() {
        let record = |risk: &str| OccRecord {
            risk_id: risk.into(),
            week: Some(1),
            is_control_critico: false,
            control_critico_id: None,
        };
        let m = metrics_for(
            "q",
            Analysis {
                operational_evidence: Some(OperationalEvidence {
                    occ_enriched: vec![record("R01"), record("R01"), record("R02")],
                    ..OperationalEvidence::default()
                }),
                ..Analysis::default()
            },
        );
        let table = m.tables.occ_by_risk.unwrap();
        assert_eq!(table["R01"], 2);
        assert_eq!(table["R02"], 1);
    }

    #[test]
    fn does_not_touch_other_subtrees() {
        let mut trajectories = BTreeMap::new();
        trajectories.insert("R01".to_string(), trajectory(&[0.1, 0.2]));
        let before = Analysis {
            risk_trajectories: Some(trajectories),
            risk_summary: Some(summary(Some("R01"), None)),
            ..Analysis::default()
        };
        let state = run(PipelineState::new("q").with_analysis(before.clone()), &NodeContext::empty()).unwrap();
        let mut after = state.analysis.unwrap();
        assert!(after.metrics.is_some());
        after.metrics = None;
        assert_eq!(after, before);
    }

    #[test]
    fn missing_analysis_is_noted() {
        let state = run(PipelineState::new("q"), &NodeContext::empty()).unwrap();
        assert!(state.analysis.is_none());
        assert!(state.reasoning()[0].contains("no disponible"));
    }
}
