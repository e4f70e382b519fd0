//! Deterministic facts from the raw tables
//!
//! No judgement happens here: trends, aggregates, counts and the raw rank
//! comparison only. Load failures and the proactive column contract are
//! fatal and propagate.

use super::NodeContext;
use crate::analysis::{
    EngineFacts, ObservationFacts, Period, ProactiveScore, RankComparison, RiskTrend, TrendDirection,
    TypeCounts, WeeklySignal,
};
use crate::error::PipelineError;
use crate::state::PipelineState;
use k9_data::{columns, Dataset, Row, Table};
use std::collections::{BTreeMap, BTreeSet};

/// Observation type for improvement opportunities
pub const OPG: &str = "OPG";
/// Observation type for critical behaviour
pub const OCC: &str = "OCC";

/// Compute engine facts into `analysis.engine`
///
/// # Errors
/// Returns [`PipelineError::Data`] if a dataset cannot be loaded or the
/// proactive table misses a required column.
pub fn run(mut state: PipelineState, ctx: &NodeContext) -> Result<PipelineState, PipelineError> {
    let data = ctx.data();

    let trajectories = data.trajectories()?;
    let (period, risk_trends) = trends(&trajectories);

    let signals = data.weekly_signals()?;
    let weekly_signals = weekly_signals(&signals, &risk_trends);

    let observations = observations(&data.observations_all()?);

    let proactive = data.proactive_weekly()?;
    let proactivo = proactive_scores(&proactive);
    let proactivo_vs_k9 = compare_ranks(&proactivo, &weekly_signals);

    tracing::debug!(
        "Data engine: {} trends, {} signals, {} observations, {} proactive risks",
        risk_trends.len(),
        weekly_signals.len(),
        observations.summary.total,
        proactivo.len()
    );

    state.analysis_mut().engine = Some(EngineFacts {
        period,
        risk_trends,
        weekly_signals,
        observations,
        proactivo,
        proactivo_vs_k9,
    });
    state.note(
        "DataEngine: análisis determinista ejecutado (trayectorias, señales, observaciones y \
         comparación Proactivo vs K9).",
    );
    Ok(state)
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.into_iter().fold((0.0, 0_u32), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / f64::from(n))
}

/// Rows sorted by week; rows without a week go last
fn by_week(table: &Table) -> Vec<Row<'_>> {
    let mut rows: Vec<Row<'_>> = table.rows().collect();
    rows.sort_by_key(|r| {
        let week = r.i64(columns::WEEK);
        (week.is_none(), week)
    });
    rows
}

fn trends(table: &Table) -> (Period, BTreeMap<String, RiskTrend>) {
    let weeks: Vec<i64> = table
        .rows()
        .filter_map(|r| r.i64(columns::WEEK))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let period = Period {
        min_week: weeks.first().copied(),
        max_week: weeks.last().copied(),
        weeks,
    };

    let sorted = by_week(table);
    let risk_trends = table
        .columns()
        .filter_map(|column| columns::trajectory_risk(column).map(|risk| (column, risk)))
        .map(|(column, risk)| {
            let weekly_values: Vec<f64> = sorted.iter().filter_map(|r| r.f64(column)).collect();
            let trend_direction = TrendDirection::of(&weekly_values);
            (risk.to_string(), RiskTrend { weekly_values, trend_direction })
        })
        .collect();

    (period, risk_trends)
}

fn weekly_signals(table: &Table, risk_trends: &BTreeMap<String, RiskTrend>) -> BTreeMap<String, WeeklySignal> {
    let mut out = BTreeMap::new();
    for risk in risk_trends.keys() {
        let rows: Vec<Row<'_>> = table
            .rows()
            .filter(|r| r.str(columns::RISK_ID).as_deref() == Some(risk.as_str()))
            .collect();

        let Some(avg_criticidad) = mean(
            rows.iter()
                .filter_map(|r| r.f64(columns::CRITICALITY).or_else(|| r.f64(columns::SCORE))),
        ) else {
            continue;
        };

        let top3_weeks = rows.iter().filter(|r| r.bool(columns::IS_TOP3) == Some(true)).count();
        let total_weeks = rows
            .iter()
            .filter_map(|r| r.i64(columns::WEEK))
            .collect::<BTreeSet<_>>()
            .len();
        #[allow(clippy::cast_precision_loss)]
        let is_top3_ratio = if total_weeks > 0 {
            top3_weeks as f64 / total_weeks as f64
        } else {
            0.0
        };

        out.insert(
            risk.clone(),
            WeeklySignal {
                avg_criticidad,
                avg_rank_pos: mean(rows.iter().filter_map(|r| r.f64(columns::RANK_POS))),
                top3_weeks,
                total_weeks,
                is_top3_ratio,
            },
        );
    }
    out
}

fn observations(table: &Table) -> ObservationFacts {
    let mut facts = ObservationFacts {
        sources: vec![
            Dataset::ObservationsBaseline.file_stem().to_string(),
            Dataset::ObservationsHighFrequency.file_stem().to_string(),
        ],
        ..ObservationFacts::default()
    };
    facts.summary.total = table.len();
    for kind in [OPG, OCC] {
        facts.summary.by_type.insert(kind.to_string(), 0);
        facts.weekly.insert(kind.to_string(), BTreeMap::new());
    }

    for row in table.rows() {
        let Some(kind) = row.str(columns::OBSERVATION_TYPE) else {
            continue;
        };
        if kind != OPG && kind != OCC {
            continue;
        }
        *facts.summary.by_type.entry(kind.clone()).or_default() += 1;
        if let Some(week) = row.i64(columns::WEEK) {
            *facts.weekly.entry(kind.clone()).or_default().entry(week).or_default() += 1;
        }
        if let Some(risk) = row.str(columns::RISK_ID) {
            let counts: &mut TypeCounts = facts.by_risk.entry(risk).or_default();
            if kind == OPG {
                counts.opg += 1;
            } else {
                counts.occ += 1;
            }
        }
    }
    facts
}

fn proactive_scores(table: &Table) -> BTreeMap<String, ProactiveScore> {
    let mut grouped: BTreeMap<String, Vec<Row<'_>>> = BTreeMap::new();
    for row in table.rows() {
        if let Some(risk) = row.str(columns::RISK_ID) {
            grouped.entry(risk).or_default().push(row);
        }
    }

    grouped
        .into_iter()
        .filter_map(|(risk, rows)| {
            let avg_score_proactivo = mean(rows.iter().filter_map(|r| r.f64(columns::PROACTIVE_SCORE)))?;
            let avg_rank_proactivo = mean(rows.iter().filter_map(|r| r.f64(columns::PROACTIVE_RANK)))?;
            let weeks_considered = rows
                .iter()
                .filter_map(|r| r.i64(columns::WEEK_ID))
                .collect::<BTreeSet<_>>()
                .len();
            Some((
                risk,
                ProactiveScore {
                    avg_score_proactivo,
                    avg_rank_proactivo,
                    weeks_considered,
                },
            ))
        })
        .collect()
}

fn compare_ranks(
    proactivo: &BTreeMap<String, ProactiveScore>,
    signals: &BTreeMap<String, WeeklySignal>,
) -> BTreeMap<String, RankComparison> {
    proactivo
        .iter()
        .filter_map(|(risk, p)| {
            let avg_rank_k9 = signals.get(risk)?.avg_rank_pos?;
            Some((
                risk.clone(),
                RankComparison {
                    avg_rank_k9,
                    avg_rank_proactivo: p.avg_rank_proactivo,
                    rank_delta: p.avg_rank_proactivo - avg_rank_k9,
                },
            ))
        })
        .collect()
}
