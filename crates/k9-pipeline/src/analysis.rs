//! Structured fact store accumulated by the analytic nodes
//!
//! Each node owns one subtree of [`Analysis`] and only ever replaces that
//! subtree as a whole. Maps are `BTreeMap` keyed by risk id so iteration
//! order is lexicographic and stable across runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Two-point trend of a weekly series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    /// Last value above first
    Up,
    /// Last value below first
    Down,
    /// Equal, or fewer than two points
    Flat,
}

impl TrendDirection {
    /// Compare first and last value only; fewer than two points is flat
    #[must_use]
    pub fn of(values: &[f64]) -> Self {
        match (values.first(), values.last()) {
            (Some(first), Some(last)) if values.len() >= 2 => {
                if last > first {
                    TrendDirection::Up
                } else if last < first {
                    TrendDirection::Down
                } else {
                    TrendDirection::Flat
                }
            }
            _ => TrendDirection::Flat,
        }
    }
}

/// Cognitive reading of a trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalState {
    /// Trend going up
    Degrading,
    /// Trend going down
    Improving,
    /// Flat trend
    Stable,
}

impl From<TrendDirection> for TemporalState {
    fn from(direction: TrendDirection) -> Self {
        match direction {
            TrendDirection::Up => TemporalState::Degrading,
            TrendDirection::Down => TemporalState::Improving,
            TrendDirection::Flat => TemporalState::Stable,
        }
    }
}

/// Strength of observational backing for a risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportLevel {
    /// No linked critical-behaviour observations
    None,
    /// Linked observations without a critical control
    Moderate,
    /// At least one linked observation implicates a critical control
    Strong,
}

impl SupportLevel {
    /// Classify from linked OCC and critical-control counts
    #[must_use]
    pub fn from_counts(occ_count: usize, critical_control_failures: usize) -> Self {
        if critical_control_failures > 0 {
            SupportLevel::Strong
        } else if occ_count > 0 {
            SupportLevel::Moderate
        } else {
            SupportLevel::None
        }
    }
}

/// Relationship between the proactive ranking and the internal ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Ranks within one position
    Aligned,
    /// Proactive rank number higher, so the risk is ranked lower
    UnderestimatedByProactive,
    /// Proactive rank number lower, so the risk is ranked higher
    OverestimatedByProactive,
    /// No usable delta
    Inconclusive,
}

impl Alignment {
    /// Rank-delta band half width
    pub const TOLERANCE: f64 = 1.0;

    /// Classify `rank_delta = proactive_rank - internal_rank`
    #[must_use]
    pub fn from_delta(rank_delta: f64) -> Self {
        if !rank_delta.is_finite() {
            Alignment::Inconclusive
        } else if rank_delta > Self::TOLERANCE {
            Alignment::UnderestimatedByProactive
        } else if rank_delta < -Self::TOLERANCE {
            Alignment::OverestimatedByProactive
        } else {
            Alignment::Aligned
        }
    }

    /// Tag as written in state maps
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Aligned => "aligned",
            Alignment::UnderestimatedByProactive => "underestimated_by_proactive",
            Alignment::OverestimatedByProactive => "overestimated_by_proactive",
            Alignment::Inconclusive => "inconclusive",
        }
    }
}

/// Whether a risk is near the attention threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdStatus {
    /// Degrading and frequently in the top three
    ApproachingThreshold,
    /// Anything else
    BelowThreshold,
}

/// Where observation counts came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountsScope {
    /// Counts linked to this risk
    PerRisk,
    /// Global counts reused for every risk
    Global,
}

/// Chart type handed to the rendering layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    /// Time series
    LineChart,
    /// Categorical comparison
    BarChart,
}

/// Whole analysis tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Analysis {
    /// Context bundle version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_version: Option<String>,
    /// Areas covered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub areas_analizadas: Option<Vec<String>>,
    /// Deterministic facts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineFacts>,
    /// Per-risk temporal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_trajectories: Option<BTreeMap<String, RiskTrajectory>>,
    /// Per-risk observational support
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations_summary: Option<BTreeMap<String, RiskObservations>>,
    /// Aggregated operational evidence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operational_evidence: Option<OperationalEvidence>,
    /// Dominant and relevant risk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_summary: Option<RiskSummary>,
    /// Per-risk ranking alignment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proactive_comparison: Option<BTreeMap<String, ProactiveAlignment>>,
    /// Threshold flags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Thresholds>,
    /// Renderable metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    /// Proactive model explanation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proactive_explanation: Option<ProactiveExplanation>,
}

/// Facts computed by the data engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineFacts {
    /// Week range
    pub period: Period,
    /// Per-risk trajectory trend
    pub risk_trends: BTreeMap<String, RiskTrend>,
    /// Per-risk weekly signal aggregates
    pub weekly_signals: BTreeMap<String, WeeklySignal>,
    /// Observation counts
    pub observations: ObservationFacts,
    /// Proactive model aggregates
    pub proactivo: BTreeMap<String, ProactiveScore>,
    /// Proactive vs internal rank
    pub proactivo_vs_k9: BTreeMap<String, RankComparison>,
}

/// Week range of the trajectory table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// First week
    pub min_week: Option<i64>,
    /// Last week
    pub max_week: Option<i64>,
    /// Sorted distinct weeks
    pub weeks: Vec<i64>,
}

/// Weekly series and direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskTrend {
    /// Values sorted by week
    pub weekly_values: Vec<f64>,
    /// Direction
    pub trend_direction: TrendDirection,
}

/// Aggregates from the weekly signal table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySignal {
    /// Mean criticality
    pub avg_criticidad: f64,
    /// Mean internal rank
    pub avg_rank_pos: Option<f64>,
    /// Weeks flagged top three
    pub top3_weeks: usize,
    /// Distinct weeks present
    pub total_weeks: usize,
    /// `top3_weeks / total_weeks`
    pub is_top3_ratio: f64,
}

/// Observation counts across both observation tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationFacts {
    /// Totals
    pub summary: ObservationTotals,
    /// Type to week to count
    pub weekly: BTreeMap<String, BTreeMap<i64, usize>>,
    /// Per-risk counts, rows with a risk id only
    pub by_risk: BTreeMap<String, TypeCounts>,
    /// Logical names of the source tables
    pub sources: Vec<String>,
}

/// Observation totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationTotals {
    /// All rows
    pub total: usize,
    /// Rows per observation type
    pub by_type: BTreeMap<String, usize>,
}

/// OPG and OCC counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounts {
    /// Improvement opportunities
    pub opg: usize,
    /// Critical-behaviour observations
    pub occ: usize,
}

/// Proactive model aggregates for one risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProactiveScore {
    /// Mean score
    pub avg_score_proactivo: f64,
    /// Mean rank
    pub avg_rank_proactivo: f64,
    /// Distinct weeks
    pub weeks_considered: usize,
}

/// Internal and proactive rank for one risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankComparison {
    /// Mean internal rank
    pub avg_rank_k9: f64,
    /// Mean proactive rank
    pub avg_rank_proactivo: f64,
    /// `avg_rank_proactivo - avg_rank_k9`
    pub rank_delta: f64,
}

/// Trajectory with temporal state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskTrajectory {
    /// Values sorted by week
    pub weekly_values: Vec<f64>,
    /// Direction
    pub trend_direction: TrendDirection,
    /// Derived one to one from direction
    pub temporal_state: TemporalState,
}

/// Observational support for one risk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskObservations {
    /// OPG count
    pub opg_count: usize,
    /// OCC count
    pub occ_count: usize,
    /// OCC implicating a critical control
    pub critical_control_failures: usize,
    /// Support level
    pub support_level: SupportLevel,
    /// Whether counts are per risk or global
    pub counts_scope: CountsScope,
}

/// Aggregated operational evidence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationalEvidence {
    /// Risks with OCC and non-none support, sorted
    pub supported_risks: Vec<String>,
    /// Per-risk critical-control failure flag
    pub has_critical_control_failures: BTreeMap<String, bool>,
    /// Flattened OCC events
    pub occ_enriched: Vec<OccRecord>,
    /// Total linked OCC
    pub total_occ: usize,
    /// Linked OCC with a critical control
    pub occ_with_critical_control: usize,
}

/// One OCC event with its risk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccRecord {
    /// Risk id
    pub risk_id: String,
    /// Week
    pub week: Option<i64>,
    /// Critical control implicated
    pub is_control_critico: bool,
    /// Critical control id
    pub control_critico_id: Option<String>,
}

/// Dominant vs relevant risk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSummary {
    /// Highest mean criticality
    pub dominant_risk: Option<String>,
    /// Different, degrading risk
    pub relevant_risk: Option<String>,
    /// Any named risk is operationally supported
    pub has_operational_support: bool,
}

impl RiskSummary {
    /// Named risks, dominant first
    #[must_use]
    pub fn named(&self) -> Vec<&str> {
        self.dominant_risk
            .iter()
            .chain(self.relevant_risk.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Ranking alignment for one risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProactiveAlignment {
    /// Mean internal rank
    pub avg_rank_k9: f64,
    /// Mean proactive rank
    pub avg_rank_proactivo: f64,
    /// Signed delta
    pub rank_delta: f64,
    /// Classification
    pub alignment: Alignment,
}

/// Threshold flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Fixed rule
    pub definition: ThresholdRule,
    /// Per-risk result
    pub by_risk: BTreeMap<String, ThresholdFlag>,
}

/// Fixed threshold rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    /// Trend must be degrading
    pub requires_degrading_trend: bool,
    /// Minimum top-three ratio
    pub top3_ratio_min: f64,
}

impl Default for ThresholdRule {
    fn default() -> Self {
        Self {
            requires_degrading_trend: true,
            top3_ratio_min: 0.5,
        }
    }
}

/// Threshold result for one risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdFlag {
    /// Status
    pub status: ThresholdStatus,
    /// Trend is degrading
    pub is_degrading: bool,
    /// Observed ratio, absent without weekly signals
    pub is_top3_ratio: Option<f64>,
    /// Ratio meets the minimum
    pub meets_top3_ratio: bool,
}

/// Renderable metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Rankings
    pub rankings: Rankings,
    /// Time series
    pub time_series: TimeSeries,
    /// Tables
    pub tables: Tables,
    /// Zero or one suggestion
    pub visual_suggestions: Vec<VisualSuggestion>,
}

/// Rankings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rankings {
    /// Risks by role
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risks_by_role: Option<RisksByRole>,
}

/// Dominant and relevant risk for rendering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RisksByRole {
    /// Dominant
    pub dominant_risk: Option<String>,
    /// Relevant
    pub relevant_risk: Option<String>,
}

/// Time series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Trajectories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_trajectories: Option<BTreeMap<String, RiskTrajectory>>,
}

/// Tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tables {
    /// OCC count per risk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occ_by_risk: Option<BTreeMap<String, usize>>,
}

/// Visualization hint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualSuggestion {
    /// Chart type
    #[serde(rename = "type")]
    pub chart: ChartType,
    /// Metric name
    pub metric: String,
    /// Risk ids
    pub entities: Vec<String>,
    /// Rule that produced it
    pub why: String,
    /// Prompt offered to the user
    pub question: String,
}

/// Proactive model explanation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProactiveExplanation {
    /// Overall status
    pub alignment_status: Alignment,
    /// Risks covered
    pub explained_risks: Vec<String>,
    /// Per-risk text
    pub explanations: BTreeMap<String, String>,
}

/// OCC linkage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskEnrichment {
    /// Per-risk events
    pub by_risk: BTreeMap<String, RiskOccEvents>,
    /// Totals
    pub summary: EnrichmentSummary,
}

/// OCC events for one risk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskOccEvents {
    /// Events
    pub occ_events: Vec<OccEvent>,
}

impl RiskOccEvents {
    /// Events implicating a critical control
    #[must_use]
    pub fn critical_control_failures(&self) -> usize {
        self.occ_events.iter().filter(|e| e.is_control_critico).count()
    }
}

/// One OCC event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccEvent {
    /// Week
    pub week: Option<i64>,
    /// Critical control implicated
    pub is_control_critico: bool,
    /// Critical control id
    pub control_critico_id: Option<String>,
}

/// Enrichment totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentSummary {
    /// Linked OCC
    pub total_occ: usize,
    /// Linked OCC with a critical control id
    pub occ_with_critical_control: usize,
    /// Sorted risk ids
    pub risks_affected: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_compares_endpoints_only() {
        assert_eq!(TrendDirection::of(&[0.4, 0.45, 0.5]), TrendDirection::Up);
        assert_eq!(TrendDirection::of(&[0.7, 0.7, 0.69]), TrendDirection::Down);
        assert_eq!(TrendDirection::of(&[0.5, 0.9, 0.5]), TrendDirection::Flat);
        assert_eq!(TrendDirection::of(&[0.9]), TrendDirection::Flat);
        assert_eq!(TrendDirection::of(&[]), TrendDirection::Flat);
    }

    #[test]
    fn temporal_state_is_one_to_one() {
        assert_eq!(TemporalState::from(TrendDirection::Up), TemporalState::Degrading);
        assert_eq!(TemporalState::from(TrendDirection::Down), TemporalState::Improving);
        assert_eq!(TemporalState::from(TrendDirection::Flat), TemporalState::Stable);
    }

    #[test]
    fn alignment_bands() {
        assert_eq!(Alignment::from_delta(0.0), Alignment::Aligned);
        assert_eq!(Alignment::from_delta(1.0), Alignment::Aligned);
        assert_eq!(Alignment::from_delta(-1.0), Alignment::Aligned);
        assert_eq!(Alignment::from_delta(1.5), Alignment::UnderestimatedByProactive);
        assert_eq!(Alignment::from_delta(-2.0), Alignment::OverestimatedByProactive);
        assert_eq!(Alignment::from_delta(f64::NAN), Alignment::Inconclusive);
    }

    #[test]
    fn support_level_from_counts() {
        assert_eq!(SupportLevel::from_counts(0, 0), SupportLevel::None);
        assert_eq!(SupportLevel::from_counts(3, 0), SupportLevel::Moderate);
        assert_eq!(SupportLevel::from_counts(3, 1), SupportLevel::Strong);
    }

    #[test]
    fn suggestion_serializes_type_field() {
        let s = VisualSuggestion {
            chart: ChartType::LineChart,
            metric: "risk_trajectories".into(),
            entities: vec!["R01".into()],
            why: "x".into(),
            question: "y".into(),
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["type"], "line_chart");
    }

    #[test]
    fn empty_analysis_serializes_to_empty_object() {
        let v = serde_json::to_value(Analysis::default()).unwrap();
        assert_eq!(v, serde_json::json!({}));
    }
}
