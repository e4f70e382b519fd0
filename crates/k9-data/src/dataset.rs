//! Dataset catalogue
//!
//! Logical names of the read-only tables consumed by the pipeline, plus the
//! column names each consumer relies on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical dataset identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    /// Weekly risk trajectories (one column per risk)
    Trajectories,
    /// Weekly internal risk signals and rankings
    WeeklySignals,
    /// Baseline observations, carries risk and critical-control linkage
    ObservationsBaseline,
    /// Higher-frequency observations, usually without risk linkage
    ObservationsHighFrequency,
    /// Independent proactive model output
    ProactiveWeekly,
}

impl Dataset {
    /// Every dataset, in load order
    pub const ALL: [Dataset; 5] = [
        Dataset::Trajectories,
        Dataset::WeeklySignals,
        Dataset::ObservationsBaseline,
        Dataset::ObservationsHighFrequency,
        Dataset::ProactiveWeekly,
    ];

    /// File stem on disk
    #[inline]
    #[must_use]
    pub fn file_stem(self) -> &'static str {
        match self {
            Dataset::Trajectories => "stde_trayectorias_semanales",
            Dataset::WeeklySignals => "k9_weekly_signals",
            Dataset::ObservationsBaseline => "stde_observaciones",
            Dataset::ObservationsHighFrequency => "stde_observaciones_12s",
            Dataset::ProactiveWeekly => "stde_proactivo_semanal_v4_4",
        }
    }

    /// File name on disk
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}.json", self.file_stem())
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

/// Column names shared by the datasets
pub mod columns {
    /// Week number
    pub const WEEK: &str = "semana";
    /// Week number in the proactive dataset
    pub const WEEK_ID: &str = "semana_id";
    /// Risk identifier
    pub const RISK_ID: &str = "riesgo_id";
    /// Mean criticality in the weekly signals
    pub const CRITICALITY: &str = "criticidad_media";
    /// Alternative criticality column name
    pub const SCORE: &str = "score";
    /// Internal rank position
    pub const RANK_POS: &str = "rank_pos";
    /// Top-3 flag
    pub const IS_TOP3: &str = "is_top3";
    /// Observation type
    pub const OBSERVATION_TYPE: &str = "tipo_observacion";
    /// Critical-control flag
    pub const IS_CRITICAL_CONTROL: &str = "is_control_critico";
    /// Critical-control identifier
    pub const CRITICAL_CONTROL_ID: &str = "control_critico_id";
    /// Proactive model score
    pub const PROACTIVE_SCORE: &str = "score_proactivo";
    /// Proactive model rank
    pub const PROACTIVE_RANK: &str = "rank_proactivo";

    /// Prefix of per-risk trajectory columns
    pub const TRAJECTORY_PREFIX: &str = "criticidad_";
    /// Suffix of per-risk trajectory columns
    pub const TRAJECTORY_SUFFIX: &str = "_media";
    /// Aggregate trajectory column, not a risk
    pub const TRAJECTORY_GLOBAL: &str = "criticidad_global_media";

    /// Columns the proactive dataset must expose
    pub const PROACTIVE_REQUIRED: [&str; 4] = [WEEK_ID, RISK_ID, PROACTIVE_SCORE, PROACTIVE_RANK];

    /// Risk id encoded in a trajectory column name, if the column is one
    #[must_use]
    pub fn trajectory_risk(column: &str) -> Option<&str> {
        if column == TRAJECTORY_GLOBAL {
            return None;
        }
        column
            .strip_prefix(TRAJECTORY_PREFIX)?
            .strip_suffix(TRAJECTORY_SUFFIX)
            .filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        assert_eq!(Dataset::ProactiveWeekly.file_name(), "stde_proactivo_semanal_v4_4.json");
        assert_eq!(Dataset::ObservationsHighFrequency.to_string(), "stde_observaciones_12s");
    }

    #[test]
    fn trajectory_columns() {
        assert_eq!(columns::trajectory_risk("criticidad_R01_media"), Some("R01"));
        assert_eq!(columns::trajectory_risk("criticidad_global_media"), None);
        assert_eq!(columns::trajectory_risk("criticidad__media"), None);
        assert_eq!(columns::trajectory_risk("semana"), None);
        assert_eq!(columns::trajectory_risk("criticidad_R02"), None);
    }
}
