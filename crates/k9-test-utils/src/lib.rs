//! Testing utilities for the K9 workspace
//!
//! Shared dataset fixtures and text generator doubles.

#![allow(missing_docs)]

use k9_data::{Dataset, InMemorySource, Table};
use k9_pipeline::{GeneratorError, TextGenerator};
use std::path::Path;
use std::sync::Mutex;

/// R01 climbs `[0.4, 0.45, 0.5]`; R02 holds near `[0.7, 0.7, 0.69]`
pub const TRAJECTORIES: &str = r#"[
    {"semana": 1, "criticidad_R01_media": 0.4, "criticidad_R02_media": 0.7, "criticidad_global_media": 0.55},
    {"semana": 2, "criticidad_R01_media": 0.45, "criticidad_R02_media": 0.7, "criticidad_global_media": 0.575},
    {"semana": 3, "criticidad_R01_media": 0.5, "criticidad_R02_media": 0.69, "criticidad_global_media": 0.595}
]"#;

pub const WEEKLY_SIGNALS: &str = r#"[
    {"semana": 1, "riesgo_id": "R01", "criticidad_media": 0.4, "rank_pos": 2, "is_top3": 1},
    {"semana": 2, "riesgo_id": "R01", "criticidad_media": 0.45, "rank_pos": 2, "is_top3": 1},
    {"semana": 3, "riesgo_id": "R01", "criticidad_media": 0.5, "rank_pos": 2, "is_top3": 0},
    {"semana": 1, "riesgo_id": "R02", "criticidad_media": 0.7, "rank_pos": 1, "is_top3": 1},
    {"semana": 2, "riesgo_id": "R02", "criticidad_media": 0.7, "rank_pos": 1, "is_top3": 1},
    {"semana": 3, "riesgo_id": "R02", "criticidad_media": 0.69, "rank_pos": 1, "is_top3": 1}
]"#;

/// R01 has one OCC implicating a critical control
pub const OBSERVATIONS_BASELINE: &str = r#"[
    {"semana": 1, "tipo_observacion": "OPG", "riesgo_id": "R02", "is_control_critico": 0, "control_critico_id": null},
    {"semana": 2, "tipo_observacion": "OCC", "riesgo_id": "R01", "is_control_critico": 1, "control_critico_id": "CC-03"},
    {"semana": 3, "tipo_observacion": "OCC", "riesgo_id": "R01", "is_control_critico": 0, "control_critico_id": null},
    {"semana": 3, "tipo_observacion": "OCC", "riesgo_id": "R02", "is_control_critico": 0, "control_critico_id": null}
]"#;

/// No risk linkage in this source
pub const OBSERVATIONS_HIGH_FREQUENCY: &str = r#"[
    {"semana": 1, "tipo_observacion": "OPG"},
    {"semana": 2, "tipo_observacion": "OCC"}
]"#;

/// Proactive model ranks R01 fourth against an internal second
pub const PROACTIVE_WEEKLY: &str = r#"{
    "columns": ["semana_id", "riesgo_id", "score_proactivo", "rank_proactivo"],
    "data": [
        [1, "R01", 0.31, 4], [2, "R01", 0.33, 4], [3, "R01", 0.35, 4],
        [1, "R02", 0.82, 1], [2, "R02", 0.80, 1], [3, "R02", 0.79, 1]
    ]
}"#;

/// Same shape without `rank_proactivo`
pub const PROACTIVE_WITHOUT_RANK: &str = r#"[
    {"semana_id": 1, "riesgo_id": "R01", "score_proactivo": 0.31}
]"#;

/// Fixture document for a dataset
#[must_use]
pub fn fixture(dataset: Dataset) -> &'static str {
    match dataset {
        Dataset::Trajectories => TRAJECTORIES,
        Dataset::WeeklySignals => WEEKLY_SIGNALS,
        Dataset::ObservationsBaseline => OBSERVATIONS_BASELINE,
        Dataset::ObservationsHighFrequency => OBSERVATIONS_HIGH_FREQUENCY,
        Dataset::ProactiveWeekly => PROACTIVE_WEEKLY,
    }
}

pub fn table(dataset: Dataset, json: &str) -> Table {
    Table::from_json_str(dataset, json).unwrap()
}

/// Every dataset from the fixtures
pub fn scenario_source() -> InMemorySource {
    Dataset::ALL
        .iter()
        .fold(InMemorySource::new(), |source, &d| source.with_table(table(d, fixture(d))))
}

/// Fixtures with the proactive contract broken
pub fn broken_proactive_source() -> InMemorySource {
    let mut source = scenario_source();
    source.insert(table(Dataset::ProactiveWeekly, PROACTIVE_WITHOUT_RANK));
    source
}

/// Write the fixtures as dataset files under `dir`
pub fn write_scenario_dir(dir: &Path) {
    for dataset in Dataset::ALL {
        std::fs::write(dir.join(dataset.file_name()), fixture(dataset)).unwrap();
    }
}

/// Generator answering with fixed text and keeping every prompt
#[derive(Debug)]
pub struct RecordingGenerator {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl TextGenerator for RecordingGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Generator that always times out
#[derive(Debug, Default)]
pub struct FailingGenerator;

impl TextGenerator for FailingGenerator {
    fn generate(&self, _prompt: &str) -> Result<String, GeneratorError> {
        Err(GeneratorError::Timeout(20))
    }
}
