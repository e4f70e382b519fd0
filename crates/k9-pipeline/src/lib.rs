//! K9 Pipeline - cognitive pipeline for operational-safety signals
//!
//! Turns a free-text query into:
//! - a classified intent, checked by a domain guardrail
//! - a deterministic layered analysis (trends, observational support,
//!   dominant and relevant risk, proactive ranking alignment, thresholds)
//! - renderable metrics with at most one visualization hint
//! - a natural-language answer, diagnostic or precautionary
//!
//! Nodes are plain functions sequenced by a validated graph; see
//! [`graph::standard`] for the wiring.
//!
//! # Example
//!
//! ```rust,ignore
//! use k9_pipeline::{Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::new(&PipelineConfig::load("k9.toml")?)?;
//! let outcome = pipeline.ask("¿qué pasaría si el modelo proactivo se equivoca?")?;
//! println!("{}", outcome.state.answer.unwrap_or_default());
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod generator;
pub mod graph;
pub mod intent;
pub mod nodes;
pub mod pipeline;
pub mod session;
pub mod state;
pub mod text;

pub use analysis::{Alignment, Analysis, TemporalState, TrendDirection};
pub use config::{GeneratorConfig, PipelineConfig};
pub use error::{ConfigError, GeneratorError, GraphError, PipelineError};
pub use generator::{HttpGenerator, TextGenerator};
pub use graph::{CompiledGraph, NodeKind, RunTrace};
pub use intent::{classify, Classification, Intent, IntentRule, RULES};
pub use nodes::NodeContext;
pub use pipeline::{Outcome, Pipeline};
pub use session::{InMemorySessionStore, SessionEntry, SessionStore};
pub use state::{ContextBundle, PipelineState};
pub use text::{Keyword, QueryText};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
