//! Pipeline nodes
//!
//! Every node is a plain function with the [`NodeFn`] signature. Nodes never
//! call each other; sequencing belongs to [`crate::graph`].

pub mod analyst;
pub mod bowtie;
pub mod context;
pub mod data_engine;
pub mod fallback;
pub mod guardrail;
pub mod intent_classifier;
pub mod llm;
pub mod metrics;
pub mod narrative;
pub mod occ_enrichment;
pub mod proactive_model;
pub mod riesgos;
pub mod router;
pub mod semantic_retrieval;

use crate::error::PipelineError;
use crate::generator::TextGenerator;
use crate::graph::{NodeKind, Step};
use crate::state::PipelineState;
use k9_data::{DataAccess, InMemorySource};
use std::fmt;
use std::sync::Arc;

/// Node signature: take the state, hand back the updated state
pub type NodeFn = fn(PipelineState, &NodeContext) -> Result<PipelineState, PipelineError>;

/// Collaborators shared by all nodes of a run
#[derive(Clone)]
pub struct NodeContext {
    data: DataAccess,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl NodeContext {
    /// Create context over a data source, without a generator
    #[inline]
    #[must_use]
    pub fn new(data: DataAccess) -> Self {
        Self { data, generator: None }
    }

    /// Context with no datasets and no generator
    #[must_use]
    pub fn empty() -> Self {
        Self::new(DataAccess::new(Arc::new(InMemorySource::new())))
    }

    /// With generator
    #[inline]
    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Data accessors
    #[inline]
    #[must_use]
    pub fn data(&self) -> &DataAccess {
        &self.data
    }

    /// Installed generator
    #[inline]
    #[must_use]
    pub fn generator(&self) -> Option<&dyn TextGenerator> {
        self.generator.as_deref()
    }
}

impl fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeContext")
            .field("data", &self.data)
            .field("generator", &self.generator.is_some())
            .finish()
    }
}

/// After a leaf: stop if it answered, otherwise narrate
#[must_use]
pub fn after_leaf(state: &PipelineState) -> Step {
    if state.answer.is_some() {
        Step::End
    } else {
        Step::Go(NodeKind::Narrative)
    }
}

/// Join names as "a, b y c"
pub(crate) fn join_es(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [one] => (*one).to_string(),
        [head @ .., last] => format!("{} y {}", head.join(", "), last),
    }
}
