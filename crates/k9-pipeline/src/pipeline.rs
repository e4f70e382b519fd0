//! Single entry point over the compiled graph

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::generator::{HttpGenerator, TextGenerator};
use crate::graph::{self, CompiledGraph, RunTrace};
use crate::nodes::NodeContext;
use crate::session::{InMemorySessionStore, SessionEntry, SessionStore};
use crate::state::PipelineState;
use k9_data::{CachedSource, DataAccess, DataSource, JsonDirSource};
use serde_json::Value;
use std::sync::Arc;

/// Final state and the path it took
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Final state
    pub state: PipelineState,
    /// Visited nodes
    pub trace: RunTrace,
}

/// Cognitive pipeline
pub struct Pipeline {
    graph: CompiledGraph,
    data: DataAccess,
    generator: Option<Arc<dyn TextGenerator>>,
    sessions: Arc<dyn SessionStore>,
}

impl Pipeline {
    /// Create pipeline from configuration
    ///
    /// Datasets are read from `config.data_dir` through a cache. The
    /// generator is installed only if enabled and its API key is present;
    /// otherwise generator-backed answers degrade to the fixed apology.
    ///
    /// # Errors
    /// Returns [`PipelineError::Graph`] if the wiring fails validation.
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let source = CachedSource::with_capacity(JsonDirSource::new(config.data_dir.clone()), config.cache_capacity);
        let generator: Option<Arc<dyn TextGenerator>> = match HttpGenerator::from_env(&config.generator) {
            Ok(http) => Some(Arc::new(http)),
            Err(e) => {
                tracing::warn!("Text generator unavailable: {}", e);
                None
            }
        };

        let mut pipeline = Self::from_source(Arc::new(source))?;
        pipeline.generator = generator;
        Ok(pipeline)
    }

    /// Create pipeline over an explicit source, without a generator
    ///
    /// # Errors
    /// Returns [`PipelineError::Graph`] if the wiring fails validation.
    pub fn from_source(source: Arc<dyn DataSource>) -> Result<Self, PipelineError> {
        Ok(Self {
            graph: graph::standard()?,
            data: DataAccess::new(source),
            generator: None,
            sessions: Arc::new(InMemorySessionStore::new()),
        })
    }

    /// With data source
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn DataSource>) -> Self {
        self.data = DataAccess::new(source);
        self
    }

    /// With text generator
    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// With session store
    #[must_use]
    pub fn with_sessions(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Session store
    #[inline]
    #[must_use]
    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    /// Data accessors
    #[inline]
    #[must_use]
    pub fn data(&self) -> &DataAccess {
        &self.data
    }

    fn context(&self) -> NodeContext {
        let ctx = NodeContext::new(self.data.clone());
        match &self.generator {
            Some(generator) => ctx.with_generator(Arc::clone(generator)),
            None => ctx,
        }
    }

    /// Run a prepared state through the graph
    ///
    /// # Errors
    /// Propagates fatal data-contract and graph errors.
    pub fn run(&self, state: PipelineState) -> Result<Outcome, PipelineError> {
        let span = tracing::info_span!("pipeline", query = %state.user_query(), intent = tracing::field::Empty);
        let _guard = span.enter();

        let (state, trace) = self.graph.run(state, &self.context())?;
        span.record("intent", state.intent_or_default().as_str());
        tracing::info!(
            "Pipeline finished: intent {} after {} nodes",
            state.intent_or_default(),
            trace.visited().len()
        );
        Ok(Outcome { state, trace })
    }

    /// Answer a query
    ///
    /// # Errors
    /// As [`Self::run`].
    pub fn ask(&self, query: &str) -> Result<Outcome, PipelineError> {
        self.run(PipelineState::new(query))
    }

    /// Run from a plain map holding `user_query` and optionally `intent`,
    /// returning the final state as a plain map
    ///
    /// # Errors
    /// Returns [`PipelineError::State`] for a malformed map, otherwise as
    /// [`Self::run`].
    pub fn invoke(&self, initial: Value) -> Result<Value, PipelineError> {
        let state = PipelineState::from_value(initial)?;
        let outcome = self.run(state)?;
        Ok(outcome.state.to_value()?)
    }

    /// Answer a query and append the final state to a session
    ///
    /// # Errors
    /// As [`Self::run`], or [`PipelineError::State`] if the final state
    /// cannot be serialized.
    pub fn ask_in_session(&self, session_id: &str, query: &str) -> Result<Outcome, PipelineError> {
        let outcome = self.ask(query)?;
        self.sessions
            .append(session_id, SessionEntry::now(outcome.state.to_value()?));
        tracing::debug!("Session {}: {} turns", session_id, self.sessions.history(session_id).len());
        Ok(outcome)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("entry", &self.graph.entry())
            .field("data", &self.data)
            .field("generator", &self.generator.is_some())
            .finish_non_exhaustive()
    }
}
