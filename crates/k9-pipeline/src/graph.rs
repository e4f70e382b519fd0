//! Node graph: wiring, validation and the run driver
//!
//! A [`GraphBuilder`] collects one node function and one outgoing
//! [`Transition`] per [`NodeKind`]. `build()` checks the wiring with
//! petgraph before anything runs, so a bad graph fails at construction and
//! never mid-query.

use crate::error::{GraphError, PipelineError};
use crate::nodes::{self, NodeContext, NodeFn};
use crate::state::PipelineState;
use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Every node in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Intent classifier
    Intent,
    /// Domain guardrail
    Guardrail,
    /// Static context loader
    Context,
    /// Deterministic facts
    DataEngine,
    /// OCC linkage
    OccEnrichment,
    /// Cognitive consolidation
    Analyst,
    /// Renderable metrics
    Metrics,
    /// Intent dispatch
    Router,
    /// External generator leaf
    Llm,
    /// Glossary lookups
    SemanticRetrieval,
    /// Proactive model leaf
    ProactiveModel,
    /// Static risk list
    Riesgos,
    /// Static BowTie explanation
    Bowtie,
    /// Out-of-scope answer
    Fallback,
    /// Terminal narrative
    Narrative,
}

impl NodeKind {
    /// All nodes, in pipeline order
    pub const ALL: [NodeKind; 15] = [
        NodeKind::Intent,
        NodeKind::Guardrail,
        NodeKind::Context,
        NodeKind::DataEngine,
        NodeKind::OccEnrichment,
        NodeKind::Analyst,
        NodeKind::Metrics,
        NodeKind::Router,
        NodeKind::Llm,
        NodeKind::SemanticRetrieval,
        NodeKind::ProactiveModel,
        NodeKind::Riesgos,
        NodeKind::Bowtie,
        NodeKind::Fallback,
        NodeKind::Narrative,
    ];

    /// Intent-specific handlers the router dispatches to
    pub const LEAVES: [NodeKind; 6] = [
        NodeKind::Llm,
        NodeKind::SemanticRetrieval,
        NodeKind::ProactiveModel,
        NodeKind::Riesgos,
        NodeKind::Bowtie,
        NodeKind::Fallback,
    ];

    /// Snake-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Intent => "intent",
            NodeKind::Guardrail => "guardrail",
            NodeKind::Context => "context",
            NodeKind::DataEngine => "data_engine",
            NodeKind::OccEnrichment => "occ_enrichment",
            NodeKind::Analyst => "analyst",
            NodeKind::Metrics => "metrics",
            NodeKind::Router => "router",
            NodeKind::Llm => "llm",
            NodeKind::SemanticRetrieval => "semantic_retrieval",
            NodeKind::ProactiveModel => "proactive_model",
            NodeKind::Riesgos => "riesgos",
            NodeKind::Bowtie => "bowtie",
            NodeKind::Fallback => "fallback",
            NodeKind::Narrative => "narrative",
        }
    }

    /// Whether the node reads the data source
    #[inline]
    #[must_use]
    pub fn reads_data(self) -> bool {
        matches!(self, NodeKind::DataEngine | NodeKind::OccEnrichment)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where to go after a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Run this node next
    Go(NodeKind),
    /// Stop, the state is final
    End,
}

/// Selector for a conditional edge
pub type RouteFn = fn(&PipelineState) -> Step;

/// Outgoing edge of a node
#[derive(Clone)]
pub enum Transition {
    /// Unconditional edge
    Always(NodeKind),
    /// Conditional edge; `targets` lists every node `route` may return
    Conditional {
        /// Declared targets
        targets: Vec<NodeKind>,
        /// May also end the run
        may_end: bool,
        /// Selector
        route: RouteFn,
    },
    /// Terminal node
    End,
}

impl Transition {
    fn targets(&self) -> Vec<NodeKind> {
        match self {
            Transition::Always(next) => vec![*next],
            Transition::Conditional { targets, .. } => targets.clone(),
            Transition::End => Vec::new(),
        }
    }

    fn is_terminal(&self) -> bool {
        match self {
            Transition::Always(_) => false,
            Transition::Conditional { may_end, .. } => *may_end,
            Transition::End => true,
        }
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Always(next) => write!(f, "Always({next})"),
            Transition::Conditional { targets, may_end, .. } => f
                .debug_struct("Conditional")
                .field("targets", targets)
                .field("may_end", may_end)
                .finish_non_exhaustive(),
            Transition::End => f.write_str("End"),
        }
    }
}

/// Collects nodes and edges before validation
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: BTreeMap<NodeKind, NodeFn>,
    transitions: BTreeMap<NodeKind, Transition>,
    duplicate: Option<NodeKind>,
}

impl GraphBuilder {
    /// Create empty builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node function
    #[must_use]
    pub fn node(mut self, kind: NodeKind, run: NodeFn) -> Self {
        self.nodes.insert(kind, run);
        self
    }

    /// Unconditional edge
    #[must_use]
    pub fn edge(self, from: NodeKind, to: NodeKind) -> Self {
        self.transition(from, Transition::Always(to))
    }

    /// Conditional edge
    #[must_use]
    pub fn branch(self, from: NodeKind, targets: &[NodeKind], may_end: bool, route: RouteFn) -> Self {
        self.transition(
            from,
            Transition::Conditional {
                targets: targets.to_vec(),
                may_end,
                route,
            },
        )
    }

    /// Mark a node terminal
    #[must_use]
    pub fn finish(self, at: NodeKind) -> Self {
        self.transition(at, Transition::End)
    }

    fn transition(mut self, from: NodeKind, transition: Transition) -> Self {
        if self.transitions.insert(from, transition).is_some() && self.duplicate.is_none() {
            self.duplicate = Some(from);
        }
        self
    }

    /// Validate and compile
    ///
    /// # Errors
    /// Returns a [`GraphError`] for duplicate transitions, self loops,
    /// edges to unregistered nodes, dead ends, cycles, or nodes unreachable
    /// from `entry`.
    pub fn build(self, entry: NodeKind) -> Result<CompiledGraph, GraphError> {
        if let Some(kind) = self.duplicate {
            return Err(GraphError::DuplicateTransition(kind));
        }
        if !self.nodes.contains_key(&entry) {
            return Err(GraphError::UnknownNode(entry));
        }

        let mut graph: DiGraphMap<NodeKind, ()> = DiGraphMap::new();
        for kind in self.nodes.keys() {
            graph.add_node(*kind);
        }

        for kind in self.nodes.keys() {
            let transition = self.transitions.get(kind).ok_or(GraphError::DeadEnd(*kind))?;
            let targets = transition.targets();
            if targets.is_empty() && !transition.is_terminal() {
                return Err(GraphError::DeadEnd(*kind));
            }
            for target in targets {
                if target == *kind {
                    return Err(GraphError::SelfLoop(*kind));
                }
                if !self.nodes.contains_key(&target) {
                    return Err(GraphError::UnknownNode(target));
                }
                graph.add_edge(*kind, target, ());
            }
        }
        if let Some(orphan) = self.transitions.keys().find(|k| !self.nodes.contains_key(k)) {
            return Err(GraphError::UnknownNode(*orphan));
        }

        if is_cyclic_directed(&graph) {
            return Err(GraphError::CycleDetected);
        }

        let mut reached = Vec::with_capacity(self.nodes.len());
        let mut dfs = Dfs::new(&graph, entry);
        while let Some(kind) = dfs.next(&graph) {
            reached.push(kind);
        }
        if let Some(unreached) = self.nodes.keys().find(|k| !reached.contains(k)) {
            return Err(GraphError::Unreachable(*unreached));
        }

        tracing::debug!(
            "Compiled graph: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(CompiledGraph {
            entry,
            max_steps: self.nodes.len(),
            nodes: self.nodes,
            transitions: self.transitions,
        })
    }
}

/// Visited node sequence of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunTrace {
    visited: Vec<NodeKind>,
}

impl RunTrace {
    /// Nodes in execution order
    #[inline]
    #[must_use]
    pub fn visited(&self) -> &[NodeKind] {
        &self.visited
    }

    /// Whether a node ran
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: NodeKind) -> bool {
        self.visited.contains(&kind)
    }

    /// Whether any data-reading node ran
    #[must_use]
    pub fn touched_data(&self) -> bool {
        self.visited.iter().any(|k| k.reads_data())
    }

    /// Leaf the router dispatched to
    #[must_use]
    pub fn leaf(&self) -> Option<NodeKind> {
        self.visited.iter().copied().find(|k| NodeKind::LEAVES.contains(k))
    }
}

/// Validated graph ready to run
#[derive(Debug)]
pub struct CompiledGraph {
    entry: NodeKind,
    max_steps: usize,
    nodes: BTreeMap<NodeKind, NodeFn>,
    transitions: BTreeMap<NodeKind, Transition>,
}

impl CompiledGraph {
    /// Entry node
    #[inline]
    #[must_use]
    pub fn entry(&self) -> NodeKind {
        self.entry
    }

    /// Run a state through the graph
    ///
    /// # Errors
    /// Propagates fatal node errors, and [`GraphError`] if a conditional
    /// edge picks an undeclared target.
    pub fn run(
        &self,
        mut state: PipelineState,
        ctx: &NodeContext,
    ) -> Result<(PipelineState, RunTrace), PipelineError> {
        let mut trace = RunTrace::default();
        let mut current = self.entry;

        loop {
            if trace.visited.len() >= self.max_steps {
                return Err(GraphError::StepLimit(self.max_steps).into());
            }
            let node = self.nodes.get(&current).ok_or(GraphError::UnknownNode(current))?;
            tracing::debug!("Running node: {}", current);
            state = node(state, ctx)?;
            trace.visited.push(current);

            let step = match self.transitions.get(&current) {
                Some(Transition::Always(next)) => Step::Go(*next),
                Some(Transition::Conditional { targets, may_end, route }) => match route(&state) {
                    Step::Go(next) if !targets.contains(&next) => {
                        return Err(GraphError::UndeclaredRoute { from: current, to: next }.into());
                    }
                    Step::End if !*may_end => return Err(GraphError::DeadEnd(current).into()),
                    step => step,
                },
                Some(Transition::End) => Step::End,
                None => return Err(GraphError::DeadEnd(current).into()),
            };

            match step {
                Step::Go(next) => current = next,
                Step::End => return Ok((state, trace)),
            }
        }
    }
}

/// The pipeline wiring
///
/// ```text
/// intent -> guardrail -> context -+-> data_engine -> occ_enrichment -> analyst -> metrics -+-> router
///                                 +-------------- (greeting, out_of_domain) ---------------+
/// router -> one leaf -> END if answered, else narrative -> END
/// ```
///
/// # Errors
/// Returns a [`GraphError`] if the wiring is invalid.
pub fn standard() -> Result<CompiledGraph, GraphError> {
    let leaves_then = |b: GraphBuilder| {
        NodeKind::LEAVES.iter().fold(b, |b, leaf| {
            b.branch(*leaf, &[NodeKind::Narrative], true, nodes::after_leaf)
        })
    };

    let builder = GraphBuilder::new()
        .node(NodeKind::Intent, nodes::intent_classifier::run)
        .node(NodeKind::Guardrail, nodes::guardrail::run)
        .node(NodeKind::Context, nodes::context::run)
        .node(NodeKind::DataEngine, nodes::data_engine::run)
        .node(NodeKind::OccEnrichment, nodes::occ_enrichment::run)
        .node(NodeKind::Analyst, nodes::analyst::run)
        .node(NodeKind::Metrics, nodes::metrics::run)
        .node(NodeKind::Router, nodes::router::run)
        .node(NodeKind::Llm, nodes::llm::run)
        .node(NodeKind::SemanticRetrieval, nodes::semantic_retrieval::run)
        .node(NodeKind::ProactiveModel, nodes::proactive_model::run)
        .node(NodeKind::Riesgos, nodes::riesgos::run)
        .node(NodeKind::Bowtie, nodes::bowtie::run)
        .node(NodeKind::Fallback, nodes::fallback::run)
        .node(NodeKind::Narrative, nodes::narrative::run)
        .edge(NodeKind::Intent, NodeKind::Guardrail)
        .edge(NodeKind::Guardrail, NodeKind::Context)
        .branch(
            NodeKind::Context,
            &[NodeKind::DataEngine, NodeKind::Router],
            false,
            nodes::context::after_context,
        )
        .edge(NodeKind::DataEngine, NodeKind::OccEnrichment)
        .edge(NodeKind::OccEnrichment, NodeKind::Analyst)
        .edge(NodeKind::Analyst, NodeKind::Metrics)
        .edge(NodeKind::Metrics, NodeKind::Router)
        .branch(NodeKind::Router, &NodeKind::LEAVES, false, nodes::router::select)
        .finish(NodeKind::Narrative);

    leaves_then(builder).build(NodeKind::Intent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(state: PipelineState, _ctx: &NodeContext) -> Result<PipelineState, PipelineError> {
        Ok(state)
    }

    fn to_end(_: &PipelineState) -> Step {
        Step::End
    }

    #[test]
    fn standard_wiring_is_valid() {
        let graph = standard().unwrap();
        assert_eq!(graph.entry(), NodeKind::Intent);
    }

    #[test]
    fn node_kind_display_is_snake_case() {
        assert_eq!(NodeKind::SemanticRetrieval.to_string(), "semantic_retrieval");
        assert_eq!(NodeKind::OccEnrichment.to_string(), "occ_enrichment");
    }

    #[test]
    fn rejects_self_loop() {
        let err = GraphBuilder::new()
            .node(NodeKind::Intent, noop)
            .edge(NodeKind::Intent, NodeKind::Intent)
            .build(NodeKind::Intent)
            .unwrap_err();
        assert_eq!(err, GraphError::SelfLoop(NodeKind::Intent));
    }

    #[test]
    fn rejects_cycle() {
        let err = GraphBuilder::new()
            .node(NodeKind::Intent, noop)
            .node(NodeKind::Guardrail, noop)
            .edge(NodeKind::Intent, NodeKind::Guardrail)
            .edge(NodeKind::Guardrail, NodeKind::Intent)
            .build(NodeKind::Intent)
            .unwrap_err();
        assert_eq!(err, GraphError::CycleDetected);
    }

    #[test]
    fn rejects_unreachable_node() {
        let err = GraphBuilder::new()
            .node(NodeKind::Intent, noop)
            .node(NodeKind::Bowtie, noop)
            .finish(NodeKind::Intent)
            .finish(NodeKind::Bowtie)
            .build(NodeKind::Intent)
            .unwrap_err();
        assert_eq!(err, GraphError::Unreachable(NodeKind::Bowtie));
    }

    #[test]
    fn rejects_dead_end_and_unknown_target() {
        let err = GraphBuilder::new()
            .node(NodeKind::Intent, noop)
            .build(NodeKind::Intent)
            .unwrap_err();
        assert_eq!(err, GraphError::DeadEnd(NodeKind::Intent));

        let err = GraphBuilder::new()
            .node(NodeKind::Intent, noop)
            .edge(NodeKind::Intent, NodeKind::Router)
            .build(NodeKind::Intent)
            .unwrap_err();
        assert_eq!(err, GraphError::UnknownNode(NodeKind::Router));
    }

    #[test]
    fn rejects_duplicate_transition() {
        let err = GraphBuilder::new()
            .node(NodeKind::Intent, noop)
            .finish(NodeKind::Intent)
            .branch(NodeKind::Intent, &[], true, to_end)
            .build(NodeKind::Intent)
            .unwrap_err();
        assert_eq!(err, GraphError::DuplicateTransition(NodeKind::Intent));
    }

    #[test]
    fn runs_and_records_trace() {
        let graph = GraphBuilder::new()
            .node(NodeKind::Intent, noop)
            .node(NodeKind::Narrative, noop)
            .edge(NodeKind::Intent, NodeKind::Narrative)
            .finish(NodeKind::Narrative)
            .build(NodeKind::Intent)
            .unwrap();
        let ctx = NodeContext::empty();
        let (_, trace) = graph.run(PipelineState::new("q"), &ctx).unwrap();
        assert_eq!(trace.visited(), [NodeKind::Intent, NodeKind::Narrative]);
        assert!(!trace.touched_data());
    }
}
