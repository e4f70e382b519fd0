//! Intent dispatch

use super::NodeContext;
use crate::error::PipelineError;
use crate::graph::{NodeKind, Step};
use crate::intent::Intent;
use crate::state::PipelineState;

/// Route table: intent to leaf; rejected and unlisted intents go to the fallback
#[must_use]
pub fn leaf_for(intent: &Intent) -> NodeKind {
    match intent {
        Intent::Greeting => NodeKind::Llm,
        Intent::ProactiveModel | Intent::ProactiveModelContrafactual => NodeKind::ProactiveModel,
        Intent::Riesgos => NodeKind::Riesgos,
        Intent::Bowtie | Intent::ConsultaBowtie => NodeKind::Bowtie,
        Intent::MiningGeneral
        | Intent::GeneralQuestion
        | Intent::Analyst
        | Intent::Predictor
        | Intent::RiskCaidaAltura
        | Intent::RiskCaidaObjetos
        | Intent::RiskContactoEnergia
        | Intent::ConsultaRiesgo
        | Intent::ConsultaEventos
        | Intent::ConsultaArea => NodeKind::SemanticRetrieval,
        Intent::OutOfDomain | Intent::Unrecognized(_) => NodeKind::Fallback,
    }
}

/// Record the routing decision; the state is otherwise untouched
///
/// # Errors
/// Never fails.
pub fn run(mut state: PipelineState, _ctx: &NodeContext) -> Result<PipelineState, PipelineError> {
    let intent = state.intent_or_default();
    let leaf = leaf_for(&intent);
    tracing::info!("Routing intent {} to {}", intent, leaf);
    state.note(format!("Router: intent '{intent}' -> {leaf}."));
    Ok(state)
}

/// Conditional edge selector for the router
#[must_use]
pub fn select(state: &PipelineState) -> Step {
    Step::Go(leaf_for(&state.intent_or_default()))
}
