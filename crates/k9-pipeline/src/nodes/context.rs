//! Static context loader

use super::NodeContext;
use crate::error::PipelineError;
use crate::graph::{NodeKind, Step};
use crate::state::{ContextBundle, PipelineState};

/// Load the operational context bundle
///
/// # Errors
/// Never fails.
pub fn run(mut state: PipelineState, _ctx: &NodeContext) -> Result<PipelineState, PipelineError> {
    let bundle = ContextBundle::standard();
    tracing::debug!("Context bundle v{} loaded", bundle.version_contexto);
    state.note(format!(
        "Load Context: contexto operativo básico cargado (v{}).",
        bundle.version_contexto
    ));
    state.context_bundle = Some(bundle);
    Ok(state)
}

/// Greetings and rejected queries skip the data nodes
#[must_use]
pub fn after_context(state: &PipelineState) -> Step {
    if state.intent_or_default().skips_analysis() {
        Step::Go(NodeKind::Router)
    } else {
        Step::Go(NodeKind::DataEngine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Intent;

    #[test]
    fn loads_bundle() {
        let state = run(PipelineState::new("q"), &NodeContext::empty()).unwrap();
        let bundle = state.context_bundle.as_ref().unwrap();
        assert_eq!(bundle.top_riesgos_escondida[0], "Caída de altura");
        assert!(state.reasoning()[0].contains("v0.1"));
    }

    #[test]
    fn greeting_skips_data() {
        let state = PipelineState::new("hola").with_intent(Intent::Greeting);
        assert_eq!(after_context(&state), Step::Go(NodeKind::Router));
        let state = PipelineState::new("x").with_intent(Intent::OutOfDomain);
        assert_eq!(after_context(&state), Step::Go(NodeKind::Router));
        let state = PipelineState::new("riesgos").with_intent(Intent::Riesgos);
        assert_eq!(after_context(&state), Step::Go(NodeKind::DataEngine));
    }
}
