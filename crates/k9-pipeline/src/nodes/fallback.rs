//! Answer for rejected intents and intents without a dedicated leaf
//!
//! Never calls the generator.

use super::NodeContext;
use crate::error::PipelineError;
use crate::state::PipelineState;

/// Re-scoping hint
pub const ANSWER: &str = "La consulta realizada no pertenece al dominio de seguridad operacional en minería. \
     Puedo ayudarte con: riesgos, modelo proactivo, incidentes, contexto operativo, factores de exposición, \
     BowTie o ICAM.\n\nPor favor reformula tu pregunta dentro de estos ámbitos.";

/// Answer with the re-scoping hint
///
/// # Errors
/// Never fails.
pub fn run(mut state: PipelineState, _ctx: &NodeContext) -> Result<PipelineState, PipelineError> {
    tracing::debug!("Fallback leaf for intent {}", state.intent_or_default());
    if state.demo_mode {
        state.note("Fallback: consulta fuera de alcance del dominio minero (demo_mode=true, sin llamada al modelo).");
    } else {
        state.note("Fallback: consulta fuera de alcance del dominio minero.");
    }
    state.answer = Some(ANSWER.to_string());
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Intent;

    #[test]
    fn always_answers() {
        let state = PipelineState::new("x").with_intent(Intent::Unrecognized("x".into()));
        let state = run(state, &NodeContext::empty()).unwrap();
        assert!(state.answer.clone().unwrap().starts_with("La consulta realizada no pertenece"));
        assert_eq!(state.reasoning().len(), 1);
    }

    #[test]
    fn demo_mode_is_noted() {
        let mut state = PipelineState::new("capital de chile").with_intent(Intent::OutOfDomain);
        state.demo_mode = true;
        let state = run(state, &NodeContext::empty()).unwrap();
        assert_eq!(state.answer.as_deref(), Some(ANSWER));
        assert!(state.reasoning()[0].contains("demo_mode=true"));
    }
}
