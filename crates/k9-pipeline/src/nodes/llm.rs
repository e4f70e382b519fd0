//! Generator leaf for greetings
//!
//! Fail-safe: a state with `demo_mode` set is refused without calling out,
//! and any generator problem becomes the fixed apology.

use super::NodeContext;
use crate::error::PipelineError;
use crate::state::{ContextBundle, PipelineState};

/// Answer for out-of-domain queries
pub const REFUSAL: &str =
    "Estoy diseñado para responder sobre minería y seguridad operacional. Tu pregunta está fuera de ese dominio.";

/// Answer when the generator is missing or fails
pub const APOLOGY: &str = "Error al obtener respuesta del modelo.";

/// Generator prompt
#[must_use]
pub fn build_prompt(intent: &str, context: Option<&ContextBundle>, question: &str) -> String {
    let context = context
        .and_then(|c| serde_json::to_string(c).ok())
        .unwrap_or_else(|| "{}".to_string());
    format!(
        "Eres el agente K9 Mining Safety.\n\
         DOMINIO: minería y seguridad operacional\n\
         INTENCIÓN: {intent}\n\
         CONTEXTO: {context}\n\
         PREGUNTA: {question}\n\n\
         Da una respuesta clara, breve y profesional."
    )
}

/// Answer through the generator
///
/// # Errors
/// Never fails; generator errors are recovered here.
pub fn run(mut state: PipelineState, ctx: &NodeContext) -> Result<PipelineState, PipelineError> {
    if state.demo_mode {
        state.note("LLM: omitido, demo_mode=true (fuera de dominio).");
        state.answer = Some(REFUSAL.to_string());
        return Ok(state);
    }

    let Some(generator) = ctx.generator() else {
        tracing::warn!("LLM leaf reached without a generator");
        state.note("LLM: sin generador configurado, respuesta de disculpa.");
        state.answer = Some(APOLOGY.to_string());
        return Ok(state);
    };

    let prompt = build_prompt(
        state.intent_or_default().as_str(),
        state.context_bundle.as_ref(),
        state.user_query(),
    );
    match generator.generate(&prompt) {
        Ok(text) => {
            state.note("LLM: respuesta generada exitosamente.");
            state.answer = Some(text);
        }
        Err(e) => {
            tracing::warn!("Generator failed: {}", e);
            state.note(format!("LLM ERROR: {e}"));
            state.answer = Some(APOLOGY.to_string());
        }
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeneratorError;
    use crate::generator::MockTextGenerator;
    use crate::intent::Intent;
    use std::sync::Arc;

    fn ctx_with(mock: MockTextGenerator) -> NodeContext {
        NodeContext::empty().with_generator(Arc::new(mock))
    }

    #[test]
    fn demo_mode_refuses_without_calling() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().never();
        let mut state = PipelineState::new("capital de chile").with_intent(Intent::OutOfDomain);
        state.demo_mode = true;

        let state = run(state, &ctx_with(mock)).unwrap();
        assert_eq!(state.answer.as_deref(), Some(REFUSAL));
    }

    #[test]
    fn generator_text_becomes_answer() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .withf(|p| p.contains("INTENCIÓN: greeting") && p.contains("PREGUNTA: hola"))
            .times(1)
            .returning(|_| Ok("¡Hola! Soy K9.".to_string()));
        let state = PipelineState::new("hola")
            .with_intent(Intent::Greeting)
            .with_context(ContextBundle::standard());

        let state = run(state, &ctx_with(mock)).unwrap();
        assert_eq!(state.answer.as_deref(), Some("¡Hola! Soy K9."));
    }

    #[test]
    fn generator_error_degrades_to_apology() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().returning(|_| Err(GeneratorError::Timeout(20)));
        let state = run(PipelineState::new("hola"), &ctx_with(mock)).unwrap();
        assert_eq!(state.answer.as_deref(), Some(APOLOGY));
        assert!(state.reasoning()[0].contains("timed out"));
    }

    #[test]
    fn missing_generator_degrades_to_apology() {
        let state = run(PipelineState::new("hola"), &NodeContext::empty()).unwrap();
        assert_eq!(state.answer.as_deref(), Some(APOLOGY));
    }

    #[test]
    fn prompt_carries_context() {
        let prompt = build_prompt("greeting", Some(&ContextBundle::standard()), "hola");
        assert!(prompt.contains("Mina Rajo"));
        assert!(prompt.contains("DOMINIO"));
    }
}
