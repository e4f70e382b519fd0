//! Domain guardrail node
//!
//! Sole writer of `demo_mode`.

use super::NodeContext;
use crate::error::PipelineError;
use crate::intent::{Intent, DOMAIN_SIGNALS};
use crate::state::PipelineState;
use crate::text::QueryText;

/// Accept or reject the classified intent
///
/// # Errors
/// Never fails.
pub fn run(mut state: PipelineState, _ctx: &NodeContext) -> Result<PipelineState, PipelineError> {
    let intent = state.intent_or_default();

    if intent.is_whitelisted() {
        tracing::debug!("Guardrail accepted intent: {}", intent);
        state.demo_mode = false;
        state.note(format!("Domain Guardrail: intent '{intent}' pertenece al dominio minería."));
        return Ok(state);
    }

    if intent == Intent::GeneralQuestion {
        if let Some(signal) = QueryText::new(state.user_query()).first_match(DOMAIN_SIGNALS) {
            state.demo_mode = false;
            state.intent = Some(intent);
            state.note(format!(
                "Domain Guardrail: 'general_question' contiene señales de minería ('{}'), se acepta.",
                signal.text()
            ));
            return Ok(state);
        }
    }

    tracing::info!("Guardrail rejected intent: {}", intent);
    state.intent = Some(Intent::OutOfDomain);
    state.demo_mode = true;
    state.note(format!(
        "Domain Guardrail: intent '{intent}' fuera de dominio -> out_of_domain (demo_mode=true)."
    ));
    Ok(state)
}
