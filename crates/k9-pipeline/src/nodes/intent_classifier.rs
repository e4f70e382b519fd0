//! Intent classifier node

use super::NodeContext;
use crate::error::PipelineError;
use crate::intent::classify;
use crate::state::PipelineState;
use crate::text::QueryText;

/// Classify the query, honouring a pre-set intent
///
/// # Errors
/// Never fails.
pub fn run(mut state: PipelineState, _ctx: &NodeContext) -> Result<PipelineState, PipelineError> {
    if let Some(intent) = state.intent.clone() {
        tracing::debug!("Intent preset: {}", intent);
        state.note(format!("Intent: '{intent}' provisto en el estado inicial, reglas omitidas."));
        return Ok(state);
    }

    let classification = classify(&QueryText::new(state.user_query()));
    let matched: Vec<&str> = classification.matched.iter().map(|k| k.text()).collect();
    tracing::debug!("Intent detected: {} (rule {})", classification.intent, classification.rule);
    state.note(if matched.is_empty() {
        format!("Intent detected: {} (regla '{}').", classification.intent, classification.rule)
    } else {
        format!(
            "Intent detected: {} (regla '{}', claves: {}).",
            classification.intent,
            classification.rule,
            matched.join(", ")
        )
    });
    state.intent = Some(classification.intent);
    Ok(state)
}
