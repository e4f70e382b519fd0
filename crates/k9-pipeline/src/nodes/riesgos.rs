//! Static risk overview from the context bundle

use super::NodeContext;
use crate::error::PipelineError;
use crate::state::{ContextBundle, PipelineState};

/// Risk overview text
#[must_use]
pub fn answer(bundle: &ContextBundle) -> String {
    format!(
        "Riesgos Operacionales — Información Base\n\n\
         Los principales riesgos priorizados en faena son:\n• {}\n\n\
         Áreas operacionales consideradas:\n• {}\n\n\
         Cada riesgo se evalúa en función de su potencial de consecuencia, frecuencia observada, \
         condiciones del entorno y criticidad operacional.",
        bundle.top_riesgos_escondida.join("\n• "),
        bundle.areas_operacionales.join("\n• ")
    )
}

/// Answer with the risk overview
///
/// # Errors
/// Never fails.
pub fn run(mut state: PipelineState, _ctx: &NodeContext) -> Result<PipelineState, PipelineError> {
    let bundle = state.context_bundle.clone().unwrap_or_default();
    tracing::debug!("Riesgos leaf over {} top risks", bundle.top_riesgos_escondida.len());
    state.note("Riesgos: explicando riesgos operacionales.");
    state.answer = Some(answer(&bundle));
    Ok(state)
}
