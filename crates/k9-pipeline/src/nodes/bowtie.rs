//! Static BowTie methodology explanation

use super::NodeContext;
use crate::error::PipelineError;
use crate::state::PipelineState;

/// BowTie explanation
pub const EXPLANATION: &str = "El análisis BowTie es una metodología usada en minería para entender claramente:

1) El Evento Principal (Top Event)
2) Las Causas que pueden llevar a ese evento
3) Las Consecuencias potenciales si ocurre
4) Los Controles Preventivos (izquierda)
5) Los Controles Mitigadores (derecha)

La forma de 'corbatín' (BowTie) permite visualizar en una sola vista:
- qué energías están involucradas,
- cómo se puede liberar esa energía,
- qué controles deben existir para evitar el evento,
- y cómo mitigar sus consecuencias.

En K9 Mining Safety, la versión avanzada del BowTie permitirá:
- vincular riesgos reales,
- recuperar controles desde la ontología,
- detectar faltas de controles,
- y analizar patrones en ventanas temporales.";

/// Answer with the BowTie explanation
///
/// # Errors
/// Never fails.
pub fn run(mut state: PipelineState, _ctx: &NodeContext) -> Result<PipelineState, PipelineError> {
    tracing::debug!("Bowtie leaf answering with the static explanation");
    state.note("Bowtie: explicación básica del análisis BowTie.");
    state.answer = Some(EXPLANATION.to_string());
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Intent;

    #[test]
    fn answers_with_static_explanation() {
        let state = PipelineState::new("corbatín").with_intent(Intent::ConsultaBowtie);
        let state = run(state, &NodeContext::empty()).unwrap();
        let answer = state.answer.clone().unwrap();
        assert!(answer.starts_with("El análisis BowTie"));
        assert!(answer.contains("Controles Mitigadores"));
        assert_eq!(state.reasoning(), ["Bowtie: explicación básica del análisis BowTie."]);
    }
}
