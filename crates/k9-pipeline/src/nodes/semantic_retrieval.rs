//! Glossary lookups against the context bundle
//!
//! No match leaves `answer` unset so the narrative takes over.

use super::NodeContext;
use crate::error::PipelineError;
use crate::state::{ContextBundle, PipelineState};
use crate::text::{Keyword, QueryText};

use Keyword::{Phrase, Word};

const AREAS: &[Keyword] = &[Word("area"), Word("areas"), Phrase("operacionales")];
const EVENT_TYPES: &[Keyword] = &[
    Phrase("tipo de evento"),
    Phrase("tipos de evento"),
    Phrase("eventos"),
    Word("nm"),
    Word("opg"),
    Word("occ"),
];
const TOP_RISKS: &[Keyword] = &[Phrase("top riesgos"), Phrase("principales riesgos")];
const PROACTIVE: &[Keyword] = &[Phrase("proactivo")];

/// Ordered glossary rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Areas,
    EventTypes,
    TopRisks,
    ProactiveDefinition,
}

impl Lookup {
    const ORDER: [(Lookup, &'static [Keyword]); 4] = [
        (Lookup::Areas, AREAS),
        (Lookup::EventTypes, EVENT_TYPES),
        (Lookup::TopRisks, TOP_RISKS),
        (Lookup::ProactiveDefinition, PROACTIVE),
    ];

    fn find(query: &QueryText) -> Option<Lookup> {
        Self::ORDER
            .iter()
            .find(|(_, keywords)| query.contains_any(keywords))
            .map(|(lookup, _)| *lookup)
    }

    fn answer(self, ctx: &ContextBundle) -> String {
        match self {
            Lookup::Areas => format!(
                "Las áreas operacionales consideradas son: {}",
                ctx.areas_operacionales.join(", ")
            ),
            Lookup::EventTypes => {
                let lines: Vec<String> = ctx
                    .tipos_eventos
                    .iter()
                    .map(|(code, label)| format!("- {code}: {label}"))
                    .collect();
                format!("Tipos de eventos registrados:\n{}", lines.join("\n"))
            }
            Lookup::TopRisks => format!(
                "Los riesgos principales considerados actualmente son: {}",
                ctx.top_riesgos_escondida.join(", ")
            ),
            Lookup::ProactiveDefinition => ctx.modelo_proactivo_definicion.clone(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Lookup::Areas => "área operacional",
            Lookup::EventTypes => "tipos de eventos",
            Lookup::TopRisks => "top riesgos",
            Lookup::ProactiveDefinition => "definición de modelo proactivo",
        }
    }
}

/// Answer glossary questions or delegate
///
/// # Errors
/// Never fails.
pub fn run(mut state: PipelineState, _ctx: &NodeContext) -> Result<PipelineState, PipelineError> {
    let query = QueryText::new(state.user_query());
    let hit = state
        .context_bundle
        .as_ref()
        .and_then(|bundle| Lookup::find(&query).map(|lookup| (lookup, lookup.answer(bundle))));

    match hit {
        Some((lookup, answer)) => {
            tracing::debug!("Semantic retrieval hit: {:?}", lookup);
            state.note(format!("SemanticRetrieval: {} detectado.", lookup.label()));
            state.answer = Some(answer);
        }
        None => {
            state.note("SemanticRetrieval: sin coincidencias, se delega a la narrativa.");
        }
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retrieve(query: &str) -> PipelineState {
        let state = PipelineState::new(query).with_context(ContextBundle::standard());
        run(state, &NodeContext::empty()).unwrap()
    }

    #[test]
    fn answers_areas() {
        let state = retrieve("¿Qué áreas se analizan?");
        assert!(state.answer.unwrap().contains("Planta Concentradora"));
    }

    #[test]
    fn answers_event_types_in_order() {
        let answer = retrieve("¿qué significa OCC?").answer.unwrap();
        assert!(answer.starts_with("Tipos de eventos registrados:\n- NM:"));
        assert!(answer.contains("- HZD: Peligro detectado"));
    }

    #[test]
    fn short_codes_need_whole_words() {
        // "nm" inside another word does not trigger the event glossary
        let state = retrieve("estado del rajo en noviembre nmro");
        assert!(state.answer.is_none());
    }

    #[test]
    fn answers_proactive_definition() {
        let answer = retrieve("explica lo proactivo").answer.unwrap();
        assert!(answer.starts_with("El Modelo Proactivo es"));
    }

    #[test]
    fn no_match_delegates() {
        let state = retrieve("¿cómo va la tendencia en el rajo?");
        assert!(state.answer.is_none());
        assert!(state.reasoning()[0].contains("delega"));
    }

    #[test]
    fn without_context_delegates() {
        let state = run(PipelineState::new("áreas"), &NodeContext::empty()).unwrap();
        assert!(state.answer.is_none());
    }
}
