//! Pipeline state and static domain context

use crate::analysis::{Analysis, RiskEnrichment};
use crate::intent::Intent;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// State threaded through every node
///
/// Created fresh per query. Nodes receive it by value and hand back the
/// updated value; `user_query` cannot change after construction and
/// `reasoning` only grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    user_query: String,
    /// Symbolic intent, set by the classifier and possibly the guardrail
    #[serde(default)]
    pub intent: Option<Intent>,
    /// True iff the guardrail rejected the query
    #[serde(default)]
    pub demo_mode: bool,
    /// Static domain glossary
    #[serde(default)]
    pub context_bundle: Option<ContextBundle>,
    /// Structured fact store
    #[serde(default)]
    pub analysis: Option<Analysis>,
    /// OCC to risk to control linkage
    #[serde(default)]
    pub risk_enrichment: Option<RiskEnrichment>,
    #[serde(default)]
    reasoning: Vec<String>,
    /// Final user-facing text
    #[serde(default)]
    pub answer: Option<String>,
}

impl PipelineState {
    /// Create a fresh state for a query
    #[inline]
    #[must_use]
    pub fn new(user_query: impl Into<String>) -> Self {
        Self {
            user_query: user_query.into(),
            intent: None,
            demo_mode: false,
            context_bundle: None,
            analysis: None,
            risk_enrichment: None,
            reasoning: Vec::new(),
            answer: None,
        }
    }

    /// With a pre-set intent
    #[inline]
    #[must_use]
    pub fn with_intent(mut self, intent: Intent) -> Self {
        self.intent = Some(intent);
        self
    }

    /// With a pre-built analysis
    #[inline]
    #[must_use]
    pub fn with_analysis(mut self, analysis: Analysis) -> Self {
        self.analysis = Some(analysis);
        self
    }

    /// With a context bundle
    #[inline]
    #[must_use]
    pub fn with_context(mut self, context: ContextBundle) -> Self {
        self.context_bundle = Some(context);
        self
    }

    /// Build from a plain map holding at least `user_query`
    ///
    /// # Errors
    /// Returns the deserialization error for a malformed map.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Final state as a plain map
    ///
    /// # Errors
    /// Returns the serialization error, which only occurs for non-finite
    /// floats in the analysis.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Raw query
    #[inline]
    #[must_use]
    pub fn user_query(&self) -> &str {
        &self.user_query
    }

    /// Intent or `general_question` when unset
    #[must_use]
    pub fn intent_or_default(&self) -> Intent {
        self.intent.clone().unwrap_or(Intent::GeneralQuestion)
    }

    /// Append an audit entry
    #[inline]
    pub fn note(&mut self, entry: impl Into<String>) {
        self.reasoning.push(entry.into());
    }

    /// Audit trail
    #[inline]
    #[must_use]
    pub fn reasoning(&self) -> &[String] {
        &self.reasoning
    }

    /// Analysis, created empty if absent
    pub fn analysis_mut(&mut self) -> &mut Analysis {
        self.analysis.get_or_insert_with(Analysis::default)
    }
}

/// Static domain knowledge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBundle {
    /// Operational areas
    pub areas_operacionales: Vec<String>,
    /// Canonical top risks
    pub top_riesgos_escondida: Vec<String>,
    /// Proactive model definition
    pub modelo_proactivo_definicion: String,
    /// Event type glossary in display order
    pub tipos_eventos: IndexMap<String, String>,
    /// Bundle version
    pub version_contexto: String,
}

impl ContextBundle {
    /// The built-in operational context
    #[must_use]
    pub fn standard() -> Self {
        let list = |items: &[&str]| -> Vec<String> { items.iter().map(|s| (*s).to_string()).collect() };
        Self {
            areas_operacionales: list(&[
                "Mina Rajo",
                "Planta Concentradora",
                "Chancado",
                "Taller de Mantención",
                "Campamento",
            ]),
            top_riesgos_escondida: list(&["Caída de altura", "Caída de objetos", "Contacto con energía"]),
            modelo_proactivo_definicion: "El Modelo Proactivo es una metodología predictiva usada en minería \
                 para anticipar riesgos operacionales en ventanas de corto plazo."
                .to_string(),
            tipos_eventos: [
                ("NM", "Near Miss (evento sin lesión pero con potencial)"),
                ("OPG", "Oportunidad de mejora"),
                ("OCC", "Observación de conducta crítica"),
                ("INC", "Incidente"),
                ("HZD", "Peligro detectado"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            version_contexto: "0.1".to_string(),
        }
    }
}

impl Default for ContextBundle {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_minimal_map() {
        let state = PipelineState::from_value(json!({ "user_query": "hola" })).unwrap();
        assert_eq!(state.user_query(), "hola");
        assert!(state.intent.is_none());
        assert!(state.reasoning().is_empty());
    }

    #[test]
    fn preset_intent_parses_from_map() {
        let state = PipelineState::from_value(json!({
            "user_query": "x",
            "intent": "no_such_intent"
        }))
        .unwrap();
        assert_eq!(state.intent, Some(Intent::Unrecognized("no_such_intent".into())));
    }

    #[test]
    fn to_value_exposes_contract_keys() {
        let mut state = PipelineState::new("q").with_intent(Intent::Riesgos);
        state.note("step");
        state.answer = Some("a".into());
        let v = state.to_value().unwrap();
        assert_eq!(v["intent"], "riesgos");
        assert_eq!(v["answer"], "a");
        assert_eq!(v["reasoning"], json!(["step"]));
        assert!(v["analysis"].is_null());
    }

    #[test]
    fn standard_context_keeps_event_order() {
        let ctx = ContextBundle::standard();
        let keys: Vec<_> = ctx.tipos_eventos.keys().map(String::as_str).collect();
        assert_eq!(keys, ["NM", "OPG", "OCC", "INC", "HZD"]);
        assert_eq!(ctx.version_contexto, "0.1");
        assert_eq!(ctx.areas_operacionales.len(), 5);
    }
}
