//! Intent vocabulary and classification rules
//!
//! The rule table is ordered and first match wins. Each rule lists keyword
//! groups; a rule matches when every group has at least one keyword in the
//! query.

use crate::text::{Keyword, QueryText};
use serde::{Deserialize, Serialize};
use std::fmt;

use Keyword::{Phrase, Word};

/// Symbolic classification of a query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Intent {
    /// Greeting or small talk
    Greeting,
    /// Question about the proactive model
    ProactiveModel,
    /// "What if the proactive model is wrong"
    ProactiveModelContrafactual,
    /// BowTie methodology
    Bowtie,
    /// Fall from height
    RiskCaidaAltura,
    /// Falling objects
    RiskCaidaObjetos,
    /// Contact with energy
    RiskContactoEnergia,
    /// Generic risk question
    Riesgos,
    /// Mining operations in general
    MiningGeneral,
    /// Forecast request
    Predictor,
    /// Interpretation request
    Analyst,
    /// Nothing more specific matched
    GeneralQuestion,
    /// Risk lookup
    ConsultaRiesgo,
    /// Event lookup
    ConsultaEventos,
    /// Area lookup
    ConsultaArea,
    /// BowTie lookup
    ConsultaBowtie,
    /// Rejected by the guardrail
    OutOfDomain,
    /// Any tag outside the vocabulary
    Unrecognized(String),
}

impl Intent {
    /// Closed vocabulary
    pub const VOCABULARY: [Intent; 17] = [
        Intent::Greeting,
        Intent::ProactiveModel,
        Intent::ProactiveModelContrafactual,
        Intent::Bowtie,
        Intent::RiskCaidaAltura,
        Intent::RiskCaidaObjetos,
        Intent::RiskContactoEnergia,
        Intent::Riesgos,
        Intent::MiningGeneral,
        Intent::Predictor,
        Intent::Analyst,
        Intent::GeneralQuestion,
        Intent::ConsultaRiesgo,
        Intent::ConsultaEventos,
        Intent::ConsultaArea,
        Intent::ConsultaBowtie,
        Intent::OutOfDomain,
    ];

    /// Tag as written in state maps
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Intent::Greeting => "greeting",
            Intent::ProactiveModel => "proactive_model",
            Intent::ProactiveModelContrafactual => "proactive_model_contrafactual",
            Intent::Bowtie => "bowtie",
            Intent::RiskCaidaAltura => "risk_caida_altura",
            Intent::RiskCaidaObjetos => "risk_caida_objetos",
            Intent::RiskContactoEnergia => "risk_contacto_energia",
            Intent::Riesgos => "riesgos",
            Intent::MiningGeneral => "mining_general",
            Intent::Predictor => "predictor",
            Intent::Analyst => "analyst",
            Intent::GeneralQuestion => "general_question",
            Intent::ConsultaRiesgo => "consulta_riesgo",
            Intent::ConsultaEventos => "consulta_eventos",
            Intent::ConsultaArea => "consulta_area",
            Intent::ConsultaBowtie => "consulta_bowtie",
            Intent::OutOfDomain => "out_of_domain",
            Intent::Unrecognized(tag) => tag,
        }
    }

    /// Parse a tag; unknown tags become [`Intent::Unrecognized`]
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        let tag = tag.trim();
        Self::VOCABULARY
            .iter()
            .find(|i| i.as_str() == tag)
            .cloned()
            .unwrap_or_else(|| Intent::Unrecognized(tag.to_string()))
    }

    /// Intents the guardrail passes through without a keyword re-scan
    #[must_use]
    pub fn is_whitelisted(&self) -> bool {
        !matches!(
            self,
            Intent::GeneralQuestion | Intent::OutOfDomain | Intent::Unrecognized(_)
        )
    }

    /// Intents that never need the data nodes
    #[inline]
    #[must_use]
    pub fn skips_analysis(&self) -> bool {
        matches!(self, Intent::Greeting | Intent::OutOfDomain)
    }
}

impl From<String> for Intent {
    fn from(tag: String) -> Self {
        Intent::parse(&tag)
    }
}

impl From<Intent> for String {
    fn from(intent: Intent) -> Self {
        intent.as_str().to_string()
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Greeting keywords
pub const GREETING: &[Keyword] = &[
    Word("hola"),
    Word("buenas"),
    Word("hello"),
    Word("hi"),
    Phrase("buen dia"),
    Phrase("buenos dias"),
    Phrase("buenas tardes"),
    Phrase("que tal"),
];

/// Mentions of the proactive model
pub const PROACTIVE_MENTION: &[Keyword] = &[Phrase("modelo proactivo"), Phrase("proactive model")];

/// Phrases asking what happens if the proactive model is wrong
pub const HEDGE_PHRASES: &[Keyword] = &[
    Phrase("si el modelo se equivoca"),
    Phrase("si el modelo proactivo se equivoca"),
    Phrase("que pasaria si"),
    Phrase("y si el modelo"),
    Phrase("deberian preocupar"),
    Phrase("deberia preocupar"),
    Phrase("si el modelo falla"),
    Phrase("si el modelo proactivo falla"),
    Phrase("si el modelo proactivo subestima"),
    Phrase("en caso de que el modelo"),
];

const BOWTIE: &[Keyword] = &[Phrase("bowtie"), Phrase("bow tie"), Phrase("corbatin")];
const FALL_FROM_HEIGHT: &[Keyword] = &[Phrase("caida"), Phrase("altura")];
const FALLING_OBJECTS: &[Keyword] = &[Phrase("objeto")];
const ENERGY: &[Keyword] = &[Phrase("energia"), Phrase("electrica")];
const RISK: &[Keyword] = &[Phrase("riesgo")];

/// Mining vocabulary used by the classifier
pub const MINING: &[Keyword] = &[
    Word("mina"),
    Word("rajo"),
    Phrase("escondida"),
    Phrase("alturas"),
    Phrase("faena"),
    Phrase("campamento"),
    Word("pala"),
    Word("camion"),
    Word("scoop"),
    Phrase("concentradora"),
    Phrase("chancado"),
    Word("taller"),
    Phrase("mantencion"),
];

const PREDICTOR: &[Keyword] = &[
    Phrase("predecir"),
    Phrase("prediccion"),
    Phrase("proyeccion"),
    Phrase("probabilidad"),
    Phrase("pronostico"),
    Phrase("forecast"),
];

const ANALYST: &[Keyword] = &[
    Phrase("que significa"),
    Phrase("interpretacion"),
    Phrase("es bueno"),
    Phrase("es malo"),
    Phrase("tendencia"),
    Phrase("analisis"),
];

/// Mining vocabulary the guardrail uses to rescue a `general_question`
pub const DOMAIN_SIGNALS: &[Keyword] = &[
    Word("mina"),
    Word("rajo"),
    Phrase("faena"),
    Phrase("escondida"),
    Word("camion"),
    Word("pala"),
    Phrase("alturas"),
    Word("planta"),
    Phrase("concentradora"),
    Phrase("chancado"),
    Word("taller"),
    Phrase("mantencion"),
    Phrase("lixiviacion"),
    Word("scoop"),
    Word("area"),
    Word("areas"),
    Phrase("operacional"),
];

/// One classification rule
#[derive(Debug, Clone, Serialize)]
pub struct IntentRule {
    /// Rule name, recorded in the reasoning trail
    pub name: &'static str,
    /// Intent assigned on match
    pub intent: Intent,
    /// Keyword groups that must all match
    pub requires: &'static [&'static [Keyword]],
}

/// Ordered rule table, first match wins
pub static RULES: &[IntentRule] = &[
    IntentRule { name: "greeting", intent: Intent::Greeting, requires: &[GREETING] },
    IntentRule {
        name: "proactive_model_contrafactual",
        intent: Intent::ProactiveModelContrafactual,
        requires: &[PROACTIVE_MENTION, HEDGE_PHRASES],
    },
    IntentRule { name: "proactive_model", intent: Intent::ProactiveModel, requires: &[PROACTIVE_MENTION] },
    IntentRule { name: "bowtie", intent: Intent::Bowtie, requires: &[BOWTIE] },
    IntentRule { name: "risk_caida_altura", intent: Intent::RiskCaidaAltura, requires: &[FALL_FROM_HEIGHT] },
    IntentRule { name: "risk_caida_objetos", intent: Intent::RiskCaidaObjetos, requires: &[FALLING_OBJECTS] },
    IntentRule { name: "risk_contacto_energia", intent: Intent::RiskContactoEnergia, requires: &[ENERGY] },
    IntentRule { name: "riesgos", intent: Intent::Riesgos, requires: &[RISK] },
    IntentRule { name: "mining_general", intent: Intent::MiningGeneral, requires: &[MINING] },
    IntentRule { name: "predictor", intent: Intent::Predictor, requires: &[PREDICTOR] },
    IntentRule { name: "analyst", intent: Intent::Analyst, requires: &[ANALYST] },
];

/// Name of the implicit last rule
pub const FALLBACK_RULE: &str = "general_question";

/// Result of running the rule table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Assigned intent
    pub intent: Intent,
    /// Name of the rule that fired
    pub rule: &'static str,
    /// Keywords that satisfied the rule
    pub matched: Vec<Keyword>,
}

impl IntentRule {
    /// Keywords satisfying every group, or `None` if any group misses
    #[must_use]
    pub fn evaluate(&self, query: &QueryText) -> Option<Vec<Keyword>> {
        self.requires.iter().map(|group| query.first_match(group)).collect()
    }
}

/// Classify a query with the rule table
#[must_use]
pub fn classify(query: &QueryText) -> Classification {
    RULES
        .iter()
        .find_map(|rule| {
            rule.evaluate(query).map(|matched| Classification {
                intent: rule.intent.clone(),
                rule: rule.name,
                matched,
            })
        })
        .unwrap_or(Classification {
            intent: Intent::GeneralQuestion,
            rule: FALLBACK_RULE,
            matched: Vec::new(),
        })
}

/// Whether the query carries a hedge phrase
#[inline]
#[must_use]
pub fn has_hedge(query: &QueryText) -> bool {
    query.contains_any(HEDGE_PHRASES)
}
