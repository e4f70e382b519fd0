//! Terminal translator from structured analysis to text
//!
//! Exactly one [`Mode`] fires per run, checked in declaration order. The
//! counterfactual mode is checked before the diagnostic one even when both
//! could apply.

use super::{join_es, NodeContext};
use crate::analysis::{Alignment, Analysis, ProactiveExplanation, RiskSummary};
use crate::error::PipelineError;
use crate::intent::{has_hedge, Intent};
use crate::state::PipelineState;
use crate::text::QueryText;

/// Answer mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// "What if the proactive model is wrong"
    Counterfactual,
    /// Proactive comparison reading
    Diagnostic,
    /// Dominant and relevant risk summary
    Baseline,
    /// Not enough information
    Fallback,
}

impl Mode {
    /// Select the mode for a state
    #[must_use]
    pub fn select(state: &PipelineState) -> Self {
        let analysis = state.analysis.as_ref();
        let explanation = analysis.and_then(|a| a.proactive_explanation.as_ref());
        let asks_counterfactual = state.intent == Some(Intent::ProactiveModelContrafactual)
            || has_hedge(&QueryText::new(state.user_query()));

        if explanation.is_some() && asks_counterfactual {
            Mode::Counterfactual
        } else if explanation.is_some() {
            Mode::Diagnostic
        } else if analysis
            .and_then(|a| a.risk_summary.as_ref())
            .is_some_and(|s| !s.named().is_empty())
        {
            Mode::Baseline
        } else {
            Mode::Fallback
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Mode::Counterfactual => "precautorio",
            Mode::Diagnostic => "diagnóstico",
            Mode::Baseline => "resumen de riesgos",
            Mode::Fallback => "fallback",
        }
    }
}

/// Write the final answer
///
/// # Errors
/// Never fails.
pub fn run(mut state: PipelineState, _ctx: &NodeContext) -> Result<PipelineState, PipelineError> {
    let mode = Mode::select(&state);
    let empty = Analysis::default();
    let analysis = state.analysis.as_ref().unwrap_or(&empty);

    let answer = match mode {
        Mode::Counterfactual => counterfactual(analysis),
        Mode::Diagnostic => analysis.proactive_explanation.as_ref().map_or_else(String::new, diagnostic),
        Mode::Baseline => analysis.risk_summary.as_ref().map_or_else(String::new, baseline),
        Mode::Fallback => fallback(analysis),
    };

    tracing::info!("Narrative mode: {}", mode.as_str());
    state.note(format!("Narrative: modo {}.", mode.as_str()));
    state.answer = Some(answer);
    Ok(state)
}

/// Candidate with (critical control failure, occ count)
struct Candidate<'a> {
    risk: &'a str,
    critical: bool,
    occ: usize,
}

fn candidates(analysis: &Analysis) -> Vec<Candidate<'_>> {
    let mut names: Vec<&str> = Vec::new();
    if let Some(explanation) = &analysis.proactive_explanation {
        names.extend(explanation.explained_risks.iter().map(String::as_str));
    }
    if let Some(summary) = &analysis.risk_summary {
        names.extend(summary.named());
    }
    names.sort_unstable();
    names.dedup();

    let mut out: Vec<Candidate<'_>> = names
        .into_iter()
        .filter_map(|risk| {
            let obs = analysis.observations_summary.as_ref()?.get(risk)?;
            let critical = obs.critical_control_failures > 0;
            (critical || obs.occ_count > 0).then_some(Candidate {
                risk,
                critical,
                occ: obs.occ_count,
            })
        })
        .collect();
    // stable sort keeps lexicographic order among equals
    out.sort_by(|a, b| (b.critical, b.occ).cmp(&(a.critical, a.occ)));
    out
}

fn counterfactual(analysis: &Analysis) -> String {
    let ranked = candidates(analysis);
    if ranked.is_empty() {
        return "Si el Modelo Proactivo se equivoca, no hay evidencia operacional suficiente (OCC o fallas de \
                control crítico) para recomendar una priorización precautoria distinta. Se sugiere mantener \
                el monitoreo de los riesgos actuales."
            .to_string();
    }

    let top: Vec<&str> = ranked.iter().take(2).map(|c| c.risk).collect();
    let mut answer = format!(
        "Si el Modelo Proactivo se equivoca, la evidencia operacional sugiere mantener una atención precautoria \
         sobre {}.",
        join_es(&top)
    );
    let critical: Vec<&str> = ranked.iter().take(2).filter(|c| c.critical).map(|c| c.risk).collect();
    if !critical.is_empty() {
        answer.push_str(&format!(
            " En {} se registran observaciones que involucran controles críticos.",
            join_es(&critical)
        ));
    }
    answer.push_str(" Esta es una recomendación preventiva y no confirma la ocurrencia de un incidente.");
    answer
}

fn diagnostic(explanation: &ProactiveExplanation) -> String {
    let risks: Vec<&str> = explanation.explained_risks.iter().map(String::as_str).collect();
    let risks = join_es(&risks);
    match explanation.alignment_status {
        Alignment::Aligned => format!(
            "El Modelo Proactivo y el análisis interno coinciden en la priorización de {risks}; \
             la señal proactiva refuerza la lectura actual."
        ),
        Alignment::UnderestimatedByProactive => format!(
            "El Modelo Proactivo asigna menor prioridad que el análisis interno a {risks}; \
             conviene no descartar estos riesgos solo por la señal proactiva."
        ),
        Alignment::OverestimatedByProactive => format!(
            "El Modelo Proactivo asigna mayor prioridad que el análisis interno a {risks}; \
             podría estar anticipando un alza que los datos internos aún no muestran."
        ),
        Alignment::Inconclusive => format!(
            "La comparación entre el Modelo Proactivo y el análisis interno para {risks} no es concluyente."
        ),
    }
}

fn baseline(summary: &RiskSummary) -> String {
    let mut parts = Vec::new();
    if let Some(dominant) = &summary.dominant_risk {
        parts.push(format!(
            "El riesgo dominante del periodo es {dominant}, con la mayor criticidad promedio."
        ));
    }
    if let Some(relevant) = &summary.relevant_risk {
        parts.push(format!(
            "{relevant} muestra una tendencia al alza y merece atención separada."
        ));
    }
    if summary.has_operational_support {
        parts.push("Esta lectura cuenta con respaldo de observaciones operacionales (OCC).".to_string());
    }
    parts.join(" ")
}

fn fallback(analysis: &Analysis) -> String {
    let lead = analysis
        .areas_analizadas
        .as_ref()
        .filter(|areas| !areas.is_empty())
        .map_or_else(
            || "El análisis aún no".to_string(),
            |areas| format!("El análisis considera el área de {}, pero aún no", areas.join(", ")),
        );
    format!(
        "{lead} se dispone de información suficiente para generar un resumen completo. A medida que se \
         registren observaciones y señales operacionales, el sistema podrá identificar tendencias y \
         riesgos prioritarios."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{CountsScope, RiskObservations, SupportLevel};
    use std::collections::BTreeMap;

    fn explanation(status: Alignment, risks: &[&str]) -> ProactiveExplanation {
        ProactiveExplanation {
            alignment_status: status,
            explained_risks: risks.iter().map(|r| (*r).to_string()).collect(),
            explanations: BTreeMap::new(),
        }
    }

    fn observed(occ: usize, ccf: usize) -> RiskObservations {
        RiskObservations {
            opg_count: 0,
            occ_count: occ,
            critical_control_failures: ccf,
            support_level: SupportLevel::from_counts(occ, ccf),
            counts_scope: CountsScope::PerRisk,
        }
    }

    fn summary(dominant: &str, relevant: Option<&str>, supported: bool) -> RiskSummary {
        RiskSummary {
            dominant_risk: Some(dominant.to_string()),
            relevant_risk: relevant.map(str::to_string),
            has_operational_support: supported,
        }
    }

    fn narrate(query: &str, analysis: Analysis) -> PipelineState {
        run(PipelineState::new(query).with_analysis(analysis), &NodeContext::empty()).unwrap()
    }

    #[test]
    fn hedge_with_explanation_is_counterfactual() {
        let mut obs = BTreeMap::new();
        obs.insert("R01".to_string(), observed(2, 0));
        obs.insert("R02".to_string(), observed(1, 1));
        obs.insert("R09".to_string(), observed(9, 9));
        let state = narrate(
            "¿qué pasaría si el modelo proactivo se equivoca?",
            Analysis {
                proactive_explanation: Some(explanation(Alignment::Aligned, &["R01"])),
                risk_summary: Some(summary("R02", None, true)),
                observations_summary: Some(obs),
                ..Analysis::default()
            },
        );
        let answer = state.answer.clone().unwrap();
        // R02 has a critical control failure so it outranks R01; R09 is not a candidate
        assert!(answer.contains("sobre R02 y R01"), "{answer}");
        assert!(answer.contains("sugiere"));
        assert!(answer.contains("no confirma"));
        assert!(!answer.contains("R09"));
        assert!(state.reasoning()[0].contains("precautorio"));
    }

    #[test]
    fn contrafactual_intent_without_hedge_is_counterfactual() {
        let state = PipelineState::new("modelo proactivo")
            .with_intent(Intent::ProactiveModelContrafactual)
            .with_analysis(Analysis {
                proactive_explanation: Some(explanation(Alignment::Aligned, &["R01"])),
                ..Analysis::default()
            });
        assert_eq!(Mode::select(&state), Mode::Counterfactual);
        let answer = run(state, &NodeContext::empty()).unwrap().answer.unwrap();
        assert!(answer.contains("no hay evidencia operacional suficiente"));
    }

    #[test]
    fn hedge_without_explanation_is_not_counterfactual() {
        let state = PipelineState::new("y si el modelo falla").with_analysis(Analysis {
            risk_summary: Some(summary("R02", Some("R01"), false)),
            ..Analysis::default()
        });
        assert_eq!(Mode::select(&state), Mode::Baseline);
    }

    #[test]
    fn explanation_without_hedge_is_diagnostic() {
        let state = narrate(
            "compara el modelo proactivo",
            Analysis {
                proactive_explanation: Some(explanation(Alignment::UnderestimatedByProactive, &["R01", "R02"])),
                ..Analysis::default()
            },
        );
        let answer = state.answer.unwrap();
        assert!(answer.contains("menor prioridad"));
        assert!(answer.contains("R01 y R02"));
    }

    #[test]
    fn baseline_names_both_risks_and_support() {
        let answer = narrate(
            "resumen",
            Analysis {
                risk_summary: Some(summary("R02", Some("R01"), true)),
                ..Analysis::default()
            },
        )
        .answer
        .unwrap();
        assert!(answer.starts_with("El riesgo dominante del periodo es R02"));
        assert!(answer.contains("R01 muestra una tendencia al alza"));
        assert!(answer.contains("respaldo de observaciones"));
    }

    #[test]
    fn empty_summary_falls_back() {
        let state = narrate(
            "resumen",
            Analysis {
                risk_summary: Some(RiskSummary::default()),
                areas_analizadas: Some(vec!["Mina Rajo".into()]),
                ..Analysis::default()
            },
        );
        let answer = state.answer.clone().unwrap();
        assert!(answer.starts_with("El análisis considera el área de Mina Rajo"));
        assert!(answer.contains("no se dispone de información suficiente"));
        assert!(state.reasoning()[0].contains("fallback"));
    }

    #[test]
    fn no_analysis_falls_back() {
        let state = run(PipelineState::new("resumen"), &NodeContext::empty()).unwrap();
        assert!(state.answer.unwrap().contains("información suficiente"));
    }
}
