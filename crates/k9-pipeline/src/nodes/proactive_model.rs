//! Proactive model leaf
//!
//! With a ranking comparison available the node explains the alignment and
//! hands over to the narrative. The language stays hedged: the proactive
//! signal can reinforce or fail to contradict a reading, never confirm an
//! event.

use super::NodeContext;
use crate::analysis::{Alignment, Analysis, ProactiveAlignment, ProactiveExplanation};
use crate::error::PipelineError;
use crate::state::{ContextBundle, PipelineState};
use std::collections::BTreeMap;

/// Explain the proactive model against the internal ranking
///
/// # Errors
/// Never fails.
pub fn run(mut state: PipelineState, _ctx: &NodeContext) -> Result<PipelineState, PipelineError> {
    let explanation = state.analysis.as_ref().and_then(explain);

    match explanation {
        Some(explanation) => {
            tracing::info!(
                "Proactive alignment {} over {} risks",
                explanation.alignment_status.as_str(),
                explanation.explained_risks.len()
            );
            state.note(format!(
                "ProactiveModel: alineación '{}' para {}.",
                explanation.alignment_status.as_str(),
                explanation.explained_risks.join(", ")
            ));
            state.analysis_mut().proactive_explanation = Some(explanation);
        }
        None => {
            let bundle = state.context_bundle.clone().unwrap_or_default();
            state.note("ProactiveModel: sin comparación disponible, explicación general del Modelo Proactivo.");
            state.answer = Some(static_answer(&bundle));
        }
    }
    Ok(state)
}

/// Risks of interest: the named risks that were compared, or every
/// compared risk when none of them was
fn relevant_risks(analysis: &Analysis, comparison: &BTreeMap<String, ProactiveAlignment>) -> Vec<String> {
    let named: Vec<String> = analysis
        .risk_summary
        .as_ref()
        .map(|s| s.named().into_iter().filter(|r| comparison.contains_key(*r)).map(str::to_string).collect())
        .unwrap_or_default();
    if named.is_empty() {
        comparison.keys().cloned().collect()
    } else {
        named
    }
}

/// Overall status: any underestimate, else any overestimate, else aligned
/// if any risk is aligned, else inconclusive
fn overall(statuses: &[Alignment]) -> Alignment {
    if statuses.contains(&Alignment::UnderestimatedByProactive) {
        Alignment::UnderestimatedByProactive
    } else if statuses.contains(&Alignment::OverestimatedByProactive) {
        Alignment::OverestimatedByProactive
    } else if statuses.contains(&Alignment::Aligned) {
        Alignment::Aligned
    } else {
        Alignment::Inconclusive
    }
}

fn explain(analysis: &Analysis) -> Option<ProactiveExplanation> {
    let comparison = analysis.proactive_comparison.as_ref().filter(|c| !c.is_empty())?;
    let supported = analysis
        .operational_evidence
        .as_ref()
        .map(|e| e.supported_risks.as_slice())
        .unwrap_or_default();

    let explained_risks = relevant_risks(analysis, comparison);
    let mut statuses = Vec::with_capacity(explained_risks.len());
    let mut explanations = BTreeMap::new();
    for risk in &explained_risks {
        let Some(cmp) = comparison.get(risk) else {
            continue;
        };
        statuses.push(cmp.alignment);
        let mut text = risk_text(risk, cmp);
        if supported.contains(risk) {
            text.push_str(" La evidencia operacional (OCC) asociada no contradice esta lectura.");
        }
        explanations.insert(risk.clone(), text);
    }

    Some(ProactiveExplanation {
        alignment_status: overall(&statuses),
        explained_risks,
        explanations,
    })
}

fn risk_text(risk: &str, cmp: &ProactiveAlignment) -> String {
    let delta = cmp.rank_delta;
    match cmp.alignment {
        Alignment::Aligned => format!(
            "Para {risk}, el Modelo Proactivo y el ranking interno coinciden (delta de rango {delta:+.1}); \
             la señal proactiva refuerza la lectura actual."
        ),
        Alignment::UnderestimatedByProactive => format!(
            "Para {risk}, el Modelo Proactivo asigna menor prioridad que el ranking interno (delta de rango {delta:+.1}); \
             conviene no descartar este riesgo solo por la señal proactiva."
        ),
        Alignment::OverestimatedByProactive => format!(
            "Para {risk}, el Modelo Proactivo asigna mayor prioridad que el ranking interno (delta de rango {delta:+.1}); \
             la señal proactiva podría anticipar un alza que los datos internos aún no muestran."
        ),
        Alignment::Inconclusive => {
            format!("Para {risk}, la comparación entre el Modelo Proactivo y el ranking interno no es concluyente.")
        }
    }
}

/// General explanation used when no comparison exists
#[must_use]
pub fn static_answer(bundle: &ContextBundle) -> String {
    let event_codes: Vec<&str> = bundle.tipos_eventos.keys().map(String::as_str).collect();
    format!(
        "Modelo Proactivo — Explicación General\n\n\
         {}\n\n\
         • Riesgos priorizados actualmente: {}\n\
         • Tipos de eventos analizados: {}\n\n\
         El Modelo Proactivo se utiliza para anticipar tendencias de riesgo en ventanas de corto plazo \
         (generalmente 4 a 7 semanas) para apoyar la toma de decisiones operacionales.",
        bundle.modelo_proactivo_definicion,
        bundle.top_riesgos_escondida.join(", "),
        event_codes.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{OperationalEvidence, RiskSummary};

    fn aligned(delta: f64) -> ProactiveAlignment {
        ProactiveAlignment {
            avg_rank_k9: 2.0,
            avg_rank_proactivo: 2.0 + delta,
            rank_delta: delta,
            alignment: Alignment::from_delta(delta),
        }
    }

    fn analysis(deltas: &[(&str, f64)], dominant: Option<&str>, supported: &[&str]) -> Analysis {
        Analysis {
            proactive_comparison: Some(deltas.iter().map(|(r, d)| ((*r).to_string(), aligned(*d))).collect()),
            risk_summary: Some(RiskSummary {
                dominant_risk: dominant.map(str::to_string),
                ..RiskSummary::default()
            }),
            operational_evidence: Some(OperationalEvidence {
                supported_risks: supported.iter().map(|s| (*s).to_string()).collect(),
                ..OperationalEvidence::default()
            }),
            ..Analysis::default()
        }
    }

    fn explain_state(a: Analysis) -> PipelineState {
        run(PipelineState::new("modelo proactivo").with_analysis(a), &NodeContext::empty()).unwrap()
    }

    #[test]
    fn explanation_restricted_to_named_risks() {
        let state = explain_state(analysis(&[("R01", 3.0), ("R02", 0.0)], Some("R02"), &[]));
        assert!(state.answer.is_none());
        let e = state.analysis.unwrap().proactive_explanation.unwrap();
        assert_eq!(e.explained_risks, vec!["R02"]);
        assert_eq!(e.alignment_status, Alignment::Aligned);
        assert!(e.explanations["R02"].contains("refuerza"));
    }

    #[test]
    fn underestimate_dominates_overall_status() {
        let state = explain_state(analysis(&[("R01", 3.0), ("R02", -2.0)], None, &["R01"]));
        let e = state.analysis.unwrap().proactive_explanation.unwrap();
        assert_eq!(e.explained_risks, vec!["R01", "R02"]);
        assert_eq!(e.alignment_status, Alignment::UnderestimatedByProactive);
        assert!(e.explanations["R01"].contains("no contradice"));
        assert!(!e.explanations["R02"].contains("no contradice"));
    }

    #[test]
    fn overall_status_order() {
        assert_eq!(
            overall(&[Alignment::OverestimatedByProactive, Alignment::Aligned]),
            Alignment::OverestimatedByProactive
        );
        assert_eq!(overall(&[Alignment::Inconclusive, Alignment::Aligned]), Alignment::Aligned);
        assert_eq!(overall(&[Alignment::Inconclusive]), Alignment::Inconclusive);
        assert_eq!(overall(&[]), Alignment::Inconclusive);
    }

    #[test]
    fn static_answer_without_comparison() {
        let state = PipelineState::new("modelo proactivo").with_context(ContextBundle::standard());
        let state = run(state, &NodeContext::empty()).unwrap();
        let answer = state.answer.unwrap();
        assert!(answer.starts_with("Modelo Proactivo — Explicación General"));
        assert!(answer.contains("NM, OPG, OCC, INC, HZD"));
    }
}
