//! End-to-end runs over the shared fixtures

use k9_pipeline::analysis::{ChartType, ThresholdStatus};
use k9_pipeline::nodes::{fallback, llm};
use k9_pipeline::{
    Alignment, GeneratorConfig, Intent, NodeKind, Pipeline, PipelineConfig, TextGenerator,
};
use k9_test_utils::{broken_proactive_source, scenario_source, write_scenario_dir, FailingGenerator, RecordingGenerator};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn pipeline() -> Pipeline {
    Pipeline::from_source(Arc::new(scenario_source())).unwrap()
}

fn with_generator(generator: Arc<dyn TextGenerator>) -> Pipeline {
    pipeline().with_generator(generator)
}

#[test]
fn greeting_answers_without_touching_data() {
    let generator = Arc::new(RecordingGenerator::new("¡Hola! Soy K9."));
    let outcome = with_generator(generator.clone()).ask("hola").unwrap();

    assert_eq!(outcome.state.intent, Some(Intent::Greeting));
    assert_eq!(outcome.state.answer.as_deref(), Some("¡Hola! Soy K9."));
    assert!(!outcome.trace.touched_data());
    assert!(!outcome.trace.contains(NodeKind::Narrative));
    assert_eq!(generator.calls(), 1);
    assert!(generator.prompts()[0].contains("INTENCIÓN: greeting"));
}

#[test]
fn greeting_without_generator_apologizes() {
    let outcome = pipeline().ask("buenos días").unwrap();
    assert_eq!(outcome.state.answer.as_deref(), Some(llm::APOLOGY));
}

#[test]
fn generator_failure_apologizes() {
    let outcome = with_generator(Arc::new(FailingGenerator)).ask("hola").unwrap();
    assert_eq!(outcome.state.answer.as_deref(), Some(llm::APOLOGY));
    assert!(outcome.state.reasoning().iter().any(|r| r.starts_with("LLM ERROR")));
}

#[test]
fn risk_question_lists_context_risks() {
    let outcome = pipeline().ask("cuáles son los riesgos principales").unwrap();
    assert_eq!(outcome.state.intent, Some(Intent::Riesgos));
    let answer = outcome.state.answer.unwrap();
    for risk in ["Caída de altura", "Caída de objetos", "Contacto con energía"] {
        assert!(answer.contains(risk), "{risk}");
    }
    assert_eq!(outcome.trace.leaf(), Some(NodeKind::Riesgos));
}

#[test]
fn out_of_domain_is_refused_without_calling_out() {
    let generator = Arc::new(RecordingGenerator::new("Santiago"));
    let outcome = with_generator(generator.clone()).ask("¿cuál es la capital de chile?").unwrap();

    assert_eq!(outcome.state.intent, Some(Intent::OutOfDomain));
    assert!(outcome.state.demo_mode);
    assert_eq!(outcome.state.answer.as_deref(), Some(fallback::ANSWER));
    assert!(outcome.state.reasoning().iter().any(|r| r.contains("out_of_domain")));
    assert_eq!(generator.calls(), 0);
    assert!(!outcome.trace.touched_data());
    assert_eq!(outcome.trace.leaf(), Some(NodeKind::Fallback));
}

#[test]
fn non_domain_queries_are_redirected_by_the_fallback() {
    let generator = Arc::new(RecordingGenerator::new("x"));
    let pipeline = with_generator(generator.clone());
    for query in ["what is the weather", "receta de pan", "???", "", "quién ganó el partido"] {
        let outcome = pipeline.ask(query).unwrap();
        assert_eq!(outcome.trace.leaf(), Some(NodeKind::Fallback), "{query}");
        assert!(outcome.state.demo_mode, "{query}");
        assert!(!outcome.trace.contains(NodeKind::Narrative), "{query}");
    }
    assert_eq!(generator.calls(), 0);
}

#[test]
fn steady_higher_risk_dominates_rising_risk_is_relevant() {
    let outcome = pipeline().ask("resumen de la faena").unwrap();
    assert_eq!(outcome.state.intent, Some(Intent::MiningGeneral));

    let analysis = outcome.state.analysis.as_ref().unwrap();
    let summary = analysis.risk_summary.as_ref().unwrap();
    assert_eq!(summary.dominant_risk.as_deref(), Some("R02"));
    assert_eq!(summary.relevant_risk.as_deref(), Some("R01"));
    assert!(summary.has_operational_support);

    let thresholds = &analysis.thresholds.as_ref().unwrap().by_risk;
    assert_eq!(thresholds["R01"].status, ThresholdStatus::ApproachingThreshold);
    assert_eq!(thresholds["R02"].status, ThresholdStatus::BelowThreshold);

    let suggestions = &analysis.metrics.as_ref().unwrap().visual_suggestions;
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].chart, ChartType::LineChart);

    let answer = outcome.state.answer.unwrap();
    assert!(answer.starts_with("El riesgo dominante del periodo es R02"), "{answer}");
    assert_eq!(outcome.trace.visited().last(), Some(&NodeKind::Narrative));
}

#[test]
fn counterfactual_question_gets_precautionary_answer() {
    let outcome = pipeline()
        .ask("¿qué pasaría si el modelo proactivo se equivoca?")
        .unwrap();
    assert_eq!(outcome.state.intent, Some(Intent::ProactiveModelContrafactual));

    let analysis = outcome.state.analysis.as_ref().unwrap();
    let explanation = analysis.proactive_explanation.as_ref().unwrap();
    assert_eq!(explanation.explained_risks, vec!["R02", "R01"]);
    assert_eq!(explanation.alignment_status, Alignment::UnderestimatedByProactive);
    assert!(analysis.observations_summary.as_ref().unwrap()["R01"].occ_count > 0);

    let answer = outcome.state.answer.unwrap();
    assert!(answer.contains("sugiere"), "{answer}");
    assert!(answer.contains("precautoria"));
    assert!(answer.contains("sobre R01 y R02"));
    assert!(!answer.contains("ocurrió"));
}

#[test]
fn proactive_question_without_hedge_is_diagnostic() {
    let outcome = pipeline().ask("explica el modelo proactivo frente al ranking").unwrap();
    assert_eq!(outcome.state.intent, Some(Intent::ProactiveModel));
    let answer = outcome.state.answer.unwrap();
    assert!(answer.contains("menor prioridad"), "{answer}");
    assert!(!answer.contains("precautoria"));
}

#[test]
fn broken_proactive_contract_is_fatal() {
    let pipeline = Pipeline::from_source(Arc::new(broken_proactive_source())).unwrap();
    let err = pipeline.ask("cuáles son los riesgos principales").unwrap_err();
    assert!(err.is_fatal());
    assert!(err.is_contract_violation());
    assert!(err.to_string().contains("rank_proactivo"));
}

#[test]
fn broken_proactive_contract_does_not_affect_greetings() {
    let pipeline = Pipeline::from_source(Arc::new(broken_proactive_source())).unwrap();
    assert!(pipeline.ask("hola").is_ok());
}

#[test]
fn preset_intent_is_honoured() {
    let out = pipeline()
        .invoke(json!({ "user_query": "explícame esto", "intent": "bowtie" }))
        .unwrap();
    assert_eq!(out["intent"], "bowtie");
    assert!(out["answer"].as_str().unwrap().contains("Controles Preventivos"));
    assert!(out["reasoning"][0].as_str().unwrap().contains("provisto"));
}

#[test]
fn unknown_preset_intent_is_rejected() {
    let out = pipeline()
        .invoke(json!({ "user_query": "x", "intent": "weather" }))
        .unwrap();
    assert_eq!(out["intent"], "out_of_domain");
    assert_eq!(out["demo_mode"], true);
    assert_eq!(out["answer"], fallback::ANSWER);
}

#[test]
fn reads_datasets_from_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_scenario_dir(dir.path());
    let config = PipelineConfig::new()
        .with_data_dir(dir.path())
        .with_generator(GeneratorConfig::disabled());

    let pipeline = Pipeline::new(&config).unwrap();
    let outcome = pipeline.ask("resumen de la faena").unwrap();
    let summary = outcome.state.analysis.unwrap().risk_summary.unwrap();
    assert_eq!(summary.dominant_risk.as_deref(), Some("R02"));
}

#[test]
fn every_visited_node_leaves_a_reasoning_entry() {
    let pipeline = with_generator(Arc::new(RecordingGenerator::new("¡Hola!")));
    for query in [
        "hola",
        "resumen de la faena",
        "¿qué pasaría si el modelo proactivo se equivoca?",
        "explica el modelo proactivo frente al ranking",
        "¿cuál es la capital de chile?",
        "bowtie",
    ] {
        let outcome = pipeline.ask(query).unwrap();
        assert!(
            outcome.state.reasoning().len() >= outcome.trace.visited().len(),
            "{query}: {} entries for {:?}",
            outcome.state.reasoning().len(),
            outcome.trace.visited()
        );
    }
}

#[test]
fn sessions_record_final_states() {
    let pipeline = pipeline();
    pipeline.ask_in_session("turno-a", "bowtie").unwrap();
    pipeline.ask_in_session("turno-a", "resumen de la faena").unwrap();
    pipeline.ask_in_session("turno-b", "hola").unwrap();

    let history = pipeline.sessions().history("turno-a");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].state["intent"], "bowtie");
    assert_eq!(history[1].state["analysis"]["risk_summary"]["dominant_risk"], "R02");
    assert_eq!(pipeline.sessions().history("turno-b").len(), 1);
}
