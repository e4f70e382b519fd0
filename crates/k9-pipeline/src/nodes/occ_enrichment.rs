//! OCC to risk to critical-control linkage
//!
//! Soft-fails: the high-frequency observation source has no risk or control
//! columns, and a load failure leaves the state without enrichment.

use super::data_engine::OCC;
use super::NodeContext;
use crate::analysis::{EnrichmentSummary, OccEvent, RiskEnrichment, RiskOccEvents};
use crate::error::PipelineError;
use crate::state::PipelineState;
use k9_data::{columns, Table};
use std::collections::BTreeMap;

const LINK_COLUMNS: [&str; 3] = [columns::RISK_ID, columns::IS_CRITICAL_CONTROL, columns::CRITICAL_CONTROL_ID];

/// Link critical-behaviour observations to risks and controls
///
/// # Errors
/// Never fails.
pub fn run(mut state: PipelineState, ctx: &NodeContext) -> Result<PipelineState, PipelineError> {
    let table = match ctx.data().observations_all() {
        Ok(table) => table,
        Err(e) => {
            tracing::warn!("OCC enrichment skipped: {}", e);
            state.note(format!("OCC Enrichment: error cargando observaciones: {e}"));
            return Ok(state);
        }
    };

    if !table.has_column(columns::OBSERVATION_TYPE) {
        tracing::warn!("OCC enrichment skipped: no {} column", columns::OBSERVATION_TYPE);
        state.note("OCC Enrichment: sin columna tipo_observacion, no se enriquece.");
        return Ok(state);
    }

    let missing = table.missing_columns(&LINK_COLUMNS);
    if !missing.is_empty() {
        state.note(format!(
            "OCC Enrichment: columnas {} ausentes, solo se consideran filas con riesgo.",
            missing.join(", ")
        ));
    }

    let enrichment = enrich(&table);
    tracing::debug!(
        "OCC enrichment: {} events over {} risks",
        enrichment.summary.total_occ,
        enrichment.summary.risks_affected.len()
    );
    state.note(format!(
        "OCC Enrichment: {} OCC enriquecidas con riesgo y control crítico ({} con control crítico).",
        enrichment.summary.total_occ, enrichment.summary.occ_with_critical_control
    ));
    state.risk_enrichment = Some(enrichment);
    Ok(state)
}

fn enrich(table: &Table) -> RiskEnrichment {
    let mut by_risk: BTreeMap<String, RiskOccEvents> = BTreeMap::new();
    let mut total_occ = 0;
    let mut occ_with_critical_control = 0;

    let occ_rows = table
        .rows()
        .filter(|r| r.str(columns::OBSERVATION_TYPE).as_deref() == Some(OCC));
    for row in occ_rows {
        let Some(risk) = row.str(columns::RISK_ID) else {
            continue;
        };
        total_occ += 1;

        let is_control_critico = row.bool(columns::IS_CRITICAL_CONTROL).unwrap_or(false);
        let control_critico_id = if is_control_critico {
            row.str(columns::CRITICAL_CONTROL_ID)
        } else {
            None
        };
        if control_critico_id.is_some() {
            occ_with_critical_control += 1;
        }

        by_risk.entry(risk).or_default().occ_events.push(OccEvent {
            week: row.i64(columns::WEEK),
            is_control_critico,
            control_critico_id,
        });
    }

    let risks_affected = by_risk.keys().cloned().collect();
    RiskEnrichment {
        by_risk,
        summary: EnrichmentSummary {
            total_occ,
            occ_with_critical_control,
            risks_affected,
        },
    }
}
