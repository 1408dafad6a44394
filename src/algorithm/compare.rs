//! Comparación de estrategias sobre el mismo snapshot (malla + aprobados).
//!
//! Corre las cuatro estrategias sin respaldo: un modelo CP infactible aparece
//! como error en su fila. Útil para calibrar los umbrales del selector.

use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use super::association::CooccurrenceStats;
use super::selector::{choose_strategy, run_strategy, StateFeatures};
use super::state::analyze;
use super::RecommendOptions;
use crate::catalog::Catalog;
use crate::error::RecommendResult;
use crate::models::{AcademicState, ApprovedSet, Strategy};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyRun {
    pub strategy: Strategy,
    pub recommended_course_codes: Vec<String>,
    pub course_count: usize,
    pub total_credits: u32,
    pub within_credit_limit: bool,
    pub elapsed_micros: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyComparison {
    pub academic_state: AcademicState,
    pub credit_limit: i32,
    /// Estrategia que elegiría el selector para esta petición.
    pub selected: Strategy,
    pub selection_reason: String,
    pub runs: Vec<StrategyRun>,
    /// Estrategia exitosa más rápida (empate -> la primera en `Strategy::CONCRETE`).
    pub fastest: Option<Strategy>,
}

pub fn compare_strategies(
    catalog: &Catalog,
    approved: &ApprovedSet,
    history: Option<&CooccurrenceStats>,
    options: &RecommendOptions,
) -> RecommendResult<StrategyComparison> {
    let state = analyze(catalog, approved)?;
    let limit = catalog.credit_limit(state.target_cycle);
    let features = StateFeatures::collect(catalog, approved, &state, history, options.latest_revision);
    let decision = choose_strategy(&features, options.strategy, options.audit, &options.thresholds);

    let mut runs: Vec<StrategyRun> = Vec::with_capacity(Strategy::CONCRETE.len());
    for strategy in Strategy::CONCRETE {
        let start = Instant::now();
        let outcome = run_strategy(strategy, catalog, approved, &state, history, options.max_courses);
        let elapsed_micros = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

        let run = match outcome {
            Ok(sel) => {
                let total = sel.total_credits(catalog);
                StrategyRun {
                    strategy,
                    course_count: sel.picks.len(),
                    recommended_course_codes: sel.codes(),
                    total_credits: total,
                    within_credit_limit: i64::from(total) <= i64::from(limit),
                    elapsed_micros,
                    error: None,
                }
            }
            Err(e) => StrategyRun {
                strategy,
                recommended_course_codes: Vec::new(),
                course_count: 0,
                total_credits: 0,
                within_credit_limit: true,
                elapsed_micros,
                error: Some(e.to_string()),
            },
        };
        debug!("⏱️ {} -> {} cursos en {} µs", strategy, run.course_count, run.elapsed_micros);
        runs.push(run);
    }

    let fastest = runs
        .iter()
        .filter(|r| r.error.is_none())
        .min_by_key(|r| r.elapsed_micros)
        .map(|r| r.strategy);

    Ok(StrategyComparison {
        academic_state: state,
        credit_limit: limit,
        selected: decision.strategy,
        selection_reason: decision.reason,
        runs,
        fastest,
    })
}
