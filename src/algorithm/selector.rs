//! Selector de estrategia.
//!
//! Política determinista: override explícito > auditoría (reglas) > historial
//! suficiente (asociación) > puntaje CP vs backtracking sobre los rasgos del
//! estado académico. Los umbrales y pesos vienen de `SelectorThresholds`.
//! Siempre normaliza la salida al `RecommendationResult` común.

use serde::Serialize;
use tracing::{info, warn};

use super::association::{self, CooccurrenceStats};
use super::priority::{priority_score, priority_tier};
use super::state::{analyze, approved_in_catalog, pending_courses};
use super::validation::validate_approved;
use super::{backtracking, constraint, rules, RecommendOptions, Selection};
use crate::catalog::Catalog;
use crate::config::SelectorThresholds;
use crate::error::{RecommendError, RecommendResult};
use crate::models::{AcademicState, ApprovedSet, RationaleEntry, RecommendationResult, Strategy};

/// Rasgos del estado académico que usa la política.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateFeatures {
    pub pending_courses: usize,
    pub prerequisite_density: f64,
    pub percent_complete: u32,
    pub target_cycle: u32,
    pub is_regular: bool,
    /// `latest_revision - revision` cuando ambos se conocen.
    pub revision_age: Option<u32>,
    pub approved_count: usize,
    pub history_pairs: usize,
}

impl StateFeatures {
    pub fn collect(
        catalog: &Catalog,
        approved: &ApprovedSet,
        state: &AcademicState,
        history: Option<&CooccurrenceStats>,
        latest_revision: Option<u32>,
    ) -> Self {
        let revision_age = match (latest_revision, catalog.revision()) {
            (Some(latest), Some(rev)) => Some(latest.saturating_sub(rev)),
            _ => None,
        };
        StateFeatures {
            pending_courses: pending_courses(catalog, approved).len(),
            prerequisite_density: catalog.prerequisite_density(),
            percent_complete: state.percent_complete,
            target_cycle: state.target_cycle,
            is_regular: state.is_regular,
            revision_age,
            approved_count: approved_in_catalog(catalog, approved),
            history_pairs: history.map(|h| h.pair_count()).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyDecision {
    pub strategy: Strategy,
    pub reason: String,
    pub cp_score: i32,
    pub backtracking_score: i32,
}

pub fn choose_strategy(
    features: &StateFeatures,
    requested: Strategy,
    audit: bool,
    t: &SelectorThresholds,
) -> StrategyDecision {
    let decided = |strategy: Strategy, reason: String| StrategyDecision {
        strategy,
        reason,
        cp_score: 0,
        backtracking_score: 0,
    };

    if requested != Strategy::Auto {
        return decided(requested, format!("estrategia solicitada explícitamente: {}", requested));
    }
    if audit {
        return decided(
            Strategy::RuleInference,
            "se pidió una derivación auditable".to_string(),
        );
    }
    if features.history_pairs > 0 && features.history_pairs >= t.min_history_pairs && features.approved_count > 0 {
        return decided(
            Strategy::Association,
            format!(
                "historial suficiente ({} pares >= {}) y {} cursos aprobados",
                features.history_pairs, t.min_history_pairs, features.approved_count
            ),
        );
    }

    let mut cp = 0;
    let mut bt = 0;
    let mut factors: Vec<String> = Vec::new();

    if !features.is_regular {
        bt += t.weight_irregular;
        factors.push(format!("irregular (+{} backtracking)", t.weight_irregular));
    } else {
        bt += t.weight_regular;
        factors.push(format!("regular (+{} backtracking)", t.weight_regular));
    }
    if features.pending_courses > t.many_pending {
        cp += t.weight_many_pending;
        factors.push(format!("{} pendientes (+{} CP)", features.pending_courses, t.weight_many_pending));
    } else if features.pending_courses < t.few_pending {
        bt += t.weight_few_pending;
        factors.push(format!("{} pendientes (+{} backtracking)", features.pending_courses, t.weight_few_pending));
    }
    if features.percent_complete > t.high_percent {
        bt += t.weight_high_percent;
        factors.push(format!("avance {}% (+{} backtracking)", features.percent_complete, t.weight_high_percent));
    } else if features.percent_complete < t.low_percent {
        cp += t.weight_low_percent;
        factors.push(format!("avance {}% (+{} CP)", features.percent_complete, t.weight_low_percent));
    }
    if features.target_cycle >= t.late_cycle {
        bt += t.weight_late_cycle;
        factors.push(format!("ciclo {} (+{} backtracking)", features.target_cycle, t.weight_late_cycle));
    } else if features.target_cycle <= t.early_cycle {
        cp += t.weight_early_cycle;
        factors.push(format!("ciclo {} (+{} CP)", features.target_cycle, t.weight_early_cycle));
    }
    if features.prerequisite_density > t.dense_prerequisites {
        cp += t.weight_dense;
        factors.push(format!(
            "densidad de prerrequisitos {:.2} (+{} CP)",
            features.prerequisite_density, t.weight_dense
        ));
    }
    if let Some(age) = features.revision_age {
        if age >= t.old_revision_age {
            cp += t.weight_old_revision;
            factors.push(format!("malla con {} revisiones de antigüedad (+{} CP)", age, t.weight_old_revision));
        }
    }

    // empate -> backtracking
    let strategy = if cp > bt {
        Strategy::ConstraintProgramming
    } else {
        Strategy::Backtracking
    };
    let detail = if factors.is_empty() {
        "sin rasgos relevantes".to_string()
    } else {
        factors.join("; ")
    };
    StrategyDecision {
        strategy,
        reason: format!("puntaje CP {} vs backtracking {}: {}", cp, bt, detail),
        cp_score: cp,
        backtracking_score: bt,
    }
}

/// Ejecuta una estrategia concreta, sin respaldo. `Auto` se trata como backtracking.
pub fn run_strategy(
    strategy: Strategy,
    catalog: &Catalog,
    approved: &ApprovedSet,
    state: &AcademicState,
    history: Option<&CooccurrenceStats>,
    max_courses: Option<usize>,
) -> RecommendResult<Selection> {
    match strategy {
        Strategy::ConstraintProgramming => constraint::recommend(catalog, approved, state, max_courses),
        Strategy::RuleInference => rules::recommend(catalog, approved, state, max_courses),
        Strategy::Association => {
            let empty = CooccurrenceStats::new();
            association::recommend(catalog, approved, state, history.unwrap_or(&empty), max_courses)
        }
        Strategy::Backtracking | Strategy::Auto => backtracking::recommend(catalog, approved, state, max_courses),
    }
}

/// Convierte la selección cruda al resultado común, en el mismo orden.
pub fn normalize(
    catalog: &Catalog,
    selection: &Selection,
    strategy: Strategy,
    state: AcademicState,
    selection_reason: String,
    fallback_from: Option<Strategy>,
) -> RecommendationResult {
    let rationale: Vec<RationaleEntry> = selection
        .picks
        .iter()
        .filter_map(|p| {
            let course = catalog.course(&p.code)?;
            Some(RationaleEntry {
                course_code: p.code.clone(),
                reason_tag: p.tag,
                priority_score: priority_score(catalog, course),
                priority_tier: priority_tier(course, p.tag.is_mandatory()),
            })
        })
        .collect();

    RecommendationResult {
        recommended_course_codes: rationale.iter().map(|r| r.course_code.clone()).collect(),
        total_credits: selection.total_credits(catalog),
        strategy_used: strategy,
        academic_state: state,
        rationale,
        selection_reason,
        fallback_from,
        derivation: selection.derivation.clone(),
    }
}

/// Punto de entrada del núcleo: estado -> estrategia -> resultado normalizado.
pub fn recommend(
    catalog: &Catalog,
    approved: &ApprovedSet,
    history: Option<&CooccurrenceStats>,
    options: &RecommendOptions,
) -> RecommendResult<RecommendationResult> {
    validate_approved(catalog, approved).log_warnings();

    let state = analyze(catalog, approved)?;
    let features = StateFeatures::collect(catalog, approved, &state, history, options.latest_revision);
    let decision = choose_strategy(&features, options.strategy, options.audit, &options.thresholds);
    info!("🎯 estrategia {}: {}", decision.strategy, decision.reason);

    let outcome = run_strategy(decision.strategy, catalog, approved, &state, history, options.max_courses);
    let (selection, used, reason, fallback_from) = match outcome {
        Ok(sel) => (sel, decision.strategy, decision.reason, None),
        Err(RecommendError::InfeasibleModel { cheapest_credits, limit })
            if decision.strategy == Strategy::ConstraintProgramming =>
        {
            warn!(
                "⚠️ modelo CP infactible (curso más barato {} cr, límite {}); se usa backtracking",
                cheapest_credits, limit
            );
            let sel = backtracking::recommend(catalog, approved, &state, options.max_courses)?;
            let reason = format!(
                "{}; modelo CP infactible (curso más barato {} cr > límite {}), respaldo backtracking",
                decision.reason, cheapest_credits, limit
            );
            (sel, Strategy::Backtracking, reason, Some(Strategy::ConstraintProgramming))
        }
        Err(e) => return Err(e),
    };

    let result = normalize(catalog, &selection, used, state, reason, fallback_from);
    info!(
        "✅ {} cursos recomendados ({} créditos) con {}",
        result.recommended_course_codes.len(),
        result.total_credits,
        result.strategy_used
    );
    Ok(result)
}
