// Capa de algoritmos de recomendación.
//
// Flujo: Catalog -> state (estado académico) -> {backtracking | constraint |
// rules | association} -> selector (elige estrategia y normaliza el resultado).
// Ninguna estrategia muta la malla: todas leen el mismo snapshot inmutable.

pub mod association;
pub mod backtracking;
pub mod compare;
pub mod constraint;
pub mod packer;
pub mod priority;
pub mod rules;
pub mod selector;
pub mod state;
pub mod validation;

pub use association::CooccurrenceStats;
pub use compare::{compare_strategies, StrategyComparison, StrategyRun};
pub use rules::{DerivationStep, Fact, RuleEngine};
pub use selector::{choose_strategy, recommend, run_strategy, StateFeatures, StrategyDecision};
pub use state::analyze;
pub use validation::{validate_approved, ApprovedSetReport};

use crate::catalog::Catalog;
use crate::config::SelectorThresholds;
use crate::error::{RecommendError, RecommendResult};
use crate::models::{AcademicState, ApprovedSet, ReasonTag, Strategy};

/// Opciones de una petición de recomendación.
#[derive(Debug, Clone, Default)]
pub struct RecommendOptions {
    pub strategy: Strategy,
    /// Pide una derivación auditable (prefiere el motor de reglas).
    pub audit: bool,
    /// Tope de cursos recomendados; `None` = sin tope.
    pub max_courses: Option<usize>,
    pub thresholds: SelectorThresholds,
    pub latest_revision: Option<u32>,
}

/// Curso elegido por una estrategia, antes de normalizar al resultado común.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pick {
    pub code: String,
    pub tag: ReasonTag,
}

/// Salida cruda de una estrategia, en el orden en que eligió los cursos.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    pub picks: Vec<Pick>,
    /// Sólo la llena el motor de reglas.
    pub derivation: Option<Vec<DerivationStep>>,
}

impl Selection {
    pub fn push(&mut self, code: &str, tag: ReasonTag) {
        self.picks.push(Pick { code: code.to_string(), tag });
    }

    pub fn codes(&self) -> Vec<String> {
        self.picks.iter().map(|p| p.code.clone()).collect()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.picks.iter().any(|p| p.code == code)
    }

    pub fn total_credits(&self, catalog: &Catalog) -> u32 {
        self.picks
            .iter()
            .filter_map(|p| catalog.course(&p.code))
            .map(|c| c.credits)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }
}

/// Presupuesto de créditos del ciclo de matrícula.
///
/// `Ok(None)` cuando no quedan cursos pendientes (egresado): no hay nada que
/// recomendar y no se revisa el límite.
pub(crate) fn credit_budget(
    catalog: &Catalog,
    approved: &ApprovedSet,
    state: &AcademicState,
) -> RecommendResult<Option<u32>> {
    if catalog.courses().iter().all(|c| approved.contains(&c.code)) {
        return Ok(None);
    }
    let limit = catalog.credit_limit(state.target_cycle);
    if limit <= 0 {
        return Err(RecommendError::NoCreditBudget {
            cycle: state.target_cycle,
            limit,
        });
    }
    Ok(Some(limit as u32))
}
