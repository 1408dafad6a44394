//! Selector por backtracking en dos fases.
//!
//! 1. Obligatorios: pendientes del ciclo de matrícula, en orden de catálogo. Los
//!    prerrequisitos no se revisan aquí; el ciclo de matrícula ya implica que los
//!    ciclos anteriores están completos.
//! 2. Electivos: cursos no aprobados, con prerrequisitos aprobados y no elegidos en
//!    la fase 1, ordenados por prioridad, con el presupuesto y cupos que sobran.
//!
//! Cada fase maximiza la cantidad de cursos con `packer::pack`.

use tracing::debug;

use super::packer::pack;
use super::priority::rank_by_priority;
use super::state::mandatory_courses;
use super::{credit_budget, Selection};
use crate::catalog::Catalog;
use crate::error::RecommendResult;
use crate::models::{AcademicState, ApprovedSet, Course, ReasonTag};

/// Fase de obligatorios compartida con otras estrategias que la reutilizan.
/// Devuelve los cursos elegidos y los créditos usados.
pub(crate) fn mandatory_phase<'a>(
    catalog: &'a Catalog,
    approved: &ApprovedSet,
    target: u32,
    budget: u32,
    max_courses: Option<usize>,
) -> (Vec<&'a Course>, u32) {
    let candidates = mandatory_courses(catalog, approved, target);
    let credits: Vec<u32> = candidates.iter().map(|c| c.credits).collect();
    let chosen: Vec<&Course> = pack(&credits, budget, max_courses)
        .into_iter()
        .map(|i| candidates[i])
        .collect();
    let used = chosen.iter().map(|c| c.credits).sum();
    (chosen, used)
}

/// Empaqueta una lista ya ordenada con el presupuesto restante.
pub(crate) fn fill<'a>(ordered: &[&'a Course], budget: u32, slots: Option<usize>) -> Vec<&'a Course> {
    let credits: Vec<u32> = ordered.iter().map(|c| c.credits).collect();
    pack(&credits, budget, slots).into_iter().map(|i| ordered[i]).collect()
}

pub fn recommend(
    catalog: &Catalog,
    approved: &ApprovedSet,
    state: &AcademicState,
    max_courses: Option<usize>,
) -> RecommendResult<Selection> {
    let mut selection = Selection::default();
    let Some(budget) = credit_budget(catalog, approved, state)? else {
        return Ok(selection);
    };

    let (mandatory, used) = mandatory_phase(catalog, approved, state.target_cycle, budget, max_courses);
    for c in mandatory.iter() {
        selection.push(&c.code, ReasonTag::MandatoryPending);
    }
    debug!(
        "🔁 backtracking fase 1: {} obligatorios ({} créditos de {})",
        mandatory.len(),
        used,
        budget
    );

    let remaining_slots = max_courses.map(|m| m.saturating_sub(mandatory.len()));
    if remaining_slots == Some(0) {
        return Ok(selection);
    }

    let electives: Vec<&Course> = catalog
        .courses()
        .iter()
        .filter(|c| !approved.contains(&c.code))
        .filter(|c| c.prerequisites_met(approved))
        .filter(|c| !selection.contains(&c.code))
        .collect();
    let ranked = rank_by_priority(catalog, electives);
    let extra = fill(&ranked, budget - used, remaining_slots);
    debug!("🔁 backtracking fase 2: {} electivos de {} candidatos", extra.len(), ranked.len());
    for c in extra {
        selection.push(&c.code, ReasonTag::PriorityElective);
    }

    Ok(selection)
}
