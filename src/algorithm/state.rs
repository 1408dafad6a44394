//! Analizador de estado académico.
//!
//! Deriva último ciclo completo, ciclo de matrícula, regularidad, porcentaje de
//! avance y ciclos estimados para egresar. Se recalcula en cada petición.

use crate::catalog::Catalog;
use crate::error::{RecommendError, RecommendResult};
use crate::models::{AcademicState, ApprovedSet, Course};

/// Carga promedio asumida para estimar ciclos restantes.
pub const AVERAGE_COURSES_PER_CYCLE: usize = 6;

/// Mayor ciclo C tal que todos los cursos con ciclo <= C están aprobados.
/// La completitud debe ser contigua desde el ciclo 1: se corta en el primer
/// ciclo vacío o con algún curso sin aprobar.
pub fn last_completed_cycle(catalog: &Catalog, approved: &ApprovedSet) -> u32 {
    let mut last = 0;
    for cycle in 1..=catalog.max_cycle() {
        let courses = catalog.courses_in_cycle(cycle);
        if courses.is_empty() || courses.iter().any(|c| !approved.contains(&c.code)) {
            break;
        }
        last = cycle;
    }
    last
}

pub fn target_cycle(catalog: &Catalog, approved: &ApprovedSet) -> u32 {
    last_completed_cycle(catalog, approved) + 1
}

/// Cursos de la malla sin aprobar, en orden de catálogo.
pub fn pending_courses<'a>(catalog: &'a Catalog, approved: &ApprovedSet) -> Vec<&'a Course> {
    catalog.courses().iter().filter(|c| !approved.contains(&c.code)).collect()
}

/// Obligatorios: pendientes del ciclo de matrícula.
pub fn mandatory_courses<'a>(catalog: &'a Catalog, approved: &ApprovedSet, target: u32) -> Vec<&'a Course> {
    catalog
        .courses_in_cycle(target)
        .into_iter()
        .filter(|c| !approved.contains(&c.code))
        .collect()
}

/// Regular = sin obligatorios adeudados.
///
/// Un obligatorio del ciclo de matrícula se considera adeudado sólo si el
/// estudiante ya avanzó sobre esa frontera, es decir, tiene aprobado algún curso
/// de ciclo >= ciclo de matrícula. Quien terminó el ciclo N y aún no empieza el
/// N+1 es regular.
pub fn is_regular(catalog: &Catalog, approved: &ApprovedSet) -> bool {
    let target = target_cycle(catalog, approved);
    if mandatory_courses(catalog, approved, target).is_empty() {
        return true;
    }
    !catalog
        .courses()
        .iter()
        .any(|c| c.cycle >= target && approved.contains(&c.code))
}

pub fn approved_in_catalog(catalog: &Catalog, approved: &ApprovedSet) -> usize {
    catalog.courses().iter().filter(|c| approved.contains(&c.code)).count()
}

/// floor(100 * |aprobados ∩ malla| / |malla|).
pub fn percent_complete(catalog: &Catalog, approved: &ApprovedSet) -> RecommendResult<u32> {
    if catalog.is_empty() {
        return Err(RecommendError::EmptyCatalog);
    }
    let done = approved_in_catalog(catalog, approved);
    Ok((100 * done / catalog.len()) as u32)
}

/// ceil(pendientes / 6); 0 cuando no queda nada.
pub fn estimated_cycles_remaining(catalog: &Catalog, approved: &ApprovedSet) -> u32 {
    let pending = catalog.len() - approved_in_catalog(catalog, approved);
    pending.div_ceil(AVERAGE_COURSES_PER_CYCLE) as u32
}

pub fn analyze(catalog: &Catalog, approved: &ApprovedSet) -> RecommendResult<AcademicState> {
    let percent = percent_complete(catalog, approved)?;
    let last = last_completed_cycle(catalog, approved);
    Ok(AcademicState {
        last_completed_cycle: last,
        target_cycle: last + 1,
        is_regular: is_regular(catalog, approved),
        percent_complete: percent,
        estimated_cycles_remaining: estimated_cycles_remaining(catalog, approved),
    })
}
