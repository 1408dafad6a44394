// Puntaje de prioridad compartido por todas las estrategias:
// (MAX_CICLO + 1 - ciclo) * 10 + (cursos que lo tienen como prerrequisito)
// Premia ciclos bajos y cursos que desbloquean más trabajo posterior.

use crate::catalog::Catalog;
use crate::models::Course;

/// Bono del solver CP para obligatorios: debe superar cualquier suma de prioridades de electivos.
pub const MANDATORY_BONUS: i64 = 100_000;

pub fn priority_score(catalog: &Catalog, course: &Course) -> i64 {
    let max_cycle = catalog.max_cycle() as i64;
    (max_cycle + 1 - course.cycle as i64) * 10 + catalog.dependents_count(&course.code) as i64
}

/// Nivel de prioridad para presentación (1: alta, 2: media, 3: baja).
pub fn priority_tier(course: &Course, mandatory: bool) -> u8 {
    if mandatory || course.cycle <= 3 {
        1
    } else if course.cycle <= 6 {
        2
    } else {
        3
    }
}

/// Ordena candidatos por prioridad descendente; empate por orden de catálogo.
pub fn rank_by_priority<'a>(catalog: &Catalog, candidates: Vec<&'a Course>) -> Vec<&'a Course> {
    let mut scored: Vec<(i64, usize, &'a Course)> = candidates
        .into_iter()
        .map(|c| (priority_score(catalog, c), catalog.position(&c.code).unwrap_or(usize::MAX), c))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored.into_iter().map(|(_, _, c)| c).collect()
}
