//! Solver de satisfacción de restricciones (modelo CP reducido).
//!
//! Universo: cursos no aprobados de los ciclos [objetivo, objetivo + 2].
//! Una variable booleana por curso del universo, con:
//! - suma de créditos <= límite del ciclo objetivo
//! - x(c) = 1 sólo si cada prerrequisito de c está aprobado o también vale 1
//!   (si un prerrequisito queda fuera del universo y no está aprobado, x(c) = 0)
//! - a lo más `max_courses` variables en 1
//!
//! Objetivo: maximizar Σ x(c) * (prioridad(c) + BONO si c es obligatorio).
//! Se resuelve con ramificación y acotamiento sobre el orden topológico, probando
//! primero la rama "incluir". Sólo una mejora estricta reemplaza a la mejor
//! solución, así el resultado es determinista.

use tracing::{debug, warn};

use super::priority::{priority_score, MANDATORY_BONUS};
use super::{credit_budget, Selection};
use crate::catalog::Catalog;
use crate::error::{RecommendError, RecommendResult};
use crate::models::{AcademicState, ApprovedSet, ReasonTag};

/// Ciclos por encima del objetivo que entran al universo del modelo.
pub const LOOKAHEAD_CYCLES: u32 = 2;

#[derive(Debug, Clone)]
struct Var {
    code: String,
    credits: u32,
    weight: i64,
    mandatory: bool,
    // índices de variables que deben valer 1 para que esta pueda valer 1
    requires: Vec<usize>,
}

struct Search<'a> {
    vars: &'a [Var],
    // suffix_ratio[i] = max peso/créditos entre vars[i..]
    suffix_ratio: Vec<f64>,
    slots: usize,
    chosen: Vec<bool>,
    best_value: i64,
    best: Vec<bool>,
    nodes: u64,
}

impl<'a> Search<'a> {
    fn new(vars: &'a [Var], slots: usize) -> Self {
        let mut suffix_ratio: Vec<f64> = vec![0.0; vars.len() + 1];
        for i in (0..vars.len()).rev() {
            let r = vars[i].weight as f64 / vars[i].credits as f64;
            suffix_ratio[i] = suffix_ratio[i + 1].max(r);
        }
        Search {
            vars,
            suffix_ratio,
            slots,
            chosen: vec![false; vars.len()],
            best_value: -1,
            best: vec![false; vars.len()],
            nodes: 0,
        }
    }

    // cota optimista de lo que aún se puede sumar desde i con `room` créditos
    fn bound(&self, i: usize, room: u32) -> i64 {
        let fitting: i64 = self.vars[i..]
            .iter()
            .filter(|v| v.credits <= room)
            .map(|v| v.weight)
            .sum();
        let by_ratio = (room as f64 * self.suffix_ratio[i]).floor() as i64 + 1;
        fitting.min(by_ratio)
    }

    fn run(&mut self, i: usize, room: u32, used_slots: usize, value: i64) {
        self.nodes += 1;
        if i == self.vars.len() {
            if value > self.best_value {
                self.best_value = value;
                self.best.clone_from(&self.chosen);
            }
            return;
        }
        if value + self.bound(i, room) <= self.best_value {
            return;
        }

        let vars = self.vars;
        let v = &vars[i];
        let can_take = used_slots < self.slots
            && v.credits <= room
            && v.requires.iter().all(|&j| self.chosen[j]);
        if can_take {
            self.chosen[i] = true;
            self.run(i + 1, room - v.credits, used_slots + 1, value + v.weight);
            self.chosen[i] = false;
        }
        self.run(i + 1, room, used_slots, value);
    }
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
    let target = state.target_cycle;
    let horizon = target + LOOKAHEAD_CYCLES;

    // variables en orden topológico: los prerrequisitos en el universo ya tienen índice
    let mut vars: Vec<Var> = Vec::new();
    for course in catalog.topological_order() {
        if approved.contains(&course.code) || course.cycle < target || course.cycle > horizon {
            continue;
        }
        let mut requires: Vec<usize> = Vec::new();
        let mut blocked = false;
        for p in course.prerequisites.iter() {
            if approved.contains(p) {
                continue;
            }
            match vars.iter().position(|v| &v.code == p) {
                Some(j) => requires.push(j),
                None => {
                    blocked = true;
                    break;
                }
            }
        }
        if blocked {
            continue;
        }
        let mandatory = course.cycle == target;
        let bonus = if mandatory { MANDATORY_BONUS } else { 0 };
        vars.push(Var {
            code: course.code.clone(),
            credits: course.credits,
            weight: priority_score(catalog, course) + bonus,
            mandatory,
            requires,
        });
    }

    if vars.is_empty() {
        debug!("🧩 CP: universo vacío para el ciclo {}", target);
        return Ok(selection);
    }

    // sin ninguna variable raíz que quepa, la única asignación es todo en 0
    let cheapest = vars
        .iter()
        .filter(|v| v.requires.is_empty())
        .map(|v| v.credits)
        .min()
        .unwrap_or(u32::MAX);
    if cheapest > budget {
        warn!("🧩 CP infactible: el curso más barato ({} cr) supera el límite {}", cheapest, budget);
        return Err(RecommendError::InfeasibleModel {
            cheapest_credits: cheapest,
            limit: budget as i32,
        });
    }

    let slots = max_courses.unwrap_or(vars.len()).min(vars.len());
    let mut search = Search::new(&vars, slots);
    search.run(0, budget, 0, 0);
    debug!(
        "🧩 CP: {} variables, {} nodos explorados, objetivo {}",
        vars.len(),
        search.nodes,
        search.best_value
    );

    // obligatorios primero; dentro de cada grupo, orden topológico
    for mandatory_pass in [true, false] {
        for (i, v) in vars.iter().enumerate() {
            if search.best[i] && v.mandatory == mandatory_pass {
                let tag = if mandatory_pass { ReasonTag::SolverMandatory } else { ReasonTag::SolverElective };
                selection.push(&v.code, tag);
            }
        }
    }
    Ok(selection)
}
