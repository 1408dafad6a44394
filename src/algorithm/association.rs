//! Recomendador por asociación (co-ocurrencia histórica de matrícula).
//!
//! Fase 1 igual que backtracking (obligatorios). Para los electivos disponibles:
//! `puntaje(c) = Σ_{a ∈ aprobados} co(a, c) / frecuencia(c)`. Los cursos sin
//! datos históricos (frecuencia 0) van después, ordenados por prioridad.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use super::backtracking::{fill, mandatory_phase};
use super::priority::rank_by_priority;
use super::{credit_budget, Selection};
use crate::catalog::Catalog;
use crate::error::RecommendResult;
use crate::models::{AcademicState, ApprovedSet, CooccurrenceEntry, Course, ReasonTag};

/// Conteos de co-matrícula por par no ordenado de cursos.
#[derive(Debug, Clone, Default)]
pub struct CooccurrenceStats {
    pairs: HashMap<(String, String), u32>,
    // suma de conteos de pares en que aparece cada curso
    pair_totals: HashMap<String, u32>,
    // veces que el curso fue aprobado/cursado, si la fuente lo trae
    approvals: HashMap<String, u32>,
}

fn key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl CooccurrenceStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: &[CooccurrenceEntry]) -> Self {
        let mut stats = Self::new();
        for e in entries {
            stats.add_pair(&e.first, &e.second, e.count);
        }
        stats
    }

    /// Cuenta pares a partir de listas de cursos tomados juntos (p. ej. un semestre
    /// de un estudiante). Cada curso de la lista suma una aprobación.
    pub fn from_transcripts<T: AsRef<str>>(transcripts: &[Vec<T>]) -> Self {
        let mut stats = Self::new();
        for t in transcripts {
            let mut codes: Vec<&str> = t.iter().map(|c| c.as_ref()).collect();
            codes.sort_unstable();
            codes.dedup();
            for (i, a) in codes.iter().enumerate() {
                *stats.approvals.entry(a.to_string()).or_insert(0) += 1;
                for b in codes.iter().skip(i + 1) {
                    stats.add_pair(a, b, 1);
                }
            }
        }
        stats
    }

    /// Suma `count` al par (a, b). Los pares de un curso consigo mismo se ignoran.
    pub fn add_pair(&mut self, a: &str, b: &str, count: u32) {
        if a == b || count == 0 {
            return;
        }
        *self.pairs.entry(key(a, b)).or_insert(0) += count;
        *self.pair_totals.entry(a.to_string()).or_insert(0) += count;
        *self.pair_totals.entry(b.to_string()).or_insert(0) += count;
    }

    pub fn set_approval_count(&mut self, code: &str, count: u32) {
        self.approvals.insert(code.to_string(), count);
    }

    pub fn cooccurrence(&self, a: &str, b: &str) -> u32 {
        self.pairs.get(&key(a, b)).copied().unwrap_or(0)
    }

    /// Aprobaciones conocidas del curso; sin ese dato, la suma de sus pares.
    pub fn frequency(&self, code: &str) -> u32 {
        match self.approvals.get(code) {
            Some(&n) if n > 0 => n,
            _ => self.pair_totals.get(code).copied().unwrap_or(0),
        }
    }

    /// Pares distintos con conteo > 0.
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `None` si no hay datos del curso.
    pub fn score(&self, approved: &ApprovedSet, code: &str) -> Option<f64> {
        let freq = self.frequency(code);
        if freq == 0 {
            return None;
        }
        let together: u32 = approved.iter().map(|a| self.cooccurrence(a, code)).sum();
        Some(together as f64 / freq as f64)
    }
}

pub fn recommend(
    catalog: &Catalog,
    approved: &ApprovedSet,
    state: &AcademicState,
    history: &CooccurrenceStats,
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
    let slots = max_courses.map(|m| m.saturating_sub(mandatory.len()));
    if slots == Some(0) {
        return Ok(selection);
    }

    let mut scored: Vec<(f64, usize, &Course)> = Vec::new();
    let mut unscored: Vec<&Course> = Vec::new();
    for c in catalog.courses() {
        if approved.contains(&c.code) || !c.prerequisites_met(approved) || selection.contains(&c.code) {
            continue;
        }
        match history.score(approved, &c.code) {
            Some(s) => scored.push((s, catalog.position(&c.code).unwrap_or(usize::MAX), c)),
            None => unscored.push(c),
        }
    }
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal).then(a.1.cmp(&b.1)));
    debug!(
        "🔗 asociación: {} candidatos con historial, {} sin historial",
        scored.len(),
        unscored.len()
    );

    let with_data: Vec<&Course> = scored.iter().map(|(_, _, c)| *c).collect();
    let mut ordered: Vec<&Course> = with_data.clone();
    ordered.extend(rank_by_priority(catalog, unscored));

    for c in fill(&ordered, budget - used, slots) {
        let tag = if with_data.iter().any(|w| w.code == c.code) {
            ReasonTag::CoOccurrence
        } else {
            ReasonTag::PriorityFallback
        };
        selection.push(&c.code, tag);
    }
    Ok(selection)
}
