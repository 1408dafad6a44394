//! Motor de inferencia por reglas.
//!
//! Base de hechos + reglas con encadenamiento hacia adelante, evaluadas por
//! estratos: una regla sólo niega hechos de estratos anteriores, así que cada
//! estrato se corre hasta punto fijo y el resultado no depende del orden de
//! evaluación. Cada hecho derivado se guarda una sola vez junto con la regla y
//! las premisas que lo produjeron; `RuleEngine::explain` reconstruye la cadena.
//!
//! Estratos:
//! 1. `pendiente`, `disponible`, `prioridad`
//! 2. `ciclo_completo`
//! 3. `ultimo_ciclo_completo`, `ciclo_objetivo`
//! 4. `obligatorio`
//! 5. `avance`, `regularidad`, `progreso`

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::backtracking::fill;
use super::state::AVERAGE_COURSES_PER_CYCLE;
use super::{credit_budget, Selection};
use crate::catalog::Catalog;
use crate::error::{RecommendError, RecommendResult};
use crate::models::{AcademicState, ApprovedSet, Course, ReasonTag};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Fact {
    // hechos base
    Course { code: String, cycle: u32, credits: u32 },
    Approved(String),
    Prerequisite { course: String, prerequisite: String },

    // derivados
    Pending { code: String, cycle: u32 },
    Available(String),
    Priority { code: String, score: i64 },
    CycleComplete(u32),
    LastCompletedCycle(u32),
    TargetCycle(u32),
    Mandatory(String),
    Advance(String),
    Regular(bool),
    PercentComplete(u32),
    CyclesRemaining(u32),
}

/// Un paso de una derivación: el hecho, la regla que lo produjo y sus premisas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationStep {
    pub fact: Fact,
    pub rule: String,
    pub premises: Vec<Fact>,
}

/// Nombre con que se reportan los hechos base en una explicación.
pub const BASE_FACT: &str = "hecho_base";

#[derive(Debug, Clone)]
struct Derivation {
    rule: &'static str,
    premises: Vec<Fact>,
}

struct Inference {
    fact: Fact,
    premises: Vec<Fact>,
}

#[derive(Debug, Default)]
struct KnowledgeBase {
    // None = hecho base
    facts: BTreeMap<Fact, Option<Derivation>>,
}

impl KnowledgeBase {
    fn contains(&self, fact: &Fact) -> bool {
        self.facts.contains_key(fact)
    }

    fn facts(&self) -> impl Iterator<Item = &Fact> {
        self.facts.keys()
    }

    fn courses(&self) -> Vec<(&str, u32)> {
        self.facts()
            .filter_map(|f| match f {
                Fact::Course { code, cycle, .. } => Some((code.as_str(), *cycle)),
                _ => None,
            })
            .collect()
    }

    fn course_fact(&self, code: &str) -> Option<&Fact> {
        self.facts()
            .find(|f| matches!(f, Fact::Course { code: c, .. } if c == code))
    }

    fn is_approved(&self, code: &str) -> bool {
        self.contains(&Fact::Approved(code.to_string()))
    }

    fn prerequisites_of(&self, code: &str) -> Vec<&str> {
        self.facts()
            .filter_map(|f| match f {
                Fact::Prerequisite { course, prerequisite } if course == code => Some(prerequisite.as_str()),
                _ => None,
            })
            .collect()
    }

    fn target_cycle(&self) -> Option<u32> {
        self.facts().find_map(|f| match f {
            Fact::TargetCycle(t) => Some(*t),
            _ => None,
        })
    }
}

trait Rule {
    fn name(&self) -> &'static str;
    fn fire(&self, kb: &KnowledgeBase) -> Vec<Inference>;
}

/// pendiente(c) <- curso(c) ∧ ¬aprobado(c)
struct PendingRule;

impl Rule for PendingRule {
    fn name(&self) -> &'static str {
        "pendiente"
    }

    fn fire(&self, kb: &KnowledgeBase) -> Vec<Inference> {
        kb.courses()
            .into_iter()
            .filter(|(code, _)| !kb.is_approved(code))
            .filter_map(|(code, cycle)| {
                let premise = kb.course_fact(code)?.clone();
                Some(Inference {
                    fact: Fact::Pending { code: code.to_string(), cycle },
                    premises: vec![premise],
                })
            })
            .collect()
    }
}

/// disponible(c) <- curso(c) ∧ ¬aprobado(c) ∧ ∀p prerrequisito(c, p): aprobado(p)
struct AvailableRule;

impl Rule for AvailableRule {
    fn name(&self) -> &'static str {
        "disponible"
    }

    fn fire(&self, kb: &KnowledgeBase) -> Vec<Inference> {
        let mut out = Vec::new();
        for (code, _) in kb.courses() {
            if kb.is_approved(code) {
                continue;
            }
            let prereqs = kb.prerequisites_of(code);
            if !prereqs.iter().all(|p| kb.is_approved(p)) {
                continue;
            }
            let mut premises: Vec<Fact> = kb.course_fact(code).cloned().into_iter().collect();
            premises.extend(prereqs.iter().map(|p| Fact::Approved(p.to_string())));
            out.push(Inference { fact: Fact::Available(code.to_string()), premises });
        }
        out
    }
}

/// prioridad(c, (MAX + 1 - ciclo) * 10 + dependientes)
struct PriorityRule;

impl Rule for PriorityRule {
    fn name(&self) -> &'static str {
        "prioridad"
    }

    fn fire(&self, kb: &KnowledgeBase) -> Vec<Inference> {
        let courses = kb.courses();
        let max_cycle = courses.iter().map(|(_, c)| *c).max().unwrap_or(0) as i64;
        let mut out = Vec::new();
        for (code, cycle) in courses {
            let dependents: Vec<Fact> = kb
                .facts()
                .filter(|f| matches!(f, Fact::Prerequisite { prerequisite, .. } if prerequisite == code))
                .cloned()
                .collect();
            let score = (max_cycle + 1 - cycle as i64) * 10 + dependents.len() as i64;
            let mut premises: Vec<Fact> = kb.course_fact(code).cloned().into_iter().collect();
            premises.extend(dependents);
            out.push(Inference {
                fact: Fact::Priority { code: code.to_string(), score },
                premises,
            });
        }
        out
    }
}

/// ciclo_completo(n) <- ∃ curso de ciclo n ∧ ¬∃ pendiente de ciclo n
struct CycleCompleteRule;

impl Rule for CycleCompleteRule {
    fn name(&self) -> &'static str {
        "ciclo_completo"
    }

    fn fire(&self, kb: &KnowledgeBase) -> Vec<Inference> {
        let cycles: BTreeSet<u32> = kb.courses().iter().map(|(_, c)| *c).collect();
        let mut out = Vec::new();
        for n in cycles {
            let pending = kb
                .facts()
                .any(|f| matches!(f, Fact::Pending { cycle, .. } if *cycle == n));
            if pending {
                continue;
            }
            let premises: Vec<Fact> = kb
                .courses()
                .into_iter()
                .filter(|(_, c)| *c == n)
                .map(|(code, _)| Fact::Approved(code.to_string()))
                .collect();
            out.push(Inference { fact: Fact::CycleComplete(n), premises });
        }
        out
    }
}

/// ultimo_ciclo_completo(k): mayor k con ciclo_completo(1..=k), contiguo desde 1
struct LastCompletedRule;

impl Rule for LastCompletedRule {
    fn name(&self) -> &'static str {
        "ultimo_ciclo_completo"
    }

    fn fire(&self, kb: &KnowledgeBase) -> Vec<Inference> {
        let mut k = 0;
        let mut premises = Vec::new();
        while kb.contains(&Fact::CycleComplete(k + 1)) {
            k += 1;
            premises.push(Fact::CycleComplete(k));
        }
        vec![Inference { fact: Fact::LastCompletedCycle(k), premises }]
    }
}

/// ciclo_objetivo(k + 1) <- ultimo_ciclo_completo(k)
struct TargetCycleRule;

impl Rule for TargetCycleRule {
    fn name(&self) -> &'static str {
        "ciclo_objetivo"
    }

    fn fire(&self, kb: &KnowledgeBase) -> Vec<Inference> {
        kb.facts()
            .filter_map(|f| match f {
                Fact::LastCompletedCycle(k) => Some(Inference {
                    fact: Fact::TargetCycle(k + 1),
                    premises: vec![f.clone()],
                }),
                _ => None,
            })
            .collect()
    }
}

/// obligatorio(c) <- ciclo_objetivo(t) ∧ pendiente(c, t)
struct MandatoryRule;

impl Rule for MandatoryRule {
    fn name(&self) -> &'static str {
        "obligatorio"
    }

    fn fire(&self, kb: &KnowledgeBase) -> Vec<Inference> {
        let Some(t) = kb.target_cycle() else {
            return Vec::new();
        };
        kb.facts()
            .filter_map(|f| match f {
                Fact::Pending { code, cycle } if *cycle == t => Some(Inference {
                    fact: Fact::Mandatory(code.clone()),
                    premises: vec![Fact::TargetCycle(t), f.clone()],
                }),
                _ => None,
            })
            .collect()
    }
}

/// avance(c) <- disponible(c) ∧ ¬obligatorio(c)
struct AdvanceRule;

impl Rule for AdvanceRule {
    fn name(&self) -> &'static str {
        "avance"
    }

    fn fire(&self, kb: &KnowledgeBase) -> Vec<Inference> {
        kb.facts()
            .filter_map(|f| match f {
                Fact::Available(code) if !kb.contains(&Fact::Mandatory(code.clone())) => Some(Inference {
                    fact: Fact::Advance(code.clone()),
                    premises: vec![f.clone()],
                }),
                _ => None,
            })
            .collect()
    }
}

/// regular(false) <- obligatorio(m) ∧ aprobado(c) ∧ ciclo(c) >= objetivo
/// regular(true)  en otro caso
struct RegularityRule;

impl Rule for RegularityRule {
    fn name(&self) -> &'static str {
        "regularidad"
    }

    fn fire(&self, kb: &KnowledgeBase) -> Vec<Inference> {
        let Some(t) = kb.target_cycle() else {
            return Vec::new();
        };
        let owed = kb.facts().find(|f| matches!(f, Fact::Mandatory(_))).cloned();
        let ahead = kb
            .courses()
            .into_iter()
            .find(|(code, cycle)| *cycle >= t && kb.is_approved(code))
            .map(|(code, _)| code);

        let inference = match (owed, ahead) {
            (Some(m), Some(code)) => Inference {
                fact: Fact::Regular(false),
                premises: vec![Fact::TargetCycle(t), m, Fact::Approved(code.to_string())],
            },
            _ => Inference {
                fact: Fact::Regular(true),
                premises: vec![Fact::TargetCycle(t)],
            },
        };
        vec![inference]
    }
}

/// porcentaje_avance y ciclos_para_egresar
struct ProgressRule;

impl Rule for ProgressRule {
    fn name(&self) -> &'static str {
        "progreso"
    }

    fn fire(&self, kb: &KnowledgeBase) -> Vec<Inference> {
        let courses = kb.courses();
        if courses.is_empty() {
            return Vec::new();
        }
        let done: Vec<Fact> = courses
            .iter()
            .filter(|(code, _)| kb.is_approved(code))
            .map(|(code, _)| Fact::Approved(code.to_string()))
            .collect();
        let pending = courses.len() - done.len();
        let percent = (100 * done.len() / courses.len()) as u32;
        vec![
            Inference { fact: Fact::PercentComplete(percent), premises: done },
            Inference {
                fact: Fact::CyclesRemaining(pending.div_ceil(AVERAGE_COURSES_PER_CYCLE) as u32),
                premises: vec![],
            },
        ]
    }
}

fn strata() -> Vec<Vec<Box<dyn Rule>>> {
    vec![
        vec![Box::new(PendingRule), Box::new(AvailableRule), Box::new(PriorityRule)],
        vec![Box::new(CycleCompleteRule)],
        vec![Box::new(LastCompletedRule), Box::new(TargetCycleRule)],
        vec![Box::new(MandatoryRule)],
        vec![Box::new(AdvanceRule), Box::new(RegularityRule), Box::new(ProgressRule)],
    ]
}

/// Base de conocimiento ya saturada para una malla y un conjunto de aprobados.
#[derive(Debug)]
pub struct RuleEngine {
    kb: KnowledgeBase,
    derived: usize,
}

impl RuleEngine {
    pub fn evaluate(catalog: &Catalog, approved: &ApprovedSet) -> RuleEngine {
        let mut kb = KnowledgeBase::default();
        for c in catalog.courses() {
            kb.facts.insert(
                Fact::Course { code: c.code.clone(), cycle: c.cycle, credits: c.credits },
                None,
            );
            for p in c.prerequisites.iter() {
                kb.facts.insert(
                    Fact::Prerequisite { course: c.code.clone(), prerequisite: p.clone() },
                    None,
                );
            }
        }
        for code in approved.iter() {
            kb.facts.insert(Fact::Approved(code.clone()), None);
        }

        let mut derived = 0;
        for (level, stratum) in strata().iter().enumerate() {
            loop {
                let mut fresh: Vec<(Fact, Derivation)> = Vec::new();
                for rule in stratum.iter() {
                    for inf in rule.fire(&kb) {
                        if kb.contains(&inf.fact) || fresh.iter().any(|(f, _)| f == &inf.fact) {
                            continue;
                        }
                        fresh.push((inf.fact, Derivation { rule: rule.name(), premises: inf.premises }));
                    }
                }
                if fresh.is_empty() {
                    break;
                }
                derived += fresh.len();
                for (fact, d) in fresh {
                    kb.facts.insert(fact, Some(d));
                }
            }
            debug!("🧠 estrato {} saturado ({} hechos derivados acumulados)", level + 1, derived);
        }

        RuleEngine { kb, derived }
    }

    pub fn holds(&self, fact: &Fact) -> bool {
        self.kb.contains(fact)
    }

    /// Cantidad de hechos derivados (sin contar los hechos base).
    pub fn derived_count(&self) -> usize {
        self.derived
    }

    pub fn last_completed_cycle(&self) -> u32 {
        self.kb
            .facts()
            .find_map(|f| match f {
                Fact::LastCompletedCycle(k) => Some(*k),
                _ => None,
            })
            .unwrap_or(0)
    }

    pub fn target_cycle(&self) -> u32 {
        self.kb.target_cycle().unwrap_or(1)
    }

    pub fn is_regular(&self) -> bool {
        !self.kb.contains(&Fact::Regular(false))
    }

    pub fn priority(&self, code: &str) -> Option<i64> {
        self.kb.facts().find_map(|f| match f {
            Fact::Priority { code: c, score } if c == code => Some(*score),
            _ => None,
        })
    }

    pub fn mandatory(&self) -> Vec<String> {
        self.codes_where(|f| match f {
            Fact::Mandatory(c) => Some(c),
            _ => None,
        })
    }

    pub fn advance(&self) -> Vec<String> {
        self.codes_where(|f| match f {
            Fact::Advance(c) => Some(c),
            _ => None,
        })
    }

    fn codes_where<'a>(&'a self, pick: impl Fn(&'a Fact) -> Option<&'a String>) -> Vec<String> {
        self.kb.facts().filter_map(pick).cloned().collect()
    }

    /// Estado académico derivado por las reglas. Debe coincidir con `state::analyze`.
    pub fn academic_state(&self) -> RecommendResult<AcademicState> {
        let percent = self
            .kb
            .facts()
            .find_map(|f| match f {
                Fact::PercentComplete(p) => Some(*p),
                _ => None,
            })
            .ok_or(RecommendError::EmptyCatalog)?;
        let remaining = self
            .kb
            .facts()
            .find_map(|f| match f {
                Fact::CyclesRemaining(n) => Some(*n),
                _ => None,
            })
            .unwrap_or(0);
        Ok(AcademicState {
            last_completed_cycle: self.last_completed_cycle(),
            target_cycle: self.target_cycle(),
            is_regular: self.is_regular(),
            percent_complete: percent,
            estimated_cycles_remaining: remaining,
        })
    }

    /// Cadena de derivación del hecho, premisas antes que conclusiones.
    /// Vacía si el hecho no está en la base.
    pub fn explain(&self, fact: &Fact) -> Vec<DerivationStep> {
        self.explain_all(std::slice::from_ref(fact))
    }

    /// Como `explain`, pero para varios hechos en una sola cadena: las
    /// premisas compartidas aparecen una vez y cada conclusión va después de
    /// todo lo que la sostiene.
    pub fn explain_all(&self, facts: &[Fact]) -> Vec<DerivationStep> {
        let mut steps = Vec::new();
        let mut seen: BTreeSet<Fact> = BTreeSet::new();
        for fact in facts {
            self.collect_steps(fact, &mut seen, &mut steps);
        }
        steps
    }

    fn collect_steps(&self, fact: &Fact, seen: &mut BTreeSet<Fact>, steps: &mut Vec<DerivationStep>) {
        if !seen.insert(fact.clone()) {
            return;
        }
        let Some(entry) = self.kb.facts.get(fact) else {
            return;
        };
        match entry {
            None => steps.push(DerivationStep {
                fact: fact.clone(),
                rule: BASE_FACT.to_string(),
                premises: vec![],
            }),
            Some(d) => {
                for p in d.premises.iter() {
                    self.collect_steps(p, seen, steps);
                }
                steps.push(DerivationStep {
                    fact: fact.clone(),
                    rule: d.rule.to_string(),
                    premises: d.premises.clone(),
                });
            }
        }
    }
}

fn by_position(catalog: &Catalog, codes: Vec<String>) -> Vec<&Course> {
    let mut courses: Vec<&Course> = codes.iter().filter_map(|c| catalog.course(c)).collect();
    courses.sort_by_key(|c| catalog.position(&c.code));
    courses
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
    let engine = RuleEngine::evaluate(catalog, approved);

    let mandatory = fill(&by_position(catalog, engine.mandatory()), budget, max_courses);
    let used: u32 = mandatory.iter().map(|c| c.credits).sum();
    for c in mandatory.iter() {
        selection.push(&c.code, ReasonTag::RuleMandatory);
    }

    let slots = max_courses.map(|m| m.saturating_sub(mandatory.len()));
    if slots != Some(0) {
        let mut advance = by_position(catalog, engine.advance());
        // estable: a igual prioridad se conserva el orden de catálogo
        advance.sort_by_key(|c| std::cmp::Reverse(engine.priority(&c.code).unwrap_or(0)));
        for c in fill(&advance, budget - used, slots) {
            selection.push(&c.code, ReasonTag::RuleAdvance);
        }
    }

    let conclusions: Vec<Fact> = selection
        .picks
        .iter()
        .map(|p| match p.tag {
            ReasonTag::RuleMandatory => Fact::Mandatory(p.code.clone()),
            _ => Fact::Advance(p.code.clone()),
        })
        .collect();
    selection.derivation = Some(engine.explain_all(&conclusions));

    debug!(
        "🧠 reglas: {} hechos derivados, {} cursos recomendados",
        engine.derived_count(),
        selection.picks.len()
    );
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::state::analyze;
    use crate::models::RawCourse;

    fn approved(codes: &[&str]) -> ApprovedSet {
        codes.iter().map(|c| c.to_string()).collect()
    }

    fn malla() -> Catalog {
        Catalog::from_courses(
            vec![
                RawCourse::new("A", "a", 1, 4, &[]),
                RawCourse::new("B", "b", 1, 3, &[]),
                RawCourse::new("C", "c", 2, 4, &["A", "B"]),
                RawCourse::new("D", "d", 2, 3, &[]),
                RawCourse::new("E", "e", 3, 3, &["C"]),
            ],
            &[(2, 10)],
        )
        .unwrap()
    }

    #[test]
    fn derives_state_facts() {
        let cat = malla();
        let engine = RuleEngine::evaluate(&cat, &approved(&["A", "B"]));
        assert!(engine.holds(&Fact::CycleComplete(1)));
        assert!(!engine.holds(&Fact::CycleComplete(2)));
        assert_eq!(engine.last_completed_cycle(), 1);
        assert_eq!(engine.target_cycle(), 2);
        assert!(engine.is_regular());
        assert_eq!(engine.mandatory(), vec!["C".to_string(), "D".to_string()]);
        assert!(engine.advance().is_empty());
        assert_eq!(engine.priority("A"), Some(31));
    }

    #[test]
    fn agrees_with_analyzer() {
        let cat = malla();
        for ap in [
            approved(&[]),
            approved(&["A"]),
            approved(&["A", "B"]),
            approved(&["A", "C"]),
            approved(&["A", "B", "C", "D", "E"]),
        ] {
            let engine = RuleEngine::evaluate(&cat, &ap);
            assert_eq!(engine.academic_state(), analyze(&cat, &ap), "aprobados {:?}", ap);
        }
    }

    #[test]
    fn explain_lists_premises_first() {
        let cat = malla();
        let engine = RuleEngine::evaluate(&cat, &approved(&["A", "B"]));
        let steps = engine.explain(&Fact::Mandatory("C".to_string()));
        let last = steps.last().expect("hay derivación");
        assert_eq!(last.rule, "obligatorio");
        assert!(steps.iter().any(|s| s.rule == "ciclo_objetivo"));
        assert!(steps.iter().any(|s| s.rule == BASE_FACT && s.fact == Fact::Approved("A".to_string())));

        let pos = |rule: &str| steps.iter().position(|s| s.rule == rule).unwrap();
        assert!(pos("ciclo_completo") < pos("ultimo_ciclo_completo"));
        assert!(pos("ultimo_ciclo_completo") < pos("ciclo_objetivo"));

        assert!(engine.explain(&Fact::Mandatory("ZZZ".to_string())).is_empty());
    }

    #[test]
    fn recommends_mandatory_then_advance() {
        let cat = malla();
        let ap = approved(&["A", "B"]);
        let st = analyze(&cat, &ap).unwrap();
        let sel = recommend(&cat, &ap, &st, None).unwrap();
        assert_eq!(sel.codes(), vec!["C", "D"]);
        assert!(sel.picks.iter().all(|p| p.tag == ReasonTag::RuleMandatory));
    }

    #[test]
    fn selection_carries_the_derivation_of_each_pick() {
        let cat = malla();
        let ap = approved(&["A", "B"]);
        let st = analyze(&cat, &ap).unwrap();
        let sel = recommend(&cat, &ap, &st, None).unwrap();
        let steps = sel.derivation.expect("el motor de reglas deja su derivación");

        let conclusion = |code: &str| {
            steps
                .iter()
                .position(|s| s.fact == Fact::Mandatory(code.to_string()))
                .expect("conclusión presente")
        };
        assert!(conclusion("C") < conclusion("D"));
        assert_eq!(steps.last().unwrap().fact, Fact::Mandatory("D".to_string()));
        assert_eq!(steps.last().unwrap().rule, "obligatorio");

        // las premisas compartidas no se repiten
        let targets = steps.iter().filter(|s| matches!(s.fact, Fact::TargetCycle(_))).count();
        assert_eq!(targets, 1);
        assert!(steps.iter().all(|s| !s.rule.is_empty()));
    }

    #[test]
    fn empty_catalog_has_no_state() {
        let cat = Catalog::from_courses(vec![], &[]).unwrap();
        let engine = RuleEngine::evaluate(&cat, &ApprovedSet::new());
        assert_eq!(engine.academic_state(), Err(RecommendError::EmptyCatalog));
    }
}
