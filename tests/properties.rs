//! Propiedades del recomendador sobre una familia determinista de mallas
//! generadas (sin crates de property testing: semillas fijas y bucles).

use mallaplan::algorithm::priority::priority_score;
use mallaplan::algorithm::state::{analyze, last_completed_cycle};
use mallaplan::algorithm::{CooccurrenceStats, RecommendOptions, RuleEngine};
use mallaplan::logging;
use mallaplan::models::{ApprovedSet, RawCourse, RecommendationResult, Strategy};
use mallaplan::{recommend, Catalog};

/// Generador congruencial: suficiente para fixtures reproducibles.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn range(&mut self, lo: u64, hi: u64) -> u64 {
        lo + self.next() % (hi - lo + 1)
    }
}

fn generated_catalog(seed: u64) -> Catalog {
    let mut rng = Lcg(seed);
    let cycles = rng.range(3, 8) as u32;
    let mut courses: Vec<RawCourse> = Vec::new();
    let mut limits: Vec<(u32, i32)> = Vec::new();
    for cycle in 1..=cycles {
        let earlier = courses.len();
        for k in 0..rng.range(2, 5) {
            let code = format!("C{}{:02}", cycle, k);
            let credits = rng.range(2, 6) as u32;
            let mut prereqs: Vec<String> = Vec::new();
            if earlier > 0 {
                for _ in 0..rng.range(0, 2) {
                    let p = courses[rng.range(0, earlier as u64 - 1) as usize].code.clone();
                    prereqs.push(p);
                }
            }
            courses.push(RawCourse {
                code,
                title: format!("Curso {}-{}", cycle, k),
                cycle,
                credits,
                prerequisites: prereqs,
            });
        }
        limits.push((cycle, rng.range(8, 22) as i32));
    }
    Catalog::from_courses(courses, &limits).expect("las mallas generadas son válidas")
}

/// Aprueba con más probabilidad los ciclos bajos; a veces deja huecos.
fn generated_approved(catalog: &Catalog, seed: u64) -> ApprovedSet {
    let mut rng = Lcg(seed ^ 0x9e37_79b9);
    let frontier = rng.range(0, catalog.max_cycle() as u64) as u32;
    catalog
        .courses()
        .iter()
        .filter(|c| {
            let roll = rng.range(0, 99);
            if c.cycle <= frontier { roll < 90 } else { roll < 10 }
        })
        .map(|c| c.code.clone())
        .collect()
}

fn generated_history(catalog: &Catalog, seed: u64) -> CooccurrenceStats {
    let mut rng = Lcg(seed.wrapping_add(7));
    let n = catalog.len() as u64;
    let mut stats = CooccurrenceStats::new();
    for _ in 0..20 {
        let a = &catalog.courses()[rng.range(0, n - 1) as usize].code;
        let b = &catalog.courses()[rng.range(0, n - 1) as usize].code;
        stats.add_pair(a, b, rng.range(1, 9) as u32);
    }
    stats
}

fn strategies() -> Vec<Strategy> {
    let mut v = vec![Strategy::Auto];
    v.extend(Strategy::CONCRETE);
    v
}

fn check_result(catalog: &Catalog, approved: &ApprovedSet, r: &RecommendationResult, cap: Option<usize>, label: &str) {
    let limit = catalog.credit_limit(r.academic_state.target_cycle);
    assert!(r.total_credits as i64 <= limit as i64, "{}: {} > {}", label, r.total_credits, limit);

    let sum: u32 = r
        .recommended_course_codes
        .iter()
        .map(|c| catalog.course(c).expect("código de la malla").credits)
        .sum();
    assert_eq!(sum, r.total_credits, "{}", label);

    for code in r.recommended_course_codes.iter() {
        assert!(!approved.contains(code), "{}: {} ya estaba aprobado", label, code);
    }

    let mut unique = r.recommended_course_codes.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), r.recommended_course_codes.len(), "{}: duplicados", label);

    if let Some(cap) = cap {
        assert!(r.recommended_course_codes.len() <= cap, "{}", label);
    }

    assert_eq!(r.rationale.len(), r.recommended_course_codes.len());
    for (i, entry) in r.rationale.iter().enumerate() {
        assert_eq!(entry.course_code, r.recommended_course_codes[i]);
        if entry.reason_tag.is_mandatory() {
            continue;
        }
        let course = catalog.course(&entry.course_code).expect("código de la malla");
        for p in course.prerequisites.iter() {
            let before = r.recommended_course_codes[..i].contains(p);
            assert!(
                approved.contains(p) || before,
                "{}: electivo {} sin su prerrequisito {}",
                label,
                course.code,
                p
            );
        }
    }
}

#[test]
fn recommendations_respect_credits_prerequisites_and_approvals() {
    logging::init_test();
    for seed in 0..60u64 {
        let catalog = generated_catalog(seed);
        let approved = generated_approved(&catalog, seed);
        let history = generated_history(&catalog, seed);
        for strategy in strategies() {
            for cap in [None, Some(3)] {
                let opts = RecommendOptions { strategy, max_courses: cap, ..RecommendOptions::default() };
                let label = format!("semilla {} estrategia {} tope {:?}", seed, strategy, cap);
                let r = recommend(&catalog, &approved, Some(&history), &opts).expect(&label);
                check_result(&catalog, &approved, &r, cap, &label);
            }
        }
    }
}

#[test]
fn identical_inputs_give_identical_outputs() {
    for seed in 0..30u64 {
        let catalog = generated_catalog(seed);
        let approved = generated_approved(&catalog, seed);
        let history = generated_history(&catalog, seed);
        for strategy in strategies() {
            let opts = RecommendOptions { strategy, ..RecommendOptions::default() };
            let first = recommend(&catalog, &approved, Some(&history), &opts).unwrap();
            for _ in 0..3 {
                let again = recommend(&catalog, &approved, Some(&history), &opts).unwrap();
                assert_eq!(first, again, "semilla {} estrategia {}", seed, strategy);
            }
        }
    }
}

#[test]
fn last_completed_cycle_never_decreases() {
    for seed in 0..40u64 {
        let catalog = generated_catalog(seed);
        let mut rng = Lcg(seed + 1000);
        let mut order: Vec<String> = catalog.courses().iter().map(|c| c.code.clone()).collect();
        // Fisher-Yates con el generador fijo
        for i in (1..order.len()).rev() {
            let j = rng.range(0, i as u64) as usize;
            order.swap(i, j);
        }

        let mut approved = ApprovedSet::new();
        let mut previous = last_completed_cycle(&catalog, &approved);
        for code in order {
            approved.insert(code);
            let now = last_completed_cycle(&catalog, &approved);
            assert!(now >= previous, "semilla {}: {} < {}", seed, now, previous);
            previous = now;
        }
        assert_eq!(previous, catalog.max_cycle());
    }
}

#[test]
fn rule_engine_agrees_with_analyzer() {
    for seed in 0..60u64 {
        let catalog = generated_catalog(seed);
        let approved = generated_approved(&catalog, seed);
        let engine = RuleEngine::evaluate(&catalog, &approved);

        assert_eq!(engine.academic_state(), analyze(&catalog, &approved), "semilla {}", seed);
        for course in catalog.courses() {
            assert_eq!(
                engine.priority(&course.code),
                Some(priority_score(&catalog, course)),
                "semilla {} curso {}",
                seed,
                course.code
            );
        }
    }
}
