//! Escenarios de referencia del recomendador: malla A, B (ciclo 1) y C (ciclo 2,
//! requiere A y B), corridos con cada estrategia.

use mallaplan::algorithm::RecommendOptions;
use mallaplan::models::{ApprovedSet, RawCourse, ReasonTag, Strategy};
use mallaplan::{recommend, Catalog, RecommendError};

fn abc(limit_cycle_2: i32) -> Catalog {
    Catalog::from_courses(
        vec![
            RawCourse::new("A", "Cálculo I", 1, 4, &[]),
            RawCourse::new("B", "Álgebra", 1, 3, &[]),
            RawCourse::new("C", "Cálculo II", 2, 4, &["A", "B"]),
        ],
        &[(1, 20), (2, limit_cycle_2)],
    )
    .expect("malla válida")
}

fn approved(codes: &[&str]) -> ApprovedSet {
    codes.iter().map(|c| c.to_string()).collect()
}

fn with_strategy(strategy: Strategy) -> RecommendOptions {
    RecommendOptions { strategy, ..RecommendOptions::default() }
}

fn all_strategies() -> Vec<Strategy> {
    let mut v = vec![Strategy::Auto];
    v.extend(Strategy::CONCRETE);
    v
}

#[test]
fn regular_student_enrolls_next_cycle() {
    let cat = abc(4);
    let ap = approved(&["A", "B"]);
    for strategy in all_strategies() {
        let r = recommend(&cat, &ap, None, &with_strategy(strategy)).expect("recomendación");
        assert_eq!(r.recommended_course_codes, vec!["C".to_string()], "estrategia {}", strategy);
        assert_eq!(r.total_credits, 4);
        assert!(r.academic_state.is_regular);
        assert_eq!(r.academic_state.last_completed_cycle, 1);
        assert_eq!(r.academic_state.target_cycle, 2);
        assert_eq!(r.rationale.len(), 1);
        assert!(r.rationale[0].reason_tag.is_mandatory());
        assert_eq!(r.rationale[0].priority_tier, 1);
    }
}

#[test]
fn missing_first_cycle_course_is_mandatory() {
    let cat = abc(4);
    let ap = approved(&["A"]);
    for strategy in [Strategy::Auto, Strategy::Backtracking, Strategy::RuleInference, Strategy::Association] {
        let r = recommend(&cat, &ap, None, &with_strategy(strategy)).expect("recomendación");
        assert_eq!(r.recommended_course_codes, vec!["B".to_string()], "estrategia {}", strategy);
        assert_eq!(r.academic_state.last_completed_cycle, 0);
        assert_eq!(r.academic_state.target_cycle, 1);
        assert!(!r.academic_state.is_regular);
    }

    // empate de puntajes en el selector -> backtracking
    let auto = recommend(&cat, &ap, None, &RecommendOptions::default()).unwrap();
    assert_eq!(auto.strategy_used, Strategy::Backtracking);
    assert_eq!(auto.rationale[0].reason_tag, ReasonTag::MandatoryPending);
}

#[test]
fn cp_may_add_a_course_unlocked_by_its_own_mandatory_pick() {
    let cat = abc(4);
    let ap = approved(&["A"]);
    let r = recommend(&cat, &ap, None, &with_strategy(Strategy::ConstraintProgramming)).unwrap();
    assert_eq!(r.recommended_course_codes, vec!["B".to_string(), "C".to_string()]);
    assert_eq!(r.total_credits, 7);
    assert!(r.total_credits as i32 <= cat.credit_limit(1));
}

#[test]
fn limit_below_every_pending_course_yields_empty() {
    let cat = abc(3);
    let ap = approved(&["A", "B"]);
    for strategy in all_strategies() {
        let r = recommend(&cat, &ap, None, &with_strategy(strategy)).expect("nunca error duro");
        assert!(r.recommended_course_codes.is_empty(), "estrategia {}", strategy);
        assert_eq!(r.total_credits, 0);
    }
}

#[test]
fn infeasible_cp_falls_back_to_backtracking() {
    let cat = abc(3);
    let ap = approved(&["A", "B"]);
    let r = recommend(&cat, &ap, None, &with_strategy(Strategy::ConstraintProgramming)).unwrap();
    assert_eq!(r.strategy_used, Strategy::Backtracking);
    assert_eq!(r.fallback_from, Some(Strategy::ConstraintProgramming));
    assert!(r.selection_reason.contains("infactible"));
}

#[test]
fn empty_catalog_is_signaled() {
    let cat = Catalog::from_courses(vec![], &[]).unwrap();
    for strategy in all_strategies() {
        let err = recommend(&cat, &ApprovedSet::new(), None, &with_strategy(strategy)).unwrap_err();
        assert_eq!(err, RecommendError::EmptyCatalog);
    }
}

#[test]
fn graduated_student_gets_nothing() {
    let cat = abc(0);
    let ap = approved(&["A", "B", "C"]);
    for strategy in all_strategies() {
        // límite 0 en el ciclo 2 no importa: no queda nada pendiente
        let r = recommend(&cat, &ap, None, &with_strategy(strategy)).unwrap();
        assert!(r.recommended_course_codes.is_empty());
        assert_eq!(r.academic_state.last_completed_cycle, 2);
        assert_eq!(r.academic_state.percent_complete, 100);
        assert_eq!(r.academic_state.estimated_cycles_remaining, 0);
    }
}

#[test]
fn graduation_reports_the_last_contiguous_cycle() {
    // el ciclo 2 no tiene cursos, así que nunca se completa
    let cat = Catalog::from_courses(
        vec![RawCourse::new("A", "Cálculo I", 1, 4, &[]), RawCourse::new("Z", "Tesis", 3, 4, &[])],
        &[(1, 20), (3, 20)],
    )
    .unwrap();
    let ap = approved(&["A", "Z"]);
    for strategy in all_strategies() {
        let r = recommend(&cat, &ap, None, &with_strategy(strategy)).unwrap();
        assert!(r.recommended_course_codes.is_empty(), "estrategia {}", strategy);
        assert_eq!(r.academic_state.last_completed_cycle, 1);
        assert_eq!(r.academic_state.percent_complete, 100);
        assert_eq!(r.academic_state.estimated_cycles_remaining, 0);
    }
}

#[test]
fn non_positive_limit_is_a_configuration_error() {
    let cat = abc(0);
    let ap = approved(&["A", "B"]);
    for strategy in all_strategies() {
        let err = recommend(&cat, &ap, None, &with_strategy(strategy)).unwrap_err();
        assert_eq!(err, RecommendError::NoCreditBudget { cycle: 2, limit: 0 });
    }
}

#[test]
fn malformed_catalogs_are_rejected_before_any_computation() {
    let unknown = Catalog::from_courses(vec![RawCourse::new("A", "a", 1, 3, &["NOPE"])], &[]);
    assert!(matches!(unknown, Err(RecommendError::MalformedCatalog { .. })));

    let cyclic = Catalog::from_courses(
        vec![RawCourse::new("A", "a", 1, 3, &["B"]), RawCourse::new("B", "b", 2, 3, &["A"])],
        &[],
    );
    assert!(matches!(cyclic, Err(RecommendError::MalformedCatalog { .. })));
}

#[test]
fn inconsistent_approved_set_is_tolerated() {
    // C aprobado sin B: no es error
    let cat = abc(4);
    let ap = approved(&["A", "C"]);
    let r = recommend(&cat, &ap, None, &RecommendOptions::default()).unwrap();
    assert_eq!(r.recommended_course_codes, vec!["B".to_string()]);
    assert!(!r.academic_state.is_regular);
}

#[test]
fn course_cap_is_honored() {
    let cat = Catalog::from_courses(
        (1..=8)
            .map(|i| RawCourse::new(&format!("K{}", i), "k", 1, 2, &[]))
            .collect(),
        &[],
    )
    .unwrap();
    let opts = RecommendOptions { max_courses: Some(6), ..RecommendOptions::default() };
    for strategy in all_strategies() {
        let r = recommend(&cat, &ApprovedSet::new(), None, &RecommendOptions { strategy, ..opts.clone() }).unwrap();
        assert_eq!(r.recommended_course_codes.len(), 6, "estrategia {}", strategy);
    }
}
