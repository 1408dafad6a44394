// Revisión del conjunto de aprobados. Nunca es un error: los datos históricos o
// convalidados pueden violar el orden de prerrequisitos de la malla vigente, así
// que sólo se reporta y se registra en el log.

use std::collections::BTreeSet;

use serde::Serialize;
use strsim::normalized_levenshtein;
use tracing::warn;

use crate::catalog::Catalog;
use crate::models::ApprovedSet;

/// Similitud mínima (Levenshtein normalizado) para sugerir un código de la malla.
pub const SUGGESTION_THRESHOLD: f64 = 0.7;

/// Si los ciclos aprobados abarcan más que esto, se reportan los ciclos saltados.
pub const SKIPPED_CYCLE_SPAN: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnknownCode {
    pub code: String,
    pub suggestion: Option<String>,
    pub similarity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrerequisiteGap {
    pub course_code: String,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ApprovedSetReport {
    pub unknown_codes: Vec<UnknownCode>,
    pub prerequisite_gaps: Vec<PrerequisiteGap>,
    pub skipped_cycles: Vec<u32>,
}

impl ApprovedSetReport {
    pub fn is_clean(&self) -> bool {
        self.unknown_codes.is_empty() && self.prerequisite_gaps.is_empty() && self.skipped_cycles.is_empty()
    }

    pub fn log_warnings(&self) {
        for u in self.unknown_codes.iter() {
            match &u.suggestion {
                Some(s) => warn!("⚠️ código aprobado desconocido {} (¿quiso decir {}?)", u.code, s),
                None => warn!("⚠️ código aprobado desconocido {}", u.code),
            }
        }
        for g in self.prerequisite_gaps.iter() {
            warn!(
                "⚠️ {} aprobado sin sus prerrequisitos: {}",
                g.course_code,
                g.missing.join(", ")
            );
        }
        if !self.skipped_cycles.is_empty() {
            warn!("⚠️ ciclos sin cursos aprobados: {:?}", self.skipped_cycles);
        }
    }
}

/// Código de la malla más parecido; empate -> el primero en orden de catálogo.
pub fn suggest_code(catalog: &Catalog, code: &str) -> Option<(String, f64)> {
    let needle = code.trim().to_uppercase();
    let mut best: Option<(&str, f64)> = None;
    for c in catalog.courses() {
        let sim = normalized_levenshtein(&needle, &c.code.to_uppercase());
        if best.map(|(_, b)| sim > b).unwrap_or(true) {
            best = Some((c.code.as_str(), sim));
        }
    }
    best.filter(|(_, sim)| *sim >= SUGGESTION_THRESHOLD)
        .map(|(c, sim)| (c.to_string(), sim))
}

pub fn validate_approved(catalog: &Catalog, approved: &ApprovedSet) -> ApprovedSetReport {
    let mut report = ApprovedSetReport::default();

    for code in approved.iter() {
        if catalog.contains(code) {
            continue;
        }
        let suggestion = suggest_code(catalog, code);
        report.unknown_codes.push(UnknownCode {
            code: code.clone(),
            suggestion: suggestion.as_ref().map(|(c, _)| c.clone()),
            similarity: suggestion.map(|(_, s)| s),
        });
    }

    let mut cycles: BTreeSet<u32> = BTreeSet::new();
    for course in catalog.courses() {
        if !approved.contains(&course.code) {
            continue;
        }
        cycles.insert(course.cycle);
        let missing: Vec<String> = course
            .prerequisites
            .iter()
            .filter(|p| !approved.contains(*p))
            .cloned()
            .collect();
        if !missing.is_empty() {
            report.prerequisite_gaps.push(PrerequisiteGap {
                course_code: course.code.clone(),
                missing,
            });
        }
    }

    if let (Some(&lo), Some(&hi)) = (cycles.first(), cycles.last()) {
        if hi - lo > SKIPPED_CYCLE_SPAN {
            report.skipped_cycles = (lo..=hi).filter(|c| !cycles.contains(c)).collect();
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawCourse;

    fn catalog() -> Catalog {
        Catalog::from_courses(
            vec![
                RawCourse::new("MAT1001", "Cálculo I", 1, 4, &[]),
                RawCourse::new("MAT1002", "Cálculo II", 2, 4, &["MAT1001"]),
                RawCourse::new("FIS1001", "Física I", 3, 4, &[]),
                RawCourse::new("FIS1002", "Física II", 4, 4, &[]),
                RawCourse::new("INF3001", "Sistemas", 6, 4, &[]),
            ],
            &[],
        )
        .unwrap()
    }

    fn approved(codes: &[&str]) -> ApprovedSet {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn clean_set() {
        let r = validate_approved(&catalog(), &approved(&["MAT1001", "MAT1002"]));
        assert!(r.is_clean());
    }

    #[test]
    fn unknown_code_gets_suggestion() {
        let r = validate_approved(&catalog(), &approved(&["mat1001x", "ZZZ"]));
        assert_eq!(r.unknown_codes.len(), 2);
        // BTreeSet: "ZZZ" < "mat1001x"
        assert_eq!(r.unknown_codes[0].code, "ZZZ");
        assert_eq!(r.unknown_codes[0].suggestion, None);
        assert_eq!(r.unknown_codes[1].suggestion.as_deref(), Some("MAT1001"));
    }

    #[test]
    fn gaps_and_skipped_cycles() {
        let r = validate_approved(&catalog(), &approved(&["MAT1002", "INF3001"]));
        assert_eq!(
            r.prerequisite_gaps,
            vec![PrerequisiteGap { course_code: "MAT1002".into(), missing: vec!["MAT1001".into()] }]
        );
        assert_eq!(r.skipped_cycles, vec![3, 4, 5]);
    }
}
