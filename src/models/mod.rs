// Estructuras de datos principales

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::algorithm::rules::DerivationStep;

/// Cursos aprobados por el estudiante, ya normalizados a códigos de la malla vigente.
/// `BTreeSet` para que cualquier iteración sea determinista.
pub type ApprovedSet = BTreeSet<String>;

/// Registro de curso tal como lo entrega el cargador externo.
/// El ciclo ya viene como entero (los números romanos se resuelven antes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCourse {
    pub code: String,
    pub title: String,
    pub cycle: u32,
    pub credits: u32,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

impl RawCourse {
    pub fn new(code: &str, title: &str, cycle: u32, credits: u32, prerequisites: &[&str]) -> Self {
        RawCourse {
            code: code.to_string(),
            title: title.to_string(),
            cycle,
            credits,
            prerequisites: prerequisites.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Curso validado dentro de un `Catalog`. Los prerrequisitos no tienen duplicados
/// y conservan el orden de la fuente.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Course {
    pub code: String,
    pub title: String,
    pub cycle: u32,
    pub credits: u32,
    pub prerequisites: Vec<String>,
}

impl Course {
    pub fn prerequisites_met(&self, approved: &ApprovedSet) -> bool {
        self.prerequisites.iter().all(|p| approved.contains(p))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    Auto,
    ConstraintProgramming,
    Backtracking,
    RuleInference,
    Association,
}

impl Strategy {
    /// Estrategias concretas (sin `Auto`), en el orden usado por la comparación.
    pub const CONCRETE: [Strategy; 4] = [
        Strategy::ConstraintProgramming,
        Strategy::Backtracking,
        Strategy::RuleInference,
        Strategy::Association,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Auto => "auto",
            Strategy::ConstraintProgramming => "constraint_programming",
            Strategy::Backtracking => "backtracking",
            Strategy::RuleInference => "rule_inference",
            Strategy::Association => "association",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fase o regla que eligió cada curso recomendado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonTag {
    /// Backtracking, fase 1: pendiente obligatorio del ciclo de matrícula.
    MandatoryPending,
    /// Backtracking, fase 2: electivo/avance ordenado por prioridad.
    PriorityElective,
    SolverMandatory,
    SolverElective,
    RuleMandatory,
    RuleAdvance,
    /// Asociación: puntaje por co-ocurrencia histórica.
    CoOccurrence,
    /// Asociación sin historial para el curso: se usó la prioridad.
    PriorityFallback,
}

impl ReasonTag {
    pub fn is_mandatory(&self) -> bool {
        matches!(
            self,
            ReasonTag::MandatoryPending | ReasonTag::SolverMandatory | ReasonTag::RuleMandatory
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RationaleEntry {
    pub course_code: String,
    pub reason_tag: ReasonTag,
    pub priority_score: i64,
    /// 1: alta, 2: media, 3: baja
    pub priority_tier: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicState {
    pub last_completed_cycle: u32,
    pub target_cycle: u32,
    pub is_regular: bool,
    pub percent_complete: u32,
    pub estimated_cycles_remaining: u32,
}

/// Conteo histórico de co-matrícula para un par de cursos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooccurrenceEntry {
    pub first: String,
    pub second: String,
    pub count: u32,
}

/// Petición de recomendación.
///
/// ```json
/// {
///   "catalog_id": "malla2020",
///   "approved_course_codes": ["MAT1001", "FIS1001"],
///   "strategy": "auto",
///   "historical_cooccurrence": [{"first": "MAT1001", "second": "MAT1002", "count": 12}],
///   "audit": false,
///   "max_courses": 6
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub catalog_id: String,
    #[serde(default)]
    pub approved_course_codes: Vec<String>,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub historical_cooccurrence: Option<Vec<CooccurrenceEntry>>,
    #[serde(default)]
    pub audit: bool,
    #[serde(default)]
    pub max_courses: Option<usize>,
}

/// Único artefacto de salida del núcleo. Inmutable una vez producido.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub recommended_course_codes: Vec<String>,
    pub total_credits: u32,
    pub strategy_used: Strategy,
    pub academic_state: AcademicState,
    pub rationale: Vec<RationaleEntry>,
    /// Explicación determinista de por qué se eligió la estrategia.
    pub selection_reason: String,
    /// Presente cuando la estrategia pedida falló y se usó el respaldo.
    #[serde(default)]
    pub fallback_from: Option<Strategy>,
    /// Cadena de hechos y reglas que sostiene cada curso elegido, premisas
    /// primero. Sólo cuando la estrategia usada fue el motor de reglas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivation: Option<Vec<DerivationStep>>,
}
