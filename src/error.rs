// Errores del núcleo recomendador

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecommendError {
    /// Prerrequisito desconocido, ciclo de dependencias u otro dato inválido en la malla.
    #[error("malla inválida: {reason}")]
    MalformedCatalog { reason: String },

    #[error("la malla no tiene cursos; no se puede calcular el porcentaje de avance")]
    EmptyCatalog,

    /// Sólo lo emite el solver CP; `recommend` lo recupera con backtracking.
    #[error("modelo infactible: el curso más barato ({cheapest_credits} créditos) excede el límite de {limit}")]
    InfeasibleModel { cheapest_credits: u32, limit: i32 },

    #[error("límite de créditos no positivo para el ciclo {cycle}: {limit}")]
    NoCreditBudget { cycle: u32, limit: i32 },
}

impl RecommendError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        RecommendError::MalformedCatalog { reason: reason.into() }
    }
}

pub type RecommendResult<T> = Result<T, RecommendError>;
