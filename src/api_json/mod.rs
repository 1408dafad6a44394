use thiserror::Error;

use crate::algorithm::{CooccurrenceStats, RecommendOptions};
use crate::config::AppConfig;
use crate::models::{ApprovedSet, RecommendationRequest};

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("JSON de entrada inválido: {0}")]
    Json(#[from] serde_json::Error),

    #[error("catalog_id es obligatorio")]
    MissingCatalogId,

    #[error("max_courses debe ser mayor que 0")]
    ZeroCourseCap,
}

/// Petición ya normalizada, lista para el núcleo.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub catalog_id: String,
    pub approved: ApprovedSet,
    /// `None` si la petición no trae historial.
    pub history: Option<CooccurrenceStats>,
    pub options: RecommendOptions,
}

pub fn parse_json_input(json_str: &str) -> Result<RecommendationRequest, serde_json::Error> {
    serde_json::from_str::<RecommendationRequest>(json_str)
}

/// Códigos recortados, sin vacíos ni duplicados.
pub fn normalize_codes(codes: &[String]) -> ApprovedSet {
    codes
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(|c| c.to_string())
        .collect()
}

/// Valida la petición y arma las opciones con los umbrales de `config`.
pub fn resolve_request(req: RecommendationRequest, config: &AppConfig) -> Result<ResolvedRequest, RequestError> {
    let catalog_id = req.catalog_id.trim().to_string();
    if catalog_id.is_empty() {
        return Err(RequestError::MissingCatalogId);
    }
    if req.max_courses == Some(0) {
        return Err(RequestError::ZeroCourseCap);
    }
    let history = req
        .historical_cooccurrence
        .as_deref()
        .map(CooccurrenceStats::from_entries);

    Ok(ResolvedRequest {
        catalog_id,
        approved: normalize_codes(&req.approved_course_codes),
        history,
        options: RecommendOptions {
            strategy: req.strategy,
            audit: req.audit,
            max_courses: req.max_courses,
            thresholds: config.thresholds.clone(),
            latest_revision: config.latest_revision,
        },
    })
}

pub fn parse_and_resolve(json_str: &str, config: &AppConfig) -> Result<ResolvedRequest, RequestError> {
    let req = parse_json_input(json_str)?;
    resolve_request(req, config)
}
