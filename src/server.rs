use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use serde_json::json;
use tracing::{error, info};

use crate::algorithm::{compare_strategies, recommend, validate_approved};
use crate::api_json::{parse_and_resolve, ResolvedRequest};
use crate::catalog::store::{CatalogStore, StoreError};
use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::error::RecommendError;
use crate::models::{RecommendationRequest, Strategy};

/// Estado compartido de sólo lectura entre workers.
pub struct AppState {
    pub store: CatalogStore,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        AppState {
            store: CatalogStore::new(config.catalog_dir.clone()),
            config,
        }
    }
}

fn error_response(status: StatusCode, msg: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::build(status).json(json!({"status": "error", "error": msg.to_string()}))
}

fn store_error_response(e: StoreError) -> HttpResponse {
    let status = match &e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        StoreError::Json(_) | StoreError::InvalidCycleLabel { .. } | StoreError::Catalog(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("❌ error leyendo mallas: {}", e);
    }
    error_response(status, e)
}

fn recommend_error_response(e: RecommendError) -> HttpResponse {
    error_response(StatusCode::UNPROCESSABLE_ENTITY, e)
}

// cuerpo JSON -> petición normalizada + malla de la petición
fn load_request(
    state: &AppState,
    body: serde_json::Value,
) -> Result<(ResolvedRequest, Catalog), HttpResponse> {
    let json_str = serde_json::to_string(&body)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("invalid JSON body: {}", e)))?;
    let req = parse_and_resolve(&json_str, &state.config)
        .map_err(|e| error_response(StatusCode::UNPROCESSABLE_ENTITY, e))?;
    let catalog = state.store.load(&req.catalog_id).map_err(store_error_response)?;
    Ok((req, catalog))
}

/// POST /recommendations
async fn recommendations_handler(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> impl Responder {
    let (req, catalog) = match load_request(&state, body.into_inner()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match recommend(&catalog, &req.approved, req.history.as_ref(), &req.options) {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => recommend_error_response(e),
    }
}

/// POST /recommendations/compare
async fn compare_handler(state: web::Data<AppState>, body: web::Json<serde_json::Value>) -> impl Responder {
    let (req, catalog) = match load_request(&state, body.into_inner()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match compare_strategies(&catalog, &req.approved, req.history.as_ref(), &req.options) {
        Ok(cmp) => HttpResponse::Ok().json(cmp),
        Err(e) => recommend_error_response(e),
    }
}

/// POST /approved/validate
async fn validate_handler(state: web::Data<AppState>, body: web::Json<serde_json::Value>) -> impl Responder {
    let (req, catalog) = match load_request(&state, body.into_inner()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let report = validate_approved(&catalog, &req.approved);
    HttpResponse::Ok().json(json!({"status": "ok", "clean": report.is_clean(), "report": report}))
}

/// GET /catalogs
async fn catalogs_handler(state: web::Data<AppState>) -> impl Responder {
    match state.store.list_catalogs() {
        Ok(ids) => HttpResponse::Ok().json(json!({"catalogs": ids})),
        Err(e) => store_error_response(e),
    }
}

async fn help_handler() -> impl Responder {
    let example = RecommendationRequest {
        catalog_id: "malla2020".to_string(),
        approved_course_codes: vec!["MAT1001".to_string(), "FIS1001".to_string()],
        strategy: Strategy::Auto,
        historical_cooccurrence: None,
        audit: false,
        max_courses: Some(6),
    };

    let help = json!({
        "description": "API de recomendación de cursos. POST /recommendations recibe la malla y los cursos aprobados y devuelve los cursos sugeridos para el próximo ciclo.",
        "post_example": example,
        "routes": {
            "POST /recommendations": "recomendación con la estrategia pedida o elegida automáticamente",
            "POST /recommendations/compare": "corre las cuatro estrategias y compara resultados y tiempos",
            "POST /approved/validate": "revisa códigos desconocidos, prerrequisitos faltantes y ciclos saltados",
            "GET /catalogs": "mallas disponibles"
        },
        "strategies": ["auto", "constraint_programming", "backtracking", "rule_inference", "association"]
    });

    HttpResponse::Ok().json(help)
}

/// Rutas de la API; se reutiliza en los tests con `actix_web::test`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/recommendations", web::post().to(recommendations_handler))
        .route("/recommendations/compare", web::post().to(compare_handler))
        .route("/approved/validate", web::post().to(validate_handler))
        .route("/catalogs", web::get().to(catalogs_handler))
        .route("/help", web::get().to(help_handler));
}

pub async fn run_server(config: AppConfig) -> std::io::Result<()> {
    let bind_addr = config.bind_addr.clone();
    info!("📂 mallas en {:?}", config.catalog_dir);
    let state = web::Data::new(AppState::new(config));

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
