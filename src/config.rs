// Configuración: umbrales del selector de estrategia y parámetros del servidor.
//
// Los umbrales son configuración ajustable, no ley fija: se leen de un JSON
// opcional (MALLAPLAN_THRESHOLDS_FILE) y si falta cualquier campo se usa el default.

use std::env;
use std::error::Error;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Umbrales y pesos de la política de selección de estrategia.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorThresholds {
    /// Pendientes > este valor favorece CP.
    pub many_pending: usize,
    /// Pendientes < este valor favorece backtracking.
    pub few_pending: usize,
    /// Avance estrictamente mayor que este valor favorece backtracking.
    pub high_percent: u32,
    pub low_percent: u32,
    pub late_cycle: u32,
    pub early_cycle: u32,
    /// Densidad de prerrequisitos (aristas / cursos) sobre la cual la malla se considera "densa".
    pub dense_prerequisites: f64,
    /// Revisiones de malla con esta antigüedad o más favorecen CP.
    pub old_revision_age: u32,
    /// Pares históricos mínimos para confiar en el recomendador por asociación.
    pub min_history_pairs: usize,

    pub weight_irregular: i32,
    pub weight_regular: i32,
    pub weight_many_pending: i32,
    pub weight_few_pending: i32,
    pub weight_high_percent: i32,
    pub weight_low_percent: i32,
    pub weight_late_cycle: i32,
    pub weight_early_cycle: i32,
    pub weight_dense: i32,
    pub weight_old_revision: i32,
}

impl Default for SelectorThresholds {
    fn default() -> Self {
        SelectorThresholds {
            many_pending: 20,
            few_pending: 12,
            high_percent: 75,
            low_percent: 50,
            late_cycle: 8,
            early_cycle: 4,
            dense_prerequisites: 0.35,
            old_revision_age: 6,
            min_history_pairs: 10,
            weight_irregular: 40,
            weight_regular: 30,
            weight_many_pending: 30,
            weight_few_pending: 25,
            weight_high_percent: 35,
            weight_low_percent: 25,
            weight_late_cycle: 20,
            weight_early_cycle: 15,
            weight_dense: 25,
            weight_old_revision: 20,
        }
    }
}

impl SelectorThresholds {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub catalog_dir: PathBuf,
    /// Revisión más reciente conocida; la antigüedad de una malla es `latest - revision`.
    pub latest_revision: Option<u32>,
    pub thresholds: SelectorThresholds,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bind_addr: "127.0.0.1:8080".to_string(),
            catalog_dir: PathBuf::from("data/catalogs"),
            latest_revision: None,
            thresholds: SelectorThresholds::default(),
        }
    }
}

impl AppConfig {
    /// Carga `.env` si existe y luego lee las variables `MALLAPLAN_*`.
    pub fn from_env() -> Result<Self, Box<dyn Error>> {
        let _ = dotenv::dotenv();
        let mut cfg = AppConfig::default();

        if let Ok(bind) = env::var("MALLAPLAN_BIND") {
            cfg.bind_addr = bind;
        }
        if let Ok(dir) = env::var("MALLAPLAN_CATALOG_DIR") {
            cfg.catalog_dir = PathBuf::from(dir);
        }
        if let Ok(rev) = env::var("MALLAPLAN_LATEST_REVISION") {
            match rev.trim().parse::<u32>() {
                Ok(r) => cfg.latest_revision = Some(r),
                Err(e) => warn!("MALLAPLAN_LATEST_REVISION inválido ({}): {}", rev, e),
            }
        }
        if let Ok(path) = env::var("MALLAPLAN_THRESHOLDS_FILE") {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| format!("no se pudo leer {}: {}", path, e))?;
            cfg.thresholds = SelectorThresholds::from_json(&text)?;
            info!("umbrales del selector cargados desde {}", path);
        }

        Ok(cfg)
    }
}
