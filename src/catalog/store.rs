//! Lectura de mallas desde ficheros JSON (`<dir>/<catalog_id>.json`).
//!
//! Es la frontera con el cargador externo: aquí se normalizan las etiquetas de
//! ciclo en números romanos ("IV" -> 4) para que el núcleo sólo vea enteros.
//! El fichero parseado se guarda en un caché por instancia (`Arc`), pero cada
//! petición construye su propio `Catalog` con `load`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::{Catalog, RawCatalog};
use crate::error::RecommendError;
use crate::models::RawCourse;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("malla no encontrada: {0}")]
    NotFound(String),

    #[error("error de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON de malla inválido: {0}")]
    Json(#[from] serde_json::Error),

    #[error("etiqueta de ciclo inválida en {code}: '{label}'")]
    InvalidCycleLabel { code: String, label: String },

    #[error(transparent)]
    Catalog(#[from] RecommendError),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CycleLabel {
    Number(u32),
    Label(String),
}

#[derive(Debug, Deserialize)]
struct CourseRecord {
    code: String,
    #[serde(default)]
    title: String,
    cycle: CycleLabel,
    credits: u32,
    #[serde(default)]
    prerequisites: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    revision: Option<u32>,
    #[serde(default)]
    default_credit_limit: Option<i32>,
    #[serde(default)]
    credit_limits: BTreeMap<u32, i32>,
    courses: Vec<CourseRecord>,
}

/// Convierte "IV", "iv", "4" o " X " a entero. `None` si no es un ciclo válido.
pub fn parse_cycle_label(label: &str) -> Option<u32> {
    let s = label.trim().to_uppercase();
    if s.is_empty() {
        return None;
    }
    if let Ok(n) = s.parse::<u32>() {
        return Some(n);
    }

    let value = |c: char| match c {
        'I' => Some(1),
        'V' => Some(5),
        'X' => Some(10),
        'L' => Some(50),
        'C' => Some(100),
        _ => None,
    };

    let digits: Vec<i64> = s.chars().map(value).collect::<Option<Vec<i64>>>()?;
    let mut total: i64 = 0;
    for (i, &d) in digits.iter().enumerate() {
        match digits.get(i + 1) {
            Some(&next) if next > d => total -= d,
            _ => total += d,
        }
    }
    if total <= 0 { None } else { u32::try_from(total).ok() }
}

/// Parsea el JSON de una malla a `RawCatalog` (ciclos ya normalizados).
pub fn parse_catalog_json(text: &str) -> Result<RawCatalog, StoreError> {
    let file: CatalogFile = serde_json::from_str(text)?;
    let mut courses: Vec<RawCourse> = Vec::with_capacity(file.courses.len());
    for rec in file.courses.into_iter() {
        let cycle = match &rec.cycle {
            CycleLabel::Number(n) => *n,
            CycleLabel::Label(l) => parse_cycle_label(l).ok_or_else(|| StoreError::InvalidCycleLabel {
                code: rec.code.clone(),
                label: l.clone(),
            })?,
        };
        courses.push(RawCourse {
            code: rec.code,
            title: rec.title,
            cycle,
            credits: rec.credits,
            prerequisites: rec.prerequisites,
        });
    }
    Ok(RawCatalog {
        revision: file.revision,
        courses,
        credit_limits: file.credit_limits,
        default_credit_limit: file.default_credit_limit,
    })
}

#[derive(Debug)]
pub struct CatalogStore {
    dir: PathBuf,
    cache: Mutex<HashMap<String, Arc<RawCatalog>>>,
}

impl CatalogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CatalogStore {
            dir: dir.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Devuelve los datos crudos de la malla, leyendo del disco sólo la primera vez.
    pub fn load_raw(&self, catalog_id: &str) -> Result<Arc<RawCatalog>, StoreError> {
        let id = catalog_id.trim();
        // sólo nombres planos: nada de rutas relativas fuera del directorio
        if id.is_empty() || id.contains('/') || id.contains('\\') || id.contains("..") {
            return Err(StoreError::NotFound(catalog_id.to_string()));
        }

        {
            let guard = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(existing) = guard.get(id) {
                return Ok(Arc::clone(existing));
            }
        }

        let path = self.dir.join(format!("{}.json", id));
        if !path.is_file() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        debug!("📥 leyendo malla {:?}", path);
        let text = fs::read_to_string(&path)?;
        let raw = Arc::new(parse_catalog_json(&text)?);

        let mut guard = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(id.to_string(), Arc::clone(&raw));
        Ok(raw)
    }

    /// Construye un `Catalog` nuevo (snapshot propio de la petición).
    pub fn load(&self, catalog_id: &str) -> Result<Catalog, StoreError> {
        let raw = self.load_raw(catalog_id)?;
        Ok(Catalog::build((*raw).clone())?)
    }

    /// Ids de las mallas disponibles (nombre de fichero sin `.json`), ordenados.
    pub fn list_catalogs(&self) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = Vec::new();
        for entry in fs::read_dir(&self.dir)?.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
