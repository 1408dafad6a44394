// Biblioteca raíz del crate `mallaplan`.
// Núcleo de recomendación de cursos (malla -> estado académico -> estrategia ->
// resultado) más la capa HTTP delgada que lo expone.
pub mod algorithm;
pub mod api_json;
pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod server;

/// Punto de entrada del núcleo (reexport).
pub use algorithm::{recommend, RecommendOptions};
pub use catalog::Catalog;
pub use error::{RecommendError, RecommendResult};
/// Ejecuta el servidor HTTP (reexport para facilitar uso desde `main`)
pub use server::run_server;
