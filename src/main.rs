// --- Recomendador de cursos - Archivo principal ---

use mallaplan::config::AppConfig;
use mallaplan::{logging, run_server};
use tracing::{error, info};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    logging::init();

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("configuración inválida: {}", e);
            return Err(std::io::Error::other(e.to_string()));
        }
    };

    info!("=== Recomendador de cursos (API) ===");
    info!("Iniciando servidor en http://{}", config.bind_addr);
    run_server(config).await
}
