use rail_board::config::AppConfig;
use rail_board::web::{AppState, create_router};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    // Fixtures are loaded once; fail fast if they are missing
    let state = match AppState::load(&config) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to load fixtures: {e}");
            std::process::exit(1);
        }
    };

    let app = create_router(state);

    let listener = match tokio::net::TcpListener::bind(config.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(bind = %config.bind, "Failed to bind: {e}");
            std::process::exit(1);
        }
    };
    info!(bind = %config.bind, fixtures = ?config.fixtures_dir, "Rail board listening");
    info!("  GET    /stations?q=         - Search stations");
    info!("  POST   /liveboard           - Load a liveboard");
    info!("  POST   /routes              - Plan routes");
    info!("  POST   /{{view}}/extend       - Earlier or later results");

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}
