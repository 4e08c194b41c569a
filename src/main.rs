//! Analytics service binary.
//!
//! Loads configuration from the environment, wires the application state,
//! and serves the HTTP API until interrupted.

use tracing::info;

use coursedash_core::config::AppConfig;
use coursedash_core::logging::init_structured_logging;
use coursedash_core::web::state::AppState;
use coursedash_core::web::create_app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let config = AppConfig::from_env()?;
    let bind_address = config.web.bind_address.clone();

    let state = AppState::from_config(config).await?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "Analytics API listening");

    axum::serve(listener, app).await?;
    Ok(())
}
