mod configuration;
mod error;
mod routes;
mod state;

use configuration::Settings;
use parley::providers::factory;
use parley::secrets::RealEnvironment;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let settings = Settings::new()?;
    let provider_type = settings.provider.provider_type();
    let provider_config = settings.provider.into_config(&RealEnvironment)?;
    let provider = factory::get_provider(provider_config)?;
    info!(provider = %provider_type, "configured completion provider");

    // Create app state and router with CORS support
    let state = state::AppState::new(provider);
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(settings.server.socket_addr()?).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
