// Main entry point for API server

use anyhow::{Context, Result};
use server_core::kernel::setup::build_server_deps;
use server_core::server::auth::JwksVerifier;
use server_core::server::{build_app, AppState};
use server_core::config::DEFAULT_LOG_FILTER;
use server_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ClauseBit API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    let deps = build_server_deps(&config).await?;

    let jwks = config.clerk_jwks_url.as_deref().map(JwksVerifier::new);
    if jwks.is_none() {
        tracing::warn!("CLERK_JWKS_URL not set, /api/extension-auth is disabled");
    }

    // Build application
    let app = build_app(AppState::new(deps, jwks), &config.allowed_origins);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
