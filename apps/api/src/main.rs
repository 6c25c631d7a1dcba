mod config;
mod enhancement;
mod errors;
mod files;
mod routes;
mod state;
mod transform;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::enhancement::client::ChatClient;
use crate::enhancement::PromptEnhancer;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Hybrid Prompt API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the AI enhancer when a provider is configured
    let enhancer: Option<Arc<dyn PromptEnhancer>> = match &config.ai {
        Some(ai) => {
            let client = ChatClient::new(ai)?;
            info!("AI enhancement enabled (provider: {}, model: {})", ai.provider, ai.model);
            Some(Arc::new(client))
        }
        None => {
            info!("AI enhancement disabled (AI_PROVIDER not set)");
            None
        }
    };

    let state = AppState::new(config.clone(), enhancer);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
