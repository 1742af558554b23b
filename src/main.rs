mod analyzer;
mod capabilities;
mod config;
mod error;
mod gemini;
mod models;
mod orchestrator;
mod pipeline;
mod pricing;
mod prompt;
mod routes;
mod validator;

use anyhow::Context;
use routes::{router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};
use tower_http::cors::{CorsLayer, Any};

use crate::config::AppConfig;
use crate::gemini::GeminiClient;
use crate::pipeline::{Capabilities, DesignPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env();

    let gemini = Arc::new(GeminiClient::new(&config.gemini));
    if gemini.is_demo() {
        tracing::warn!("No GEMINI_API_KEY set: designs are placeholders, measurement and analysis are unavailable");
    } else {
        tracing::info!("GEMINI_API_KEY configured");
    }

    let pipeline = DesignPipeline::new(
        config.pipeline.clone(),
        Capabilities {
            vision: gemini.clone(),
            synthesis: gemini.clone(),
            reasoning: gemini,
        },
    );

    let app = router(AppState::new(pipeline))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        );

    let addr = SocketAddr::from(([0,0,0,0], config.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
