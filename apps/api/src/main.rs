mod chat;
mod config;
mod errors;
mod llm_client;
mod models;
mod resume_store;
mod retrieval;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::chat::history::ConversationLog;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::resume_store::ResumeStore;
use crate::retrieval::embedding::HttpEmbeddingProvider;
use crate::retrieval::engine::RetrievalEngine;
use crate::routes::build_router;
use crate::state::AppState;

/// Upper bound for a single chat-completion request.
const CHAT_TIMEOUT_SECS: u64 = 30;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_directive(&config.rust_log))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume assistant API v{}", env!("CARGO_PKG_VERSION"));

    // Embedding provider + retrieval engine
    let embedder = HttpEmbeddingProvider::new(
        &config.embedding_api_url,
        config.embedding_model.clone(),
        config.embedding_api_key.clone(),
        config.embedding_timeout,
    )?;
    info!(
        "Embedding provider initialized (model: {}, url: {})",
        embedder.model(),
        config.embedding_api_url
    );
    let engine = Arc::new(RetrievalEngine::new(
        Arc::new(embedder),
        config.retrieval.clone(),
    ));

    // Generation client
    let llm = LlmClient::new(
        config.chat_api_url.clone(),
        config.chat_model.clone(),
        config.chat_api_key.clone(),
        std::time::Duration::from_secs(CHAT_TIMEOUT_SECS),
    )?;
    if llm.is_configured() {
        info!("LLM client initialized (model: {})", llm.model());
    } else {
        warn!("CHAT_API_KEY not set; chat answers will use fallback text");
    }

    // Build the index from stored resume data. Failure leaves retrieval not-ready
    // but the server still starts.
    let store = ResumeStore::new(&config.resume_data_path);
    info!("Loading resume data from {}", store.path().display());
    match store.load().await {
        Ok(Some(record)) => {
            if engine.initialize(&record).await.is_ok() {
                info!("Retrieval engine initialized successfully");
            }
        }
        Ok(None) => warn!("No resume data found for retrieval initialization"),
        Err(e) => warn!("Failed to load resume data: {e}"),
    }

    let conversations = ConversationLog::new(&config.conversations_path);
    info!("Recording conversations to {}", conversations.path().display());

    let state = AppState {
        engine,
        llm,
        store,
        conversations,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Filter used when `RUST_LOG` is unset. Event targets start with the crate
/// name of this binary, not the package name.
fn default_log_directive(level: &str) -> String {
    format!("{}={}", env!("CARGO_CRATE_NAME"), level)
}
