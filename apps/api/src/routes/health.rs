use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Reports liveness plus whether retrieval and generation are usable.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "services": {
            "rag_model": state.engine.is_ready(),
            "chat_model": state.llm.is_configured()
        }
    }))
}
