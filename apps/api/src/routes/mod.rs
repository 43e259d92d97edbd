pub mod admin;
pub mod health;
pub mod resume;

use axum::{
    routing::{get, post},
    Router,
};

use crate::chat::handlers as chat;
use crate::retrieval::handlers as retrieval;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Public site API
        .route("/api/resume-data", get(resume::handle_get_resume_data))
        .route("/api/chat", post(chat::handle_chat))
        .route("/api/explain-text", post(chat::handle_explain_text))
        .route("/api/conversations", get(chat::handle_conversations))
        // Admin API (Bearer ADMIN_PASSWORD)
        .route(
            "/api/admin/update-resume",
            post(resume::handle_update_resume),
        )
        .route("/api/admin/search", post(retrieval::handle_search))
        .route("/api/admin/section/:name", get(retrieval::handle_section))
        .route(
            "/api/admin/retrieval/status",
            get(retrieval::handle_status),
        )
        .route(
            "/api/admin/retrieval/documents",
            get(retrieval::handle_documents),
        )
        .with_state(state)
}
