//! Axum route handlers for the chat API.

use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::chat::fallback::follow_up_suggestions;
use crate::chat::history::ConversationEntry;
use crate::chat::{explain_text, generate_answer, ChatMode};
use crate::errors::AppError;
use crate::routes::admin::require_admin;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    pub mode: Option<String>,
    /// Text the visitor selected or the section they are viewing.
    #[serde(default)]
    pub context: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
    pub session_id: String,
    pub mode: &'static str,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ConversationsResponse {
    pub success: bool,
    pub conversations: Vec<ConversationEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ExplainRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub section: String,
}

#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub success: bool,
    pub explanation: String,
    pub original_text: String,
}

/// POST /api/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(AppError::Validation("Message cannot be empty".to_string()));
    }

    let mode = ChatMode::parse(req.mode.as_deref());
    let session_id = req
        .session_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let rag_context = state.engine.get_relevant_context(message, &req.context).await;
    let response = generate_answer(
        &state.llm,
        &state.engine,
        message,
        mode,
        &rag_context,
        &req.context,
    )
    .await;

    info!(session_id = %session_id, mode = mode.as_str(), "Chat message answered");

    // A lost transcript entry never fails the visitor's request.
    let entry = ConversationEntry {
        session_id: session_id.clone(),
        timestamp: Utc::now(),
        message: message.to_string(),
        response: response.clone(),
        mode: mode.as_str().to_string(),
        context: req.context.clone(),
    };
    if let Err(e) = state.conversations.append(entry).await {
        warn!("Failed to record conversation: {e}");
    }

    Ok(Json(ChatResponse {
        success: true,
        suggestions: follow_up_suggestions(message),
        response,
        session_id,
        mode: mode.as_str(),
    }))
}

/// POST /api/explain-text
pub async fn handle_explain_text(
    State(state): State<AppState>,
    Json(req): Json<ExplainRequest>,
) -> Result<Json<ExplainResponse>, AppError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("No text selected".to_string()));
    }

    let explanation = explain_text(&state.llm, text, &req.section).await;
    Ok(Json(ExplainResponse {
        success: true,
        explanation,
        original_text: text.to_string(),
    }))
}

/// GET /api/conversations
/// The most recent chat exchanges, oldest first.
pub async fn handle_conversations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ConversationsResponse>, AppError> {
    require_admin(&headers, &state.config)?;
    let conversations = state.conversations.load().await?;
    Ok(Json(ConversationsResponse {
        success: true,
        conversations,
    }))
}
