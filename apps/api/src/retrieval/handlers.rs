//! Admin/diagnostic handlers over the retrieval engine.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::retrieval::engine::{EngineStatus, SearchHit};
use crate::routes::admin::require_admin;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Serialize)]
pub struct DocumentsResponse {
    pub success: bool,
    pub documents: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SectionResponse {
    pub success: bool,
    pub section: String,
    pub context: String,
}

/// POST /api/admin/search
pub async fn handle_search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    require_admin(&headers, &state.config)?;

    let query = req.query.trim();
    if query.is_empty() {
        return Err(AppError::Validation("Query cannot be empty".to_string()));
    }
    let limit = req.limit.unwrap_or(state.engine.config().search_limit);

    let results = state.engine.search_documents(query, limit).await;
    Ok(Json(SearchResponse {
        success: true,
        results,
    }))
}

/// GET /api/admin/section/:name
pub async fn handle_section(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<SectionResponse>, AppError> {
    require_admin(&headers, &state.config)?;

    let context = state.engine.get_section_context(&name);
    Ok(Json(SectionResponse {
        success: true,
        section: name,
        context,
    }))
}

/// GET /api/admin/retrieval/status
pub async fn handle_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<EngineStatus>, AppError> {
    require_admin(&headers, &state.config)?;
    Ok(Json(state.engine.status()))
}

/// GET /api/admin/retrieval/documents
/// The published chunks in index order; empty while not ready.
pub async fn handle_documents(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DocumentsResponse>, AppError> {
    require_admin(&headers, &state.config)?;
    Ok(Json(DocumentsResponse {
        success: true,
        documents: state.engine.documents(),
    }))
}
