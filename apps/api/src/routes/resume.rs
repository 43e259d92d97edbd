//! Resume data routes: public read, admin update with retrieval refresh.

use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::resume_store::{missing_required_section, parse_record};
use crate::routes::admin::require_admin;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ResumeDataResponse {
    pub success: bool,
    pub data: Value,
}

#[derive(Debug, Serialize)]
pub struct UpdateResumeResponse {
    pub success: bool,
    pub message: String,
    pub rag_ready: bool,
}

/// GET /api/resume-data
pub async fn handle_get_resume_data(
    State(state): State<AppState>,
) -> Result<Json<ResumeDataResponse>, AppError> {
    let data = state
        .store
        .load_raw()
        .await?
        .ok_or_else(|| AppError::NotFound("Resume data not found".to_string()))?;
    Ok(Json(ResumeDataResponse {
        success: true,
        data,
    }))
}

/// POST /api/admin/update-resume
///
/// Saves the new document, then rebuilds retrieval from it. A failed rebuild is
/// reported through `rag_ready` rather than as an error: the data is saved either way.
pub async fn handle_update_resume(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(new_data): Json<Value>,
) -> Result<Json<UpdateResumeResponse>, AppError> {
    require_admin(&headers, &state.config)?;

    if let Some(section) = missing_required_section(&new_data) {
        return Err(AppError::Validation(format!(
            "Missing required section: {section}"
        )));
    }
    let record = parse_record(new_data.clone())
        .map_err(|e| AppError::Validation(format!("Invalid resume data: {e}")))?;

    state.store.save_raw(&new_data).await?;
    let rag_ready = state.engine.refresh(&record).await;

    info!(rag_ready, "Resume data updated");

    Ok(Json(UpdateResumeResponse {
        success: true,
        message: "Resume data updated successfully".to_string(),
        rag_ready,
    }))
}
