use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::config::Config;
use crate::errors::AppError;

/// Admin routes require `Authorization: Bearer <ADMIN_PASSWORD>`.
pub fn require_admin(headers: &HeaderMap, config: &Config) -> Result<(), AppError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    if token == config.admin_password {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}
