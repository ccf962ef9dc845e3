use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::export::ExportError;
use crate::settings::SettingsError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type DashboardResult<T> = Result<T, DashboardError>;

impl DashboardError {
    pub fn asset_not_found(id: &str) -> Self {
        DashboardError::NotFound(format!("Asset {} not found", id))
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let (status, err_msg) = match self {
            DashboardError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            DashboardError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            DashboardError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            DashboardError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": err_msg
        }));

        (status, body).into_response()
    }
}

// StoreError to DashboardError conversion implementation
impl From<StoreError> for DashboardError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(e) => DashboardError::InvalidRequest(e.to_string()),
            StoreError::DuplicateId(id) => {
                DashboardError::Conflict(format!("Asset {} already exists", id))
            }
            other => DashboardError::InternalError(other.to_string()),
        }
    }
}

impl From<ExportError> for DashboardError {
    fn from(err: ExportError) -> Self {
        DashboardError::InternalError(err.to_string())
    }
}

impl From<SettingsError> for DashboardError {
    fn from(err: SettingsError) -> Self {
        DashboardError::InternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationError;

    #[test]
    fn test_store_errors_map_to_status_codes() {
        let validation: DashboardError = StoreError::Validation(ValidationError::MissingName).into();
        assert_eq!(validation.into_response().status(), StatusCode::BAD_REQUEST);

        let duplicate: DashboardError = StoreError::DuplicateId("a".to_string()).into();
        assert_eq!(duplicate.into_response().status(), StatusCode::CONFLICT);

        let task: DashboardError = StoreError::Task("join failed".to_string()).into();
        assert_eq!(
            task.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        assert_eq!(
            DashboardError::asset_not_found("x").into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
