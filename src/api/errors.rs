//! # API Errors
//!
//! One error type for everything the service layer returns. Subsystem
//! errors pass through with their own codes; this type only adds the HTTP
//! status mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::entity::EntityError;
use crate::export::ExportError;
use crate::import::ImportError;
use crate::maintenance::MaintenanceError;
use crate::storage::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Maintenance(#[from] MaintenanceError),

    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Export(#[from] ExportError),

    /// Another export or import holds the dump slot
    #[error("an export or import is already running")]
    DumpInProgress,

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Maintenance(MaintenanceError::WriteRejected(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Maintenance(MaintenanceError::StoreUnavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            ApiError::Entity(err) => match err {
                EntityError::WriteRejected(_) => StatusCode::SERVICE_UNAVAILABLE,
                EntityError::Invalid(_) => StatusCode::BAD_REQUEST,
                EntityError::NotFound { .. } => StatusCode::NOT_FOUND,
                EntityError::AlreadyExists { .. } => StatusCode::CONFLICT,
                EntityError::DanglingReference { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                EntityError::Corrupt { .. } | EntityError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },

            ApiError::Import(err) => match err {
                ImportError::MalformedRecord { .. } | ImportError::TruncatedStream { .. } => {
                    StatusCode::BAD_REQUEST
                }
                ImportError::StoreNotEmpty | ImportError::NotInMaintenance { .. } => {
                    StatusCode::CONFLICT
                }
                ImportError::StoreUnavailable(_) | ImportError::Cancelled => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },

            ApiError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::DumpInProgress => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Maintenance(e) => e.code(),
            ApiError::Entity(e) => e.code(),
            ApiError::Import(e) => e.code(),
            ApiError::Export(e) => e.code(),
            ApiError::DumpInProgress => "CS_DUMP_IN_PROGRESS",
            ApiError::BadRequest(_) => "CS_BAD_REQUEST",
            ApiError::Store(_) => "CS_STORE_UNAVAILABLE",
            ApiError::Internal(_) => "CS_INTERNAL",
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    pub status: u16,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            error: err.to_string(),
            code: err.code(),
            status: err.status_code().as_u16(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maintenance::{Mode, WriteRejected};

    #[test]
    fn test_status_codes() {
        let rejected = ApiError::from(EntityError::from(WriteRejected {
            mode: Mode::Maintenance,
        }));
        assert_eq!(rejected.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(rejected.code(), "CS_WRITE_REJECTED");

        let malformed = ApiError::from(ImportError::MalformedRecord {
            position: 3,
            offset: 120,
            reason: "bad".to_string(),
        });
        assert_eq!(malformed.status_code(), StatusCode::BAD_REQUEST);

        let not_empty = ApiError::from(ImportError::StoreNotEmpty);
        assert_eq!(not_empty.status_code(), StatusCode::CONFLICT);

        let unavailable = ApiError::from(MaintenanceError::from(StoreError::read("x")));
        assert_eq!(unavailable.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(unavailable.code(), "CS_STORE_UNAVAILABLE");

        assert_eq!(ApiError::DumpInProgress.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_error_body() {
        let body = ErrorResponse::from(&ApiError::DumpInProgress);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "CS_DUMP_IN_PROGRESS");
        assert_eq!(json["status"], 409);
    }
}
