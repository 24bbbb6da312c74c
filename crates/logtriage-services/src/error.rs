//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use logtriage_types::TriageError;

/// Errors returned by API handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A pipeline or lifecycle failure.
    #[error(transparent)]
    Triage(#[from] TriageError),

    /// The requested resource does not exist.
    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Triage(TriageError::Validation { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Triage(TriageError::Training { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Triage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal failures are not described.
    fn detail(&self) -> String {
        match self {
            ApiError::Triage(TriageError::Validation { reason })
            | ApiError::Triage(TriageError::Training { reason }) => reason.clone(),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::Triage(_) => "internal server error".into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "detail": self.detail() }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
