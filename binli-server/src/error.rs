//! Error responses of the HTTP API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use binli_core::ValidationError;

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    /// Human-readable message.
    pub error: String,
    /// Request field that failed validation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

/// Failure of a handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A field failed validation; nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The request body was not usable JSON.
    #[error("{0}")]
    MalformedBody(String),
    /// The store or change feed failed. Carries the client-facing message.
    #[error("{0}")]
    Storage(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, field) = match self {
            ApiError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string(), Some(err.field())),
            ApiError::MalformedBody(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Storage(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.to_owned(), None),
        };

        let body = ErrorBody {
            success: false,
            error,
            field,
        };
        (status, Json(body)).into_response()
    }
}
