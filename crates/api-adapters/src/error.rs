//! # API Error Mapping
//!
//! Domain failures become JSON error responses. Infrastructure details are
//! logged and never echoed to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::Error;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    /// No usable identity headers on the request.
    Unauthorized,
    /// The principal's role does not grant access to this route.
    Forbidden,
    Domain(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Domain(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            ApiError::Domain(err) => match &err {
                Error::NotFound(..) => (StatusCode::NOT_FOUND, err.to_string()),
                Error::Validation(_) | Error::DuplicateReport { .. } => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                Error::AlreadySettled(_) => (StatusCode::CONFLICT, err.to_string()),
                Error::Forbidden(_) => (StatusCode::FORBIDDEN, err.to_string()),
                Error::Transaction(_) => {
                    tracing::warn!(error = %err, "moderation action rolled back");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "action failed, please retry".to_string(),
                    )
                }
                Error::Store(_) => {
                    tracing::error!(error = %err, "content store failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal error".to_string(),
                    )
                }
            },
        };
        (status, Json(json!({ "msg": msg }))).into_response()
    }
}
