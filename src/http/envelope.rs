//! Engine errors rendered as JSON envelopes. Every error body carries
//! `"success": false`; validation failures carry the field-keyed message
//! map under `"errors"`, everything else a single `"error"` string.

use crate::core::error::EngineError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::EntityNotFound(_) | EngineError::RecordNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
            EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            EngineError::Locked(_) => StatusCode::TOO_MANY_REQUESTS,
            EngineError::TableMissing(_)
            | EngineError::Snapshot(_)
            | EngineError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = match self.0 {
            EngineError::Validation(errors) => json!({ "success": false, "errors": errors }),
            other => json!({ "success": false, "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
