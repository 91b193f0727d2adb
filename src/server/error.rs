//! HTTP mapping for [`AppError`].

use crate::errors::AppError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Db(_) | AppError::Storage(_) | AppError::Migration(_) | AppError::Io(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Transport(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error, details) = match &self {
            AppError::Validation { field, reason } => {
                (format!("invalid {field}"), Some(reason.clone()))
            }
            AppError::Unauthorized => ("authentication required".to_string(), None),
            AppError::Forbidden(why) => ("forbidden".to_string(), Some(why.clone())),
            AppError::NotFound { entity, id } => (format!("{entity} not found"), Some(id.clone())),
            _ => {
                // Internal details stay in the server log.
                tracing::error!(error = %self, "request failed");
                let msg = if status == StatusCode::SERVICE_UNAVAILABLE {
                    "storage temporarily unavailable"
                } else {
                    "internal error"
                };
                (msg.to_string(), None)
            }
        };

        let body = ErrorResponse {
            error,
            code: self.code().to_string(),
            details,
            retryable: self.is_retryable(),
        };

        (status, Json(body)).into_response()
    }
}
