use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Raster context unavailable: {0}")]
    ContextError(String),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for SignatureError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            SignatureError::DecodeError(_) => (StatusCode::UNPROCESSABLE_ENTITY, "DECODE_ERROR"),
            SignatureError::ContextError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONTEXT_ERROR"),
            SignatureError::UnknownPreset(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_PRESET"),
            SignatureError::ImageTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE")
            }
            SignatureError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            SignatureError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            SignatureError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
