//! API error types with structured JSON responses.
//!
//! Body shape is `{error, details?, raw?}`. The `error` string is shown to
//! the user verbatim by the upload client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::analysis::AnalysisError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No image file provided")]
    MissingInput,
    #[error("Image file too large")]
    PayloadTooLarge,
    #[error("Failed to analyze image: {0}")]
    AnalysisFailed(String),
    #[error("Failed to extract JSON from response")]
    UnparsableReply { raw: String },
    #[error("Invalid response format from AI: {0}")]
    InvalidResultShape(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::MissingInput => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "No image file provided",
                    details: None,
                    raw: None,
                },
            ),
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorBody {
                    error: "Image file too large",
                    details: None,
                    raw: None,
                },
            ),
            ApiError::AnalysisFailed(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Failed to analyze image",
                    details: Some(details),
                    raw: None,
                },
            ),
            // The raw reply is the user's own document text, returned for diagnosis.
            ApiError::UnparsableReply { raw } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Failed to extract JSON from response",
                    details: None,
                    raw: Some(raw),
                },
            ),
            ApiError::InvalidResultShape(detail) => {
                tracing::debug!(detail = %detail, "Shape violation withheld from client");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Invalid response format from AI",
                        details: None,
                        raw: None,
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::MissingInput => ApiError::MissingInput,
            AnalysisError::Upstream(e) => ApiError::AnalysisFailed(e.to_string()),
            AnalysisError::UnparsableReply { raw, .. } => ApiError::UnparsableReply { raw },
            AnalysisError::MalformedReply(detail) => ApiError::AnalysisFailed(detail),
            AnalysisError::InvalidResultShape(detail) => ApiError::InvalidResultShape(detail),
        }
    }
}
