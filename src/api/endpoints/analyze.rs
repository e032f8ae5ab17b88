//! Image analysis endpoint.
//!
//! `POST /api/analyze`: multipart upload with one file under `image`.
//! Other fields are ignored.

use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::analysis::{AnalysisResult, UploadedImage};

/// Multipart field carrying the photo.
pub const IMAGE_FIELD: &str = "image";

/// `POST /api/analyze`: extract date and test items from a checkup photo.
pub async fn analyze(
    State(ctx): State<ApiContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let image = match multipart {
        Ok(multipart) => read_image_field(multipart).await?,
        Err(rejection) => {
            tracing::warn!(%rejection, "Analyze request is not multipart");
            None
        }
    };

    let result = ctx.analysis.analyze(image).await?;
    Ok(Json(result))
}

/// Pull the first `image` field out of the form.
///
/// A malformed body yields `None` so the pipeline reports missing input.
/// Hitting the body limit is reported as too large.
async fn read_image_field(mut multipart: Multipart) -> Result<Option<UploadedImage>, ApiError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => return field_error(e),
        };

        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let declared_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().unwrap_or("").to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return field_error(e),
        };

        tracing::debug!(
            file_name = %file_name,
            declared_type = declared_type.as_deref().unwrap_or(""),
            size = bytes.len(),
            "Image field received"
        );

        return Ok(Some(UploadedImage::new(
            bytes.to_vec(),
            declared_type.as_deref(),
        )));
    }
}

fn field_error(e: MultipartError) -> Result<Option<UploadedImage>, ApiError> {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!(error = %e, "Upload exceeds body limit");
        return Err(ApiError::PayloadTooLarge);
    }
    tracing::warn!(error = %e, "Failed to read multipart body");
    Ok(None)
}
