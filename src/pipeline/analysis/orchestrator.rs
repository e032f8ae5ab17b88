//! Analysis pipeline: upload → encode → infer → extract → validate.
//!
//! One provider call per request, no retries. Every failure is terminal
//! and reported once as an `AnalysisError`.

use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;
use uuid::Uuid;

use super::parser::parse_reply;
use super::prompt::build_extraction_request;
use super::types::{AnalysisResult, UploadedImage};
use super::validation::validate_shape;
use super::AnalysisError;
use crate::pipeline::inference::VisionClient;

/// Runs the analysis pipeline against an injected vision client.
///
/// Holds no mutable state; one instance is shared by every in-flight
/// request.
pub struct AnalysisService {
    vision_client: Arc<dyn VisionClient>,
}

impl AnalysisService {
    pub fn new(vision_client: Arc<dyn VisionClient>) -> Self {
        Self { vision_client }
    }

    pub fn model_name(&self) -> &str {
        self.vision_client.model_name()
    }

    /// Analyze one uploaded image.
    ///
    /// An absent or zero-byte upload fails with `MissingInput` before the
    /// provider is contacted.
    pub async fn analyze(
        &self,
        image: Option<UploadedImage>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let image = match image {
            Some(image) if !image.is_empty() => image,
            _ => {
                tracing::warn!("Analysis rejected: no image payload");
                return Err(AnalysisError::MissingInput);
            }
        };

        let analysis_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "analyze_image",
            %analysis_id,
            model = %self.vision_client.model_name(),
            image_size = image.len(),
            mime_type = %image.mime_type,
        );

        self.run(image).instrument(span).await
    }

    async fn run(&self, image: UploadedImage) -> Result<AnalysisResult, AnalysisError> {
        let start = Instant::now();

        let request = build_extraction_request(&image);
        drop(image);

        let outcome = match self.vision_client.infer(&request).await {
            Ok(reply) => {
                tracing::debug!(reply_len = reply.len(), reply = %reply, "Provider reply received");
                parse_reply(&reply).and_then(validate_shape)
            }
            Err(e) => Err(AnalysisError::Upstream(e)),
        };

        let elapsed_ms = start.elapsed().as_millis();
        match &outcome {
            Ok(result) => tracing::info!(
                elapsed_ms = %elapsed_ms,
                item_count = result.items.len(),
                date = %result.date,
                "Analysis complete"
            ),
            Err(e) => tracing::error!(
                elapsed_ms = %elapsed_ms,
                kind = e.kind(),
                error = %e,
                "Analysis failed"
            ),
        }

        outcome
    }
}
