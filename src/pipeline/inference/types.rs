use async_trait::async_trait;

use super::InferenceError;
use crate::pipeline::analysis::ExtractionRequest;

/// Vision-language inference: one image plus one instruction in, free text out.
///
/// Implementations are shared across concurrent requests behind an `Arc`
/// and must not keep per-request state.
#[async_trait]
pub trait VisionClient: Send + Sync {
    async fn infer(&self, request: &ExtractionRequest) -> Result<String, InferenceError>;

    /// Model identifier, reported by the health endpoint and in logs.
    fn model_name(&self) -> &str;
}
