//! Shared types for the API layer.

use std::sync::Arc;

use crate::pipeline::analysis::AnalysisService;

/// Shared context for all API routes. Read-only after construction.
#[derive(Clone)]
pub struct ApiContext {
    pub analysis: Arc<AnalysisService>,
    pub max_upload_bytes: usize,
}

impl ApiContext {
    pub fn new(analysis: Arc<AnalysisService>, max_upload_bytes: usize) -> Self {
        Self {
            analysis,
            max_upload_bytes,
        }
    }
}
