pub mod types;
pub mod prompt;
pub mod parser;
pub mod validation;
pub mod orchestrator;

pub use types::*;
pub use prompt::*;
pub use parser::*;
pub use validation::*;
pub use orchestrator::*;

use thiserror::Error;

use crate::pipeline::inference::InferenceError;

/// Terminal failure of one analysis request.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No image file provided")]
    MissingInput,

    #[error("Inference provider call failed: {0}")]
    Upstream(#[from] InferenceError),

    #[error("No JSON object in provider reply: {reason}")]
    UnparsableReply { raw: String, reason: String },

    #[error("Provider reply is not valid JSON: {0}")]
    MalformedReply(String),

    #[error("Invalid result shape: {0}")]
    InvalidResultShape(String),
}

impl AnalysisError {
    /// Short machine-readable kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::MissingInput => "missing_input",
            AnalysisError::Upstream(_) => "upstream_failure",
            AnalysisError::UnparsableReply { .. } => "unparsable_reply",
            AnalysisError::MalformedReply(_) => "malformed_reply",
            AnalysisError::InvalidResultShape(_) => "invalid_result_shape",
        }
    }
}
