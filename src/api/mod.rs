//! HTTP API.
//!
//! Exposes the analysis pipeline to the upload client. Routes are nested
//! under `/api/` and wrapped by a CORS layer that admits any origin.
//!
//! `analysis_router()` returns a `Router` that can be mounted on any axum
//! server instance.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::analysis_router;
pub use server::{start_server, AnalysisServer, ServerError, ServerSession};
pub use types::ApiContext;
