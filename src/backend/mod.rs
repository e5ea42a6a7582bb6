//! Inference backend abstraction
//!
//! The resolver and the catalog never talk HTTP themselves. They go through
//! [`InferenceBackend`], which keeps them testable with scripted backends and
//! leaves the wire format to [`OllamaClient`].

pub mod ollama;

pub use ollama::OllamaClient;

use crate::analysis::{AnalysisError, AnalysisRequest};
use crate::resolver::{Endpoint, ProbeFailure};
use async_trait::async_trait;

/// Request layer consumed by the core
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Fetch the raw model listing from an endpoint
    ///
    /// Doubles as the liveness probe: any `Ok` means the endpoint speaks the
    /// listing protocol. The payload shape is interpreted by the catalog.
    async fn list(&self, endpoint: &Endpoint) -> Result<serde_json::Value, ProbeFailure>;

    /// Run a single non-streaming generation with one image attached
    async fn generate(
        &self,
        endpoint: &Endpoint,
        request: &AnalysisRequest,
    ) -> Result<String, AnalysisError>;
}
