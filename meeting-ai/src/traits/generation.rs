//! Document generation provider trait.

use crate::error::UpstreamError;
use crate::types::generation::{Document, GenerationRequest};
use async_trait::async_trait;

/// Abstraction for generative services that turn a prompt plus media artifacts
/// into a document.
///
/// Implementations own the transport: uploading local artifacts, calling the
/// model, and mapping native failures onto [`UpstreamError`] so the generator
/// can classify them. A single call must be safe to repeat; the generator
/// re-invokes it with the same request on transient failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Run one generation attempt for the request.
    ///
    /// Artifacts already uploaded by a previous attempt may be reused.
    async fn generate(&self, request: &GenerationRequest) -> Result<Document, UpstreamError>;

    /// Count the tokens the service would charge for the prompt text alone.
    async fn count_tokens(&self, model: &str, prompt: &str) -> Result<u64, UpstreamError>;

    /// Delete any remote copies of artifacts created by earlier calls.
    ///
    /// Returns how many remote files were removed.
    async fn release(&self) -> Result<usize, UpstreamError>;

    /// Return unique identifier for this provider (e.g., "gemini").
    fn provider_id(&self) -> &str;
}
