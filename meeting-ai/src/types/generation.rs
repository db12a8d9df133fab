//! Types exchanged with a generation provider.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::artifact::ArtifactSet;
use super::limits::ValidatedParameters;

/// Everything a provider needs for one generation attempt.
///
/// Built once per generation call and reused unchanged across retries.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub artifacts: ArtifactSet,
    pub parameters: ValidatedParameters,
}

/// Document produced by a successful generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub text: String,
    pub model: String,
    /// Attempt on which the service answered, starting at 1.
    pub attempts: u32,
    pub generated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            attempts: 1,
            generated_at: Utc::now(),
        }
    }
}
