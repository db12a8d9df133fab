//! Resilient document generation.
//!
//! [`Generator`] drives a [`Provider`] to completion despite transient service
//! unavailability. It never sends an artifact set that exceeds the model's
//! budget, retries only failures classified as retryable, and runs the run's
//! [`CleanupSet`] on every failure path before returning.

use log::*;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cleanup::CleanupSet;
use crate::error::{classify, ErrorClass, GenerationError};
use crate::limits::Registry;
use crate::retry::{BackoffSchedule, RetryState};
use crate::traits::generation::Provider;
use crate::types::artifact::ArtifactSet;
use crate::types::generation::{Document, GenerationRequest};
use crate::types::limits::GenerationParameters;

/// Input of one generation call.
#[derive(Debug, Clone, Default)]
pub struct GenerationJob {
    pub model: String,
    pub prompt: String,
    pub artifacts: ArtifactSet,
    pub overrides: GenerationParameters,
}

/// Retrying orchestrator around a generation provider.
pub struct Generator<P: Provider> {
    registry: Arc<Registry>,
    provider: P,
    schedule: BackoffSchedule,
    cancel: CancellationToken,
}

impl<P: Provider> Generator<P> {
    /// Create a generator with the default 1–16 minute backoff schedule.
    pub fn new(registry: Arc<Registry>, provider: P) -> Self {
        Self {
            registry,
            provider,
            schedule: BackoffSchedule::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_schedule(mut self, schedule: BackoffSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Abort backoff waits when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Generate a document for `job`.
    ///
    /// On any failure the paths recorded in `cleanup` are removed before the
    /// error is returned. On success `cleanup` is left untouched.
    pub async fn generate(
        &self,
        job: &GenerationJob,
        cleanup: &mut CleanupSet,
    ) -> Result<Document, GenerationError> {
        match self.generate_with_retry(job).await {
            Ok(document) => Ok(document),
            Err(err) => {
                error!("Generation failed: {}", err);
                let report = cleanup.run();
                if !report.failed.is_empty() {
                    warn!(
                        "{} path(s) could not be cleaned up",
                        report.failed.len()
                    );
                }
                Err(err)
            }
        }
    }

    async fn generate_with_retry(&self, job: &GenerationJob) -> Result<Document, GenerationError> {
        let limits = self.registry.resolve(&job.model)?;
        self.registry.check_artifact_budget(&job.artifacts, limits)?;

        let (parameters, warnings) = self.registry.validate_parameters(&job.overrides, limits);
        for warning in &warnings {
            warn!("{}", warning);
        }
        info!("Using max_output_tokens: {}", parameters.max_output_tokens);
        info!(
            "Using parameters: temperature={}, top_p={}, top_k={}, candidate_count={}",
            parameters.temperature, parameters.top_p, parameters.top_k, parameters.candidate_count
        );

        let request = GenerationRequest {
            model: job.model.clone(),
            prompt: job.prompt.clone(),
            artifacts: job.artifacts.clone(),
            parameters,
        };

        let mut state = RetryState::new(self.schedule.clone());
        loop {
            if self.cancel.is_cancelled() {
                return Err(GenerationError::Cancelled {
                    attempts: state.attempt() - 1,
                });
            }

            debug!(
                "Generating content with {} (attempt {}/{})",
                request.model,
                state.attempt(),
                state.max_attempts()
            );

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    warn!("Generation interrupted during attempt {}", state.attempt());
                    return Err(GenerationError::Cancelled {
                        attempts: state.attempt(),
                    });
                }
                outcome = self.provider.generate(&request) => outcome,
            };

            let err = match outcome {
                Ok(mut document) => {
                    document.attempts = state.attempt();
                    return Ok(document);
                }
                Err(err) => err,
            };

            match classify(&err) {
                ErrorClass::Retryable if state.has_attempts_left() => {
                    let wait = state.next_wait();
                    warn!(
                        "503 UNAVAILABLE error (attempt {}/{}). Retrying in {} seconds...",
                        state.attempt(),
                        state.max_attempts(),
                        wait.as_secs_f64()
                    );

                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => {
                            warn!("Retry wait interrupted, abandoning generation");
                            return Err(GenerationError::Cancelled {
                                attempts: state.attempt(),
                            });
                        }
                        _ = tokio::time::sleep(wait) => {}
                    }
                    state.advance();
                }
                ErrorClass::Retryable => {
                    error!(
                        "All {} attempts failed with 503 UNAVAILABLE error",
                        state.max_attempts()
                    );
                    return Err(GenerationError::Exhausted {
                        attempts: state.attempt(),
                        last_error: err,
                    });
                }
                ErrorClass::Fatal => {
                    error!("Non-retryable error: {}", err);
                    return Err(GenerationError::Fatal(err));
                }
            }
        }
    }
}
