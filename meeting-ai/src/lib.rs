//! Meeting AI resilience layer for document generation providers.
//!
//! This crate owns everything that sits between a processing run and the
//! generative service:
//! - A limits registry holding per-model resource budgets and parameter defaults
//! - Parameter clamping and artifact budget checks
//! - Classification of upstream failures into retryable and fatal
//! - A resilient generator that retries transient unavailability with
//!   exponential backoff and cleans up run artifacts on failure
//!
//! The design is provider-agnostic: the generator drives any implementation of
//! [`traits::generation::Provider`], so the HTTP adapter lives elsewhere.

pub mod cleanup;
pub mod error;
pub mod generator;
pub mod limits;
pub mod retry;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use cleanup::CleanupSet;
pub use error::{
    classify, BudgetError, BudgetKind, ConfigurationError, ErrorClass, GenerationError,
    UpstreamError,
};
pub use generator::{GenerationJob, Generator};
pub use limits::Registry;
pub use retry::{BackoffSchedule, RetryState};
