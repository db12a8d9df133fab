//! Meeting processing domain.
//!
//! Ties the pieces of a run together: recording date resolution, prompt
//! selection, the external media tools, the Gemini gateway and the
//! [`processor::Processor`] that drives a recording to `meeting.md`.
//! Lower layers are re-exported where the binary needs them so it only has
//! to depend on `domain`.

pub use meeting_ai::{BackoffSchedule, Generator, Registry};

pub mod error;
pub mod gateway;
pub mod media;
pub mod processor;
pub mod prompt;
pub mod recording_date;
