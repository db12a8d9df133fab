//! Adapters for external generative services.

pub mod gemini;
