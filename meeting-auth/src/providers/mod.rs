//! Pre-defined provider configurations.

mod config;

pub use config::{gemini_config, ProviderConfig, GEMINI_BASE_URL};
