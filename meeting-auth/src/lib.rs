//! # meeting-auth
//!
//! Authentication for the generative AI services the meeting processor talks to:
//! - API key authentication for service providers (Google Gemini)
//! - HTTP client building with authentication applied to every request
//! - Pre-configured provider endpoints
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meeting_auth::{
//!     api_key::{ApiKeyAuth, ApiKeyProvider},
//!     http::AuthenticatedClientBuilder,
//! };
//! ```

pub mod api_key;
pub mod error;
pub mod http;
pub mod providers;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
