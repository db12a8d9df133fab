//! HTTP client building with authentication.

mod client;

pub use client::{AuthenticatedClient, AuthenticatedClientBuilder, HttpClientConfig};
