//! Error types for the `meeting-auth` crate.
//!
//! Follows the same pattern as domain::error with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for meeting-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in meeting-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    ApiKey(ApiKeyErrorKind),
    Http(HttpErrorKind),
}

/// Errors from API key authentication operations.
#[derive(Debug, PartialEq)]
pub enum ApiKeyErrorKind {
    Missing,
    InvalidFormat,
    VerificationFailed,
    Network,
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::ApiKey(kind) => write!(f, "API key error: {:?}", kind)?,
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind)?,
        }
        if let Some(source) = &self.source {
            write!(f, " ({})", source)?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

/// Helper function to create API key errors.
pub fn api_key_error(kind: ApiKeyErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::ApiKey(kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_source_message() {
        let err = api_key_error(ApiKeyErrorKind::Missing, "GEMINI_API_KEY is not set");
        assert_eq!(
            err.to_string(),
            "API key error: Missing (GEMINI_API_KEY is not set)"
        );
        assert!(err.source().is_some());
    }
}
