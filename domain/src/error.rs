//! Error types for the `domain` layer.
use crate::media::ToolError;
use meeting_ai::{ConfigurationError, GenerationError};
use meeting_auth::error::{Error as MeetingAuthError, ErrorKind as MeetingAuthErrorKind};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. Lower layers (`meeting-ai`, `meeting-auth`, the media tools) keep
/// their own error types; they are translated here so the binary only needs to
/// know about `domain::error::Error`.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Config,
    Io,
    Template,
    Tool,
    Budget,
    Cancelled,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    Upstream,
}

impl Error {
    pub fn internal(kind: InternalErrorKind, message: impl Into<String>) -> Self {
        Error {
            source: Some(message.into().into()),
            error_kind: DomainErrorKind::Internal(kind),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.error_kind == DomainErrorKind::Internal(InternalErrorKind::Cancelled)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "Domain Error: {:?}: {}", self.error_kind, source),
            None => write!(f, "Domain Error: {:?}", self.error_kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Io),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

impl From<ToolError> for Error {
    fn from(err: ToolError) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Tool),
        }
    }
}

impl From<ConfigurationError> for Error {
    fn from(err: ConfigurationError) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        }
    }
}

impl From<GenerationError> for Error {
    fn from(err: GenerationError) -> Self {
        let error_kind = match &err {
            GenerationError::Configuration(_) => {
                DomainErrorKind::Internal(InternalErrorKind::Config)
            }
            GenerationError::BudgetExceeded(_) => {
                DomainErrorKind::Internal(InternalErrorKind::Budget)
            }
            GenerationError::Cancelled { .. } => {
                DomainErrorKind::Internal(InternalErrorKind::Cancelled)
            }
            GenerationError::Fatal(_) | GenerationError::Exhausted { .. } => {
                DomainErrorKind::External(ExternalErrorKind::Upstream)
            }
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<MeetingAuthError> for Error {
    fn from(err: MeetingAuthError) -> Self {
        let error_kind = match &err.error_kind {
            MeetingAuthErrorKind::Http(_) => DomainErrorKind::External(ExternalErrorKind::Network),
            MeetingAuthErrorKind::ApiKey(_) => DomainErrorKind::Internal(InternalErrorKind::Config),
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}
