//! Error types for meeting AI operations.

use std::fmt;

/// Invalid or missing model limits configuration.
///
/// Raised while loading the limits document or resolving a model that the
/// document does not declare. Always fatal and never retried.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// The limits document could not be read from disk.
    Unreadable { path: String, reason: String },

    /// The limits document is not valid JSON or is missing required fields.
    Malformed(String),

    /// A numeric bound that must be strictly positive is zero or negative.
    NonPositive {
        model: String,
        field: &'static str,
        value: f64,
    },

    /// The requested model is not declared in the loaded configuration.
    UnknownModel(String),
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::Unreadable { path, reason } => {
                write!(f, "Could not read model limits from {}: {}", path, reason)
            }
            ConfigurationError::Malformed(msg) => write!(f, "Malformed model limits: {}", msg),
            ConfigurationError::NonPositive {
                model,
                field,
                value,
            } => write!(
                f,
                "Model {} declares non-positive {}: {}",
                model, field, value
            ),
            ConfigurationError::UnknownModel(model) => {
                write!(f, "No limits configured for model {}", model)
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// The artifact budget that was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetKind {
    ImageCount,
    ImageSize,
    AudioCount,
    AudioDuration,
}

impl BudgetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetKind::ImageCount => "max_images_per_prompt",
            BudgetKind::ImageSize => "max_image_size_mb",
            BudgetKind::AudioCount => "max_audio_files_per_prompt",
            BudgetKind::AudioDuration => "max_audio_length_hours",
        }
    }
}

/// An artifact set violates one of the model's declared maximums.
///
/// `limit` and `actual` are expressed in the unit of the budget: a count for
/// `ImageCount`/`AudioCount`, megabytes for `ImageSize` and hours for
/// `AudioDuration`.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetError {
    pub kind: BudgetKind,
    pub limit: f64,
    pub actual: f64,
}

impl fmt::Display for BudgetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Artifact budget {} exceeded: {} > {}",
            self.kind.as_str(),
            self.actual,
            self.limit
        )
    }
}

impl std::error::Error for BudgetError {}

/// Failure reported by an upstream generation provider.
///
/// Different surfaces of the service describe the same condition in different
/// shapes, so providers map their native failures onto this small tagged set
/// and [`classify`] decides what is worth retrying.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamError {
    /// Structured error body: HTTP code, RPC status name and message.
    Status {
        code: u16,
        status: Option<String>,
        message: String,
    },

    /// Non-success response whose body could not be parsed.
    Malformed { code: Option<u16>, body: String },

    /// Error that only carries a free-form details string.
    Details(String),

    /// Connection, DNS or timeout failure before a response arrived.
    Transport(String),

    /// The service answered successfully but produced no text.
    EmptyResponse,

    /// Anything a provider could not map to a known shape.
    Other(String),
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::Status {
                code,
                status,
                message,
            } => match status {
                Some(status) => write!(f, "{} {}: {}", code, status, message),
                None => write!(f, "{}: {}", code, message),
            },
            UpstreamError::Malformed { code, body } => match code {
                Some(code) => write!(f, "{} with unreadable body: {}", code, body),
                None => write!(f, "Unreadable response: {}", body),
            },
            UpstreamError::Details(details) => write!(f, "Upstream error: {}", details),
            UpstreamError::Transport(msg) => write!(f, "Transport error: {}", msg),
            UpstreamError::EmptyResponse => write!(f, "Empty response from generation service"),
            UpstreamError::Other(msg) => write!(f, "Upstream error: {}", msg),
        }
    }
}

impl std::error::Error for UpstreamError {}

/// Whether an upstream failure is worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Retryable,
    Fatal,
}

const UNAVAILABLE_CODE: u16 = 503;
const UNAVAILABLE_STATUS: &str = "UNAVAILABLE";

/// Classify an upstream failure.
///
/// Only the transient "service unavailable" condition is retryable. It is
/// checked on every shape before anything else, so a 503 with a truncated or
/// unparsable body still retries. Unknown shapes are fatal.
pub fn classify(err: &UpstreamError) -> ErrorClass {
    let retryable = match err {
        UpstreamError::Status {
            code,
            status,
            message,
        } => {
            *code == UNAVAILABLE_CODE
                || status.as_deref() == Some(UNAVAILABLE_STATUS)
                || message.contains("503")
        }
        UpstreamError::Malformed { code, body } => {
            *code == Some(UNAVAILABLE_CODE) || mentions_unavailable(body)
        }
        UpstreamError::Details(details) => details.contains("503"),
        UpstreamError::Other(msg) => mentions_unavailable(msg),
        UpstreamError::Transport(_) | UpstreamError::EmptyResponse => false,
    };

    if retryable {
        ErrorClass::Retryable
    } else {
        ErrorClass::Fatal
    }
}

fn mentions_unavailable(text: &str) -> bool {
    text.contains("503") && text.contains(UNAVAILABLE_STATUS)
}

/// Terminal outcome of a failed generation call.
#[derive(Debug)]
pub enum GenerationError {
    /// The model is not configured.
    Configuration(ConfigurationError),

    /// The artifact set exceeds the model's budget; no upstream call was made.
    BudgetExceeded(BudgetError),

    /// Non-retryable upstream rejection, details preserved.
    Fatal(UpstreamError),

    /// Every attempt failed with a transient error.
    Exhausted {
        attempts: u32,
        last_error: UpstreamError,
    },

    /// An external interruption arrived while waiting to retry.
    Cancelled { attempts: u32 },
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Configuration(err) => write!(f, "Invalid configuration: {}", err),
            GenerationError::BudgetExceeded(err) => write!(f, "{}", err),
            GenerationError::Fatal(err) => write!(f, "Non-retryable error: {}", err),
            GenerationError::Exhausted {
                attempts,
                last_error,
            } => write!(
                f,
                "All {} attempts failed, last error: {}",
                attempts, last_error
            ),
            GenerationError::Cancelled { attempts } => {
                write!(f, "Cancelled after {} attempt(s)", attempts)
            }
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerationError::Configuration(err) => Some(err),
            GenerationError::BudgetExceeded(err) => Some(err),
            GenerationError::Fatal(err) => Some(err),
            GenerationError::Exhausted { last_error, .. } => Some(last_error),
            GenerationError::Cancelled { .. } => None,
        }
    }
}

impl From<ConfigurationError> for GenerationError {
    fn from(err: ConfigurationError) -> Self {
        GenerationError::Configuration(err)
    }
}

impl From<BudgetError> for GenerationError {
    fn from(err: BudgetError) -> Self {
        GenerationError::BudgetExceeded(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16, status: Option<&str>, message: &str) -> UpstreamError {
        UpstreamError::Status {
            code,
            status: status.map(str::to_string),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_status_503_is_retryable() {
        assert_eq!(
            classify(&status(503, None, "overloaded")),
            ErrorClass::Retryable
        );
    }

    #[test]
    fn test_unavailable_status_name_is_retryable() {
        assert_eq!(
            classify(&status(500, Some("UNAVAILABLE"), "try later")),
            ErrorClass::Retryable
        );
    }

    #[test]
    fn test_message_mentioning_503_is_retryable() {
        assert_eq!(
            classify(&status(500, Some("INTERNAL"), "backend returned 503")),
            ErrorClass::Retryable
        );
    }

    #[test]
    fn test_authentication_failure_is_fatal() {
        assert_eq!(
            classify(&status(401, Some("UNAUTHENTICATED"), "API key not valid")),
            ErrorClass::Fatal
        );
        assert_eq!(
            classify(&status(400, Some("INVALID_ARGUMENT"), "token limit exceeded")),
            ErrorClass::Fatal
        );
    }

    #[test]
    fn test_malformed_503_body_is_still_retryable() {
        let err = UpstreamError::Malformed {
            code: Some(503),
            body: "<html><body>Service Unav".to_string(),
        };
        assert_eq!(classify(&err), ErrorClass::Retryable);
    }

    #[test]
    fn test_malformed_without_code_needs_both_markers() {
        let both = UpstreamError::Malformed {
            code: None,
            body: "503 UNAVAILABLE".to_string(),
        };
        let only_code = UpstreamError::Malformed {
            code: None,
            body: "error 503".to_string(),
        };
        assert_eq!(classify(&both), ErrorClass::Retryable);
        assert_eq!(classify(&only_code), ErrorClass::Fatal);
    }

    #[test]
    fn test_details_and_other_shapes() {
        assert_eq!(
            classify(&UpstreamError::Details("code=503".to_string())),
            ErrorClass::Retryable
        );
        assert_eq!(
            classify(&UpstreamError::Other("503 UNAVAILABLE".to_string())),
            ErrorClass::Retryable
        );
        assert_eq!(
            classify(&UpstreamError::Other("something odd".to_string())),
            ErrorClass::Fatal
        );
    }

    #[test]
    fn test_transport_and_empty_are_fatal() {
        assert_eq!(
            classify(&UpstreamError::Transport("connection refused".to_string())),
            ErrorClass::Fatal
        );
        assert_eq!(classify(&UpstreamError::EmptyResponse), ErrorClass::Fatal);
    }

    #[test]
    fn test_budget_error_display_names_the_budget() {
        let err = BudgetError {
            kind: BudgetKind::ImageCount,
            limit: 3000.0,
            actual: 3001.0,
        };
        assert_eq!(
            err.to_string(),
            "Artifact budget max_images_per_prompt exceeded: 3001 > 3000"
        );
    }
}
