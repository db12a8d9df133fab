//! API key authentication trait and implementation.

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::{api_key_error, ApiKeyErrorKind, Error};

/// Known API key providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyProvider {
    Gemini,
}

impl ApiKeyProvider {
    /// Get the provider identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiKeyProvider::Gemini => "gemini",
        }
    }

    /// Header that carries the key for this provider.
    pub fn header_name(&self) -> &'static str {
        match self {
            ApiKeyProvider::Gemini => "x-goog-api-key",
        }
    }

    /// Lightweight authenticated endpoint used to check a key, relative to the base URL.
    fn verification_path(&self) -> &'static str {
        match self {
            ApiKeyProvider::Gemini => "/v1beta/models?pageSize=1",
        }
    }
}

/// Trait for authenticating HTTP requests with API keys.
///
/// Implementations handle provider-specific authentication patterns like:
/// - Gemini: `x-goog-api-key: xxx`
#[async_trait]
pub trait ProviderAuth: Send + Sync {
    /// Get the provider identifier.
    fn provider(&self) -> ApiKeyProvider;

    /// Apply authentication to a request builder.
    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder;

    /// Verify that the credentials are valid by making a test request.
    /// Returns `true` if credentials are valid, `false` otherwise.
    async fn verify_credentials(&self) -> Result<bool, Error>;
}

/// API key authentication implementation.
///
/// # Examples
///
/// ```rust,ignore
/// // Gemini: x-goog-api-key: xxx
/// let auth = ApiKeyAuth::new(
///     ApiKeyProvider::Gemini,
///     SecretString::from("api_key_here".to_string()),
/// )?
/// .with_base_url("https://generativelanguage.googleapis.com");
/// ```
pub struct ApiKeyAuth {
    provider: ApiKeyProvider,
    api_key: SecretString,
    header_name: String,
    base_url: Option<String>,
}

impl ApiKeyAuth {
    /// Create a new API key authenticator.
    ///
    /// Blank keys are rejected so a missing `GEMINI_API_KEY` fails before any
    /// request is sent.
    pub fn new(provider: ApiKeyProvider, api_key: SecretString) -> Result<Self, Error> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(api_key_error(
                ApiKeyErrorKind::Missing,
                &format!("No API key configured for {}", provider.as_str()),
            ));
        }

        Ok(Self {
            provider,
            api_key,
            header_name: provider.header_name().to_string(),
            base_url: None,
        })
    }

    /// Set the API base URL used for credential verification.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.trim_end_matches('/').to_string());
        self
    }
}

#[async_trait]
impl ProviderAuth for ApiKeyAuth {
    fn provider(&self) -> ApiKeyProvider {
        self.provider
    }

    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(&self.header_name, self.api_key.expose_secret())
    }

    async fn verify_credentials(&self) -> Result<bool, Error> {
        let base_url = self.base_url.as_deref().ok_or_else(|| {
            api_key_error(
                ApiKeyErrorKind::VerificationFailed,
                "No base URL configured for credential verification",
            )
        })?;
        let url = format!("{}{}", base_url, self.provider.verification_path());

        let response = self
            .authenticate(reqwest::Client::new().get(&url))
            .send()
            .await
            .map_err(|e| Error {
                source: Some(Box::new(e)),
                error_kind: crate::ErrorKind::ApiKey(ApiKeyErrorKind::Network),
            })?;

        let status = response.status();
        debug!("{} key verification returned {}", self.provider.as_str(), status);
        match status {
            s if s.is_success() => Ok(true),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Ok(false)
            }
            s => Err(api_key_error(
                ApiKeyErrorKind::VerificationFailed,
                &format!("Unexpected status {} while verifying key", s),
            )),
        }
    }
}
