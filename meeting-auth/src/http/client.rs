//! Authenticated HTTP client builder.

use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use tracing::debug;

use crate::api_key::ProviderAuth;
use crate::error::{api_key_error, ApiKeyErrorKind, Error};

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            connect_timeout: Duration::from_secs(30),
            user_agent: format!("meeting-auth/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client that applies provider authentication to every request.
///
/// Performs no retries of its own.
pub struct AuthenticatedClient {
    client: reqwest::Client,
    auth: Box<dyn ProviderAuth>,
}

impl AuthenticatedClient {
    /// Start an authenticated request.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.auth.authenticate(self.client.request(method, url))
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn delete(&self, url: &str) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    pub fn auth(&self) -> &dyn ProviderAuth {
        self.auth.as_ref()
    }
}

/// Builder for creating authenticated HTTP clients.
///
/// Provides a fluent API for constructing HTTP clients with:
/// - Authentication (API keys)
/// - Timeout configuration
/// - User agent
pub struct AuthenticatedClientBuilder {
    config: HttpClientConfig,
    auth: Option<Box<dyn ProviderAuth>>,
}

impl AuthenticatedClientBuilder {
    /// Create a new client builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
            auth: None,
        }
    }

    /// Set the authentication provider.
    pub fn with_auth(mut self, auth: Box<dyn ProviderAuth>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.config.connect_timeout = connect_timeout;
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.config.user_agent = user_agent;
        self
    }

    /// Build the configured HTTP client.
    ///
    /// Fails when no authentication provider was set.
    pub fn build(self) -> Result<AuthenticatedClient, Error> {
        let auth = self.auth.ok_or_else(|| {
            api_key_error(
                ApiKeyErrorKind::Missing,
                "An authentication provider is required to build the client",
            )
        })?;

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(self.config.timeout)
            .connect_timeout(self.config.connect_timeout)
            .user_agent(self.config.user_agent)
            .build()?;

        debug!(
            "Built HTTP client for {} with {:?} timeout",
            auth.provider().as_str(),
            self.config.timeout
        );

        Ok(AuthenticatedClient { client, auth })
    }
}

impl Default for AuthenticatedClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_key::{ApiKeyAuth, ApiKeyProvider};
    use secrecy::SecretString;

    fn gemini_auth() -> Box<dyn ProviderAuth> {
        Box::new(
            ApiKeyAuth::new(
                ApiKeyProvider::Gemini,
                SecretString::from("test_key".to_string()),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_builder_default() {
        let builder = AuthenticatedClientBuilder::new();
        assert_eq!(builder.config.timeout, Duration::from_secs(600));
        assert_eq!(builder.config.connect_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_builder_with_timeout() {
        let builder = AuthenticatedClientBuilder::new().with_timeout(Duration::from_secs(60));
        assert_eq!(builder.config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_build_without_auth_fails() {
        assert!(AuthenticatedClientBuilder::new().build().is_err());
    }

    #[tokio::test]
    async fn test_requests_carry_api_key_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.5-pro:countTokens")
            .match_header("x-goog-api-key", "test_key")
            .with_status(200)
            .with_body(r#"{"totalTokens": 3}"#)
            .create_async()
            .await;

        let client = AuthenticatedClientBuilder::new()
            .with_auth(gemini_auth())
            .build()
            .unwrap();
        let url = format!("{}/v1beta/models/gemini-2.5-pro:countTokens", server.url());
        let response = client.post(&url).send().await.unwrap();

        assert!(response.status().is_success());
        mock.assert_async().await;
    }
}
