//! Pre-configured provider settings.

use crate::api_key::ApiKeyProvider;

/// Default public endpoint of the Gemini API.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Provider configuration with endpoints and settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider identifier.
    pub provider: ApiKeyProvider,
    /// Base API URL.
    pub base_url: String,
    /// API version path segment.
    pub api_version: String,
}

impl ProviderConfig {
    /// URL of a versioned REST resource, e.g. `models/gemini-2.5-pro:generateContent`.
    pub fn resource_url(&self, resource: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.api_version, resource)
    }

    /// URL of the media upload endpoint for a versioned resource collection.
    pub fn upload_url(&self, collection: &str) -> String {
        format!("{}/upload/{}/{}", self.base_url, self.api_version, collection)
    }
}

/// Get Gemini configuration.
///
/// # Arguments
///
/// * `base_url` - API base URL, overridable to point at a mock server
pub fn gemini_config(base_url: &str) -> ProviderConfig {
    ProviderConfig {
        provider: ApiKeyProvider::Gemini,
        base_url: base_url.trim_end_matches('/').to_string(),
        api_version: "v1beta".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_config() {
        let config = gemini_config(GEMINI_BASE_URL);
        assert_eq!(config.provider, ApiKeyProvider::Gemini);
        assert_eq!(config.base_url, "https://generativelanguage.googleapis.com");
        assert_eq!(
            config.resource_url("models/gemini-2.5-pro:generateContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent"
        );
        assert_eq!(
            config.upload_url("files"),
            "https://generativelanguage.googleapis.com/upload/v1beta/files"
        );
    }

    #[test]
    fn test_gemini_config_trims_trailing_slash() {
        let config = gemini_config("http://127.0.0.1:1234/");
        assert_eq!(config.resource_url("files/abc"), "http://127.0.0.1:1234/v1beta/files/abc");
    }
}
