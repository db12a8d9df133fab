//! Google Gemini API client for document generation.
//!
//! This module provides an HTTP client for the Gemini REST API: resumable file
//! uploads, `generateContent`, `countTokens` and deletion of uploaded files.
//! It implements [`Provider`] so the resilient generator can drive it.

use async_trait::async_trait;
use log::*;
use meeting_ai::traits::generation::Provider;
use meeting_ai::types::artifact::{Artifact, ArtifactKind};
use meeting_ai::types::generation::{Document, GenerationRequest};
use meeting_ai::types::limits::ValidatedParameters;
use meeting_ai::UpstreamError;
use meeting_auth::api_key::{ApiKeyAuth, ApiKeyProvider};
use meeting_auth::http::{AuthenticatedClient, AuthenticatedClientBuilder};
use meeting_auth::providers::{gemini_config, ProviderConfig};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::Error;

/// Polls of a file still in `PROCESSING` state before giving up.
const MAX_STATE_POLLS: u32 = 60;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct CountTokensRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    File {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_p: f64,
    top_k: u32,
    candidate_count: u32,
    max_output_tokens: u32,
}

impl From<&ValidatedParameters> for GenerationConfig {
    fn from(parameters: &ValidatedParameters) -> Self {
        Self {
            temperature: parameters.temperature,
            top_p: parameters.top_p,
            top_k: parameters.top_k,
            candidate_count: parameters.candidate_count,
            max_output_tokens: parameters.max_output_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct StartUploadRequest {
    file: UploadMetadata,
}

#[derive(Debug, Serialize)]
struct UploadMetadata {
    display_name: String,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountTokensResponse {
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

/// A file stored in the Gemini Files API.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Resource name, e.g. `files/abc-123`.
    pub name: String,
    pub uri: String,
    pub mime_type: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

// =============================================================================
// Client
// =============================================================================

/// Gemini API client
pub struct GeminiClient {
    http: AuthenticatedClient,
    endpoints: ProviderConfig,
    /// Local path → remote file, in upload order. Reused across attempts.
    uploads: Mutex<Vec<(PathBuf, RemoteFile)>>,
    poll_interval: Duration,
}

impl GeminiClient {
    /// Create a new Gemini client with the given API key and base URL
    pub fn new(api_key: SecretString, base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let auth = ApiKeyAuth::new(ApiKeyProvider::Gemini, api_key)?.with_base_url(base_url);
        let http = AuthenticatedClientBuilder::new()
            .with_auth(Box::new(auth))
            .with_timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            endpoints: gemini_config(base_url),
            uploads: Mutex::new(Vec::new()),
            poll_interval: Duration::from_secs(2),
        })
    }

    /// Interval between checks of a file that is still being processed.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Verify the API key is valid by making a test request
    pub async fn verify_api_key(&self) -> Result<bool, Error> {
        Ok(self.http.auth().verify_credentials().await?)
    }

    /// Files uploaded so far and not yet released.
    pub fn uploaded_files(&self) -> Vec<RemoteFile> {
        self.uploads
            .lock()
            .map(|uploads| uploads.iter().map(|(_, file)| file.clone()).collect())
            .unwrap_or_default()
    }

    fn cached_upload(&self, artifact: &Artifact) -> Result<Option<RemoteFile>, UpstreamError> {
        let uploads = self.uploads.lock().map_err(|_| lock_poisoned())?;
        Ok(uploads
            .iter()
            .find(|(path, _)| path == &artifact.path)
            .map(|(_, file)| file.clone()))
    }

    /// Upload every artifact not uploaded by an earlier attempt and return the
    /// remote files in artifact order.
    ///
    /// Audio and video failures abort; image and text failures are logged and
    /// the artifact is left out.
    async fn ensure_uploaded(&self, request: &GenerationRequest) -> Result<Vec<RemoteFile>, UpstreamError> {
        let total = request.artifacts.len();
        let mut files = Vec::with_capacity(total);

        for (index, artifact) in request.artifacts.iter().enumerate() {
            if let Some(file) = self.cached_upload(artifact)? {
                debug!("Reusing uploaded {} for {}", file.name, artifact.display_name());
                files.push(file);
                continue;
            }

            match self.upload(artifact).await {
                Ok(file) => {
                    info!(
                        "Uploading files to Gemini: {}/{} ({})",
                        index + 1,
                        total,
                        artifact.kind.as_str().to_uppercase()
                    );
                    self.uploads
                        .lock()
                        .map_err(|_| lock_poisoned())?
                        .push((artifact.path.clone(), file.clone()));
                    files.push(file);
                }
                Err(err) => {
                    error!("Failed to upload {}: {}", artifact.display_name(), err);
                    match artifact.kind {
                        ArtifactKind::Audio | ArtifactKind::Video => return Err(err),
                        ArtifactKind::Image | ArtifactKind::Text => continue,
                    }
                }
            }
        }

        Ok(files)
    }

    /// Resumable upload of one artifact: start a session, then send the bytes
    /// and finalize in one request.
    async fn upload(&self, artifact: &Artifact) -> Result<RemoteFile, UpstreamError> {
        let bytes = tokio::fs::read(&artifact.path)
            .await
            .map_err(|e| UpstreamError::Other(format!("cannot read {}: {}", artifact.path.display(), e)))?;
        let mime_type = mime_type_for(artifact);

        let response = self
            .http
            .post(&self.endpoints.upload_url("files"))
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type.as_str())
            .json(&StartUploadRequest {
                file: UploadMetadata {
                    display_name: artifact.display_name(),
                },
            })
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let session_url = response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| UpstreamError::Other("upload session URL missing from response".to_string()))?;

        let response = self
            .http
            .post(&session_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let uploaded: UploadResponse = parse_json(response).await?;
        debug!("Uploaded {} as {}", artifact.display_name(), uploaded.file.name);
        self.wait_until_active(uploaded.file).await
    }

    async fn wait_until_active(&self, mut file: RemoteFile) -> Result<RemoteFile, UpstreamError> {
        let mut polls = 0;
        while file.state.as_deref() == Some("PROCESSING") {
            if polls >= MAX_STATE_POLLS {
                return Err(UpstreamError::Other(format!(
                    "{} still processing after {} checks",
                    file.name, MAX_STATE_POLLS
                )));
            }
            polls += 1;
            tokio::time::sleep(self.poll_interval).await;
            file = self.get_file(&file.name).await?;
        }

        match file.state.as_deref() {
            Some("FAILED") => Err(UpstreamError::Other(format!("processing of {} failed", file.name))),
            _ => Ok(file),
        }
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile, UpstreamError> {
        let response = self
            .http
            .get(&self.endpoints.resource_url(name))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        parse_json(response).await
    }

    async fn delete_file(&self, name: &str) -> Result<(), UpstreamError> {
        let response = self
            .http
            .delete(&self.endpoints.resource_url(name))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl Provider for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Document, UpstreamError> {
        let files = self.ensure_uploaded(request).await?;

        let mut parts = Vec::with_capacity(files.len() + 1);
        parts.push(Part::Text {
            text: request.prompt.clone(),
        });
        parts.extend(files.into_iter().map(|file| Part::File {
            file_data: FileData {
                mime_type: file.mime_type,
                file_uri: file.uri,
            },
        }));

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig::from(&request.parameters),
        };

        info!("Generating content with {}...", request.model);
        let url = self
            .endpoints
            .resource_url(&format!("models/{}:generateContent", request.model));
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let generated: GenerateContentResponse = parse_json(response).await?;
        let text = extract_text(&generated)?;
        Ok(Document::new(text, request.model.clone()))
    }

    async fn count_tokens(&self, model: &str, prompt: &str) -> Result<u64, UpstreamError> {
        let url = self
            .endpoints
            .resource_url(&format!("models/{}:countTokens", model));
        let body = CountTokensRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part::Text {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let counted: CountTokensResponse = parse_json(response).await?;
        Ok(counted.total_tokens)
    }

    async fn release(&self) -> Result<usize, UpstreamError> {
        let uploads: Vec<(PathBuf, RemoteFile)> = {
            let mut uploads = self.uploads.lock().map_err(|_| lock_poisoned())?;
            uploads.drain(..).collect()
        };
        if uploads.is_empty() {
            return Ok(0);
        }

        info!("Cleaning up uploaded files...");
        let total = uploads.len();
        let mut removed = 0;
        for (_, file) in uploads {
            match self.delete_file(&file.name).await {
                Ok(()) => removed += 1,
                Err(err) => warn!("Failed to delete uploaded file {}: {}", file.name, err),
            }
        }
        info!("Cleaned up {}/{} uploaded files", removed, total);
        Ok(removed)
    }

    fn provider_id(&self) -> &str {
        ApiKeyProvider::Gemini.as_str()
    }
}

fn mime_type_for(artifact: &Artifact) -> String {
    match artifact.kind {
        ArtifactKind::Text => "text/plain".to_string(),
        _ => mime_guess::from_path(&artifact.path)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

/// Concatenated non-thought text of the first candidate.
fn extract_text(response: &GenerateContentResponse) -> Result<String, UpstreamError> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_ref())
    {
        return Err(UpstreamError::Other(format!("Prompt blocked: {}", reason)));
    }

    let candidate = response.candidates.first();
    let text: String = candidate
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter(|part| !part.thought)
                .filter_map(|part| part.text.as_deref())
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        if let Some(reason) = candidate.and_then(|c| c.finish_reason.as_deref()) {
            warn!("Gemini returned no text (finish reason: {})", reason);
        }
        return Err(UpstreamError::EmptyResponse);
    }
    Ok(text)
}

fn transport_error(err: reqwest::Error) -> UpstreamError {
    warn!("Request to Gemini failed: {:?}", err);
    UpstreamError::Transport(err.to_string())
}

fn lock_poisoned() -> UpstreamError {
    UpstreamError::Other("upload cache lock poisoned".to_string())
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, UpstreamError> {
    let code = response.status().as_u16();
    let body = response.text().await.map_err(transport_error)?;
    serde_json::from_str(&body).map_err(|e| {
        warn!("Failed to parse Gemini response: {:?}", e);
        UpstreamError::Malformed {
            code: Some(code),
            body,
        }
    })
}

/// Map a non-success response onto an [`UpstreamError`], keeping the HTTP code
/// even when the body is not the usual error envelope.
async fn error_from_response(response: reqwest::Response) -> UpstreamError {
    let code = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    error!("Gemini API returned {}: {}", code, body);

    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => UpstreamError::Status {
            code: envelope.error.code.unwrap_or(code),
            status: envelope.error.status,
            message: envelope.error.message,
        },
        Err(_) => UpstreamError::Malformed {
            code: Some(code),
            body,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meeting_ai::types::artifact::ArtifactSet;
    use meeting_ai::{classify, ErrorClass};
    use mockito::{Matcher, Server, ServerGuard};
    use std::fs;

    fn client(server: &ServerGuard) -> GeminiClient {
        GeminiClient::new(
            SecretString::from("test_api_key_123".to_string()),
            &server.url(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_poll_interval(Duration::from_millis(1))
    }

    fn parameters() -> ValidatedParameters {
        ValidatedParameters {
            temperature: 0.3,
            top_p: 0.95,
            top_k: 64,
            candidate_count: 1,
            max_output_tokens: 65535,
        }
    }

    fn request(artifacts: ArtifactSet) -> GenerationRequest {
        GenerationRequest {
            model: "gemini-2.5-pro".to_string(),
            prompt: "Document this meeting.".to_string(),
            artifacts,
            parameters: parameters(),
        }
    }

    async fn mock_upload(server: &mut ServerGuard, id: &str, mime: &str) -> (mockito::Mock, mockito::Mock) {
        let session = format!("{}/upload/v1beta/files?upload_id={}", server.url(), id);
        let start = server
            .mock("POST", "/upload/v1beta/files")
            .match_header("x-goog-api-key", "test_api_key_123")
            .match_header("x-goog-upload-command", "start")
            .match_header("x-goog-upload-header-content-type", mime)
            .with_status(200)
            .with_header("x-goog-upload-url", &session)
            .expect(1)
            .create_async()
            .await;
        let finalize = server
            .mock("POST", format!("/upload/v1beta/files?upload_id={}", id).as_str())
            .match_header("x-goog-upload-command", "upload, finalize")
            .with_status(200)
            .with_body(format!(
                r#"{{"file": {{"name": "files/{id}", "uri": "https://generativelanguage.googleapis.com/v1beta/files/{id}", "mimeType": "{mime}", "state": "ACTIVE"}}}}"#
            ))
            .expect(1)
            .create_async()
            .await;
        (start, finalize)
    }

    #[tokio::test]
    async fn test_generate_uploads_artifacts_and_returns_text() {
        let mut server = Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("audio.m4a");
        fs::write(&audio, b"audio-bytes").unwrap();

        let artifact = Artifact::from_file(ArtifactKind::Audio, &audio).unwrap();
        let mime = mime_type_for(&artifact);
        let (start, finalize) = mock_upload(&mut server, "audio1", &mime).await;
        let generate = server
            .mock("POST", "/v1beta/models/gemini-2.5-pro:generateContent")
            .match_header("x-goog-api-key", "test_api_key_123")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "Document this meeting."},
                        {"fileData": {
                            "mimeType": mime,
                            "fileUri": "https://generativelanguage.googleapis.com/v1beta/files/audio1"
                        }}
                    ]
                }],
                "generationConfig": {
                    "topK": 64,
                    "candidateCount": 1,
                    "maxOutputTokens": 65535
                }
            })))
            .with_status(200)
            .with_body(r##"{"candidates": [{"content": {"parts": [{"text": "# Meeting\n"}, {"text": "Decisions"}]}, "finishReason": "STOP"}]}"##)
            .create_async()
            .await;

        let gemini = client(&server);
        let artifacts: ArtifactSet = [artifact].into_iter().collect();
        let document = gemini.generate(&request(artifacts)).await.unwrap();

        assert_eq!(document.text, "# Meeting\nDecisions");
        assert_eq!(document.model, "gemini-2.5-pro");
        assert_eq!(gemini.uploaded_files().len(), 1);
        start.assert_async().await;
        finalize.assert_async().await;
        generate.assert_async().await;
    }

    #[tokio::test]
    async fn test_uploads_are_reused_across_attempts() {
        let mut server = Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("audio.m4a");
        fs::write(&audio, b"audio-bytes").unwrap();

        let artifact = Artifact::from_file(ArtifactKind::Audio, &audio).unwrap();
        let mime = mime_type_for(&artifact);
        let (start, finalize) = mock_upload(&mut server, "audio1", &mime).await;
        let _generate = server
            .mock("POST", "/v1beta/models/gemini-2.5-pro:generateContent")
            .with_status(503)
            .with_body(r#"{"error": {"code": 503, "message": "The model is overloaded. Please try again later.", "status": "UNAVAILABLE"}}"#)
            .expect(2)
            .create_async()
            .await;

        let gemini = client(&server);
        let artifacts: ArtifactSet = [artifact].into_iter().collect();
        let request = request(artifacts);

        for _ in 0..2 {
            let err = gemini.generate(&request).await.unwrap_err();
            assert_eq!(
                err,
                UpstreamError::Status {
                    code: 503,
                    status: Some("UNAVAILABLE".to_string()),
                    message: "The model is overloaded. Please try again later.".to_string(),
                }
            );
            assert_eq!(classify(&err), ErrorClass::Retryable);
        }

        start.assert_async().await;
        finalize.assert_async().await;
    }

    #[tokio::test]
    async fn test_unparsable_error_body_keeps_status_code() {
        let mut server = Server::new_async().await;
        let _generate = server
            .mock("POST", "/v1beta/models/gemini-2.5-pro:generateContent")
            .with_status(503)
            .with_body("<html>Service Unavailable</html>")
            .create_async()
            .await;

        let err = client(&server)
            .generate(&request(ArtifactSet::new()))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            UpstreamError::Malformed {
                code: Some(503),
                body: "<html>Service Unavailable</html>".to_string(),
            }
        );
        assert_eq!(classify(&err), ErrorClass::Retryable);
    }

    #[tokio::test]
    async fn test_authentication_error_is_fatal() {
        let mut server = Server::new_async().await;
        let _generate = server
            .mock("POST", "/v1beta/models/gemini-2.5-pro:generateContent")
            .with_status(400)
            .with_body(r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}"#)
            .create_async()
            .await;

        let err = client(&server)
            .generate(&request(ArtifactSet::new()))
            .await
            .unwrap_err();
        assert_eq!(classify(&err), ErrorClass::Fatal);
    }

    #[tokio::test]
    async fn test_empty_candidates_is_empty_response() {
        let mut server = Server::new_async().await;
        let _generate = server
            .mock("POST", "/v1beta/models/gemini-2.5-pro:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates": [{"content": {"parts": []}, "finishReason": "MAX_TOKENS"}]}"#)
            .create_async()
            .await;

        let err = client(&server)
            .generate(&request(ArtifactSet::new()))
            .await
            .unwrap_err();
        assert_eq!(err, UpstreamError::EmptyResponse);
    }

    #[tokio::test]
    async fn test_failed_frame_upload_is_skipped() {
        let mut server = Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let frame = dir.path().join("frame_0001.jpg");
        fs::write(&frame, b"jpeg").unwrap();

        let _start = server
            .mock("POST", "/upload/v1beta/files")
            .with_status(500)
            .with_body(r#"{"error": {"code": 500, "message": "Internal error", "status": "INTERNAL"}}"#)
            .create_async()
            .await;
        let _generate = server
            .mock("POST", "/v1beta/models/gemini-2.5-pro:generateContent")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "contents": [{"parts": [{"text": "Document this meeting."}]}]
            })))
            .with_status(200)
            .with_body(r#"{"candidates": [{"content": {"parts": [{"text": "Notes"}]}}]}"#)
            .create_async()
            .await;

        let gemini = client(&server);
        let artifacts: ArtifactSet = [Artifact::from_file(ArtifactKind::Image, &frame).unwrap()]
            .into_iter()
            .collect();
        let document = gemini.generate(&request(artifacts)).await.unwrap();

        assert_eq!(document.text, "Notes");
        assert!(gemini.uploaded_files().is_empty());
    }

    #[tokio::test]
    async fn test_count_tokens() {
        let mut server = Server::new_async().await;
        let _count = server
            .mock("POST", "/v1beta/models/gemini-2.5-pro:countTokens")
            .match_header("x-goog-api-key", "test_api_key_123")
            .match_body(Matcher::Json(serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "Document this meeting."}]}]
            })))
            .with_status(200)
            .with_body(r#"{"totalTokens": 1234}"#)
            .create_async()
            .await;

        let tokens = client(&server)
            .count_tokens("gemini-2.5-pro", "Document this meeting.")
            .await
            .unwrap();
        assert_eq!(tokens, 1234);
    }

    #[tokio::test]
    async fn test_release_deletes_uploaded_files() {
        let mut server = Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let note = dir.path().join("note.txt");
        fs::write(&note, b"Agenda").unwrap();

        let _upload = mock_upload(&mut server, "note1", "text/plain").await;
        let _generate = server
            .mock("POST", "/v1beta/models/gemini-2.5-pro:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates": [{"content": {"parts": [{"text": "Notes"}]}}]}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/v1beta/files/note1")
            .match_header("x-goog-api-key", "test_api_key_123")
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let gemini = client(&server);
        let artifacts: ArtifactSet = [Artifact::from_file(ArtifactKind::Text, &note).unwrap()]
            .into_iter()
            .collect();
        gemini.generate(&request(artifacts)).await.unwrap();

        assert_eq!(gemini.release().await.unwrap(), 1);
        assert_eq!(gemini.release().await.unwrap(), 0);
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_processing_file_is_polled_until_active() {
        let mut server = Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("small.mp4");
        fs::write(&video, b"video").unwrap();

        let session = format!("{}/upload/v1beta/files?upload_id=video1", server.url());
        let _start = server
            .mock("POST", "/upload/v1beta/files")
            .with_status(200)
            .with_header("x-goog-upload-url", &session)
            .create_async()
            .await;
        let _finalize = server
            .mock("POST", "/upload/v1beta/files?upload_id=video1")
            .with_status(200)
            .with_body(r#"{"file": {"name": "files/video1", "uri": "https://example.test/files/video1", "mimeType": "video/mp4", "state": "PROCESSING"}}"#)
            .create_async()
            .await;
        let poll = server
            .mock("GET", "/v1beta/files/video1")
            .with_status(200)
            .with_body(r#"{"name": "files/video1", "uri": "https://example.test/files/video1", "mimeType": "video/mp4", "state": "ACTIVE"}"#)
            .expect(1)
            .create_async()
            .await;

        let gemini = client(&server);
        let file = gemini
            .upload(&Artifact::from_file(ArtifactKind::Video, &video).unwrap())
            .await
            .unwrap();

        assert_eq!(file.state.as_deref(), Some("ACTIVE"));
        poll.assert_async().await;
    }

    #[test]
    fn test_generation_config_serializes_camel_case() {
        let json = serde_json::to_value(GenerationConfig::from(&parameters())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "temperature": 0.3,
                "topP": 0.95,
                "topK": 64,
                "candidateCount": 1,
                "maxOutputTokens": 65535
            })
        );
    }
}
