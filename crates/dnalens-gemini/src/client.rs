//! HTTP client for the Gemini REST API.
//!
//! Covers the three endpoints the pipeline needs: resumable file upload,
//! file status lookup and `generateContent`. Non-2xx responses are decoded
//! from the `{"error": {...}}` envelope into [`ServiceError::Api`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::CONTENT_LENGTH;
use reqwest::{Body, Client, Response, Url};
use serde::de::DeserializeOwned;

use dnalens_core::AppConfig;

use crate::download::mime_for_path;
use crate::error::ServiceError;
use crate::poll::{poll_until, PollOutcome, PollStatus};
use crate::types::{
    Content, ErrorEnvelope, FileData, GenerateRequest, GenerateResponse, Part, RemoteFile,
    UploadResponse,
};

const DEFAULT_BASE_URL: &str = dnalens_core::config::DEFAULT_GEMINI_BASE_URL;
const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";
const MAX_ERROR_BODY: usize = 500;

/// Client for the Gemini REST API.
///
/// Use [`GeminiClient::new`] for production or [`GeminiClient::with_base_url`]
/// to point at a mock server in tests.
pub struct GeminiClient {
    pub(crate) client: Client,
    pub(crate) download_client: Client,
    api_key: String,
    model: String,
    base_url: String,
    pub(crate) poll_interval: Duration,
    pub(crate) poll_timeout: Option<Duration>,
    pub(crate) temp_dir: Option<PathBuf>,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("poll_interval", &self.poll_interval)
            .field("poll_timeout", &self.poll_timeout)
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a new client pointed at the production Gemini API.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, ServiceError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Http`] if a `reqwest::Client` cannot be
    /// constructed, or [`ServiceError::InvalidBaseUrl`] if `base_url` does
    /// not parse.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("dnalens/0.1 (creative-benchmarking)")
            .build()?;
        let download_client = Self::build_download_client(Duration::from_secs(60))?;

        let trimmed = base_url.trim_end_matches('/');
        Url::parse(trimmed).map_err(|e| ServiceError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            download_client,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            base_url: trimmed.to_owned(),
            poll_interval: Duration::from_secs(2),
            poll_timeout: None,
            temp_dir: None,
        })
    }

    /// Builds a client from application configuration.
    ///
    /// # Errors
    ///
    /// Same as [`GeminiClient::with_base_url`].
    pub fn from_config(api_key: &str, config: &AppConfig) -> Result<Self, ServiceError> {
        let client = Self::with_base_url(
            api_key,
            &config.gemini_model,
            config.request_timeout_secs,
            &config.gemini_base_url,
        )?
        .with_download_timeout(Duration::from_secs(config.download_timeout_secs))?
        .with_poll(config.poll_interval(), config.poll_timeout());
        Ok(match &config.temp_dir {
            Some(dir) => client.with_temp_dir(dir),
            None => client,
        })
    }

    /// `timeout` bounds the connect and each read, not the whole transfer,
    /// so a slow host that keeps sending is never cut off.
    pub(crate) fn build_download_client(timeout: Duration) -> Result<Client, ServiceError> {
        Ok(Client::builder()
            .read_timeout(timeout)
            .connect_timeout(timeout)
            .user_agent("dnalens/0.1 (creative-benchmarking)")
            .build()?)
    }

    /// Replaces the idle timeout applied to remote creative downloads
    /// (default 60 s).
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Http`] if the download client cannot be rebuilt.
    pub fn with_download_timeout(mut self, timeout: Duration) -> Result<Self, ServiceError> {
        self.download_client = Self::build_download_client(timeout)?;
        Ok(self)
    }

    /// Sets the file-state poll interval and optional ceiling.
    #[must_use]
    pub fn with_poll(mut self, interval: Duration, timeout: Option<Duration>) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }

    /// Stages downloaded creatives under `dir` instead of the OS temp dir.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Runs one `generateContent` call and returns the response text.
    ///
    /// `media`, when given, is attached as a `fileData` part ahead of the
    /// user text.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Http`] on network failure.
    /// - [`ServiceError::Api`] on a non-2xx status.
    /// - [`ServiceError::Deserialize`] if the body is not a generate response.
    /// - [`ServiceError::EmptyResponse`] if the model produced no text.
    pub async fn generate(
        &self,
        system_prompt: &str,
        user_input: &str,
        media: Option<&RemoteFile>,
    ) -> Result<String, ServiceError> {
        let mut parts = Vec::with_capacity(2);
        if let Some(file) = media {
            parts.push(Part::FileData(FileData {
                mime_type: &file.mime_type,
                file_uri: &file.uri,
            }));
        }
        parts.push(Part::Text(user_input));

        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text(system_prompt)],
            },
            contents: vec![Content {
                role: Some("user"),
                parts,
            }],
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        tracing::debug!(model = %self.model, with_media = media.is_some(), "generateContent");
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;
        let body: GenerateResponse =
            Self::read_json(response, &format!("generateContent({})", self.model)).await?;

        body.text()
            .ok_or_else(|| ServiceError::EmptyResponse(body.empty_reason()))
    }

    /// Uploads a local file through the resumable upload protocol.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Io`] if the file cannot be read.
    /// - [`ServiceError::MissingUploadUrl`] if the start handshake returns
    ///   no upload URL.
    /// - [`ServiceError::Http`], [`ServiceError::Api`] or
    ///   [`ServiceError::Deserialize`] from either request.
    pub async fn upload_file(&self, path: &Path) -> Result<RemoteFile, ServiceError> {
        let io_err = |source| ServiceError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(io_err)?;
        let size = file.metadata().await.map_err(io_err)?.len();
        let mime = mime_for_path(path);
        let display_name = path
            .file_name()
            .map_or_else(|| "creative".to_owned(), |n| n.to_string_lossy().into_owned());

        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;
        let start = Self::check_status(start).await?;
        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| ServiceError::MissingUploadUrl {
                file: display_name.clone(),
            })?;

        let finalize = self
            .client
            .post(&upload_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(CONTENT_LENGTH, size)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(Body::from(file))
            .send()
            .await?;
        let uploaded: UploadResponse =
            Self::read_json(finalize, &format!("upload({display_name})")).await?;

        tracing::info!(
            file = %uploaded.file.name,
            bytes = size,
            state = ?uploaded.file.state,
            "creative uploaded"
        );
        Ok(uploaded.file)
    }

    /// Fetches the current metadata of an uploaded file.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Http`], [`ServiceError::Api`] or [`ServiceError::Deserialize`].
    pub async fn get_file(&self, name: &str) -> Result<RemoteFile, ServiceError> {
        let response = self
            .client
            .get(format!("{}/v1beta/{name}", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        Self::read_json(response, &format!("getFile({name})")).await
    }

    /// Deletes an uploaded file.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Http`] or [`ServiceError::Api`].
    pub async fn delete_file(&self, name: &str) -> Result<(), ServiceError> {
        let response = self
            .client
            .delete(format!("{}/v1beta/{name}", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// Polls `file` until it leaves `PROCESSING`.
    ///
    /// # Errors
    ///
    /// Returns the first lookup error, or [`ServiceError::PollTimeout`] when
    /// the configured ceiling passes first.
    pub async fn wait_until_processed(&self, file: RemoteFile) -> Result<RemoteFile, ServiceError> {
        if !file.state.is_pending() {
            return Ok(file);
        }
        let name = file.name;
        let name_ref = name.as_str();
        let outcome = poll_until(self.poll_interval, self.poll_timeout, || async move {
            let current = self.get_file(name_ref).await?;
            Ok::<_, ServiceError>(if current.state.is_pending() {
                PollStatus::Pending
            } else {
                PollStatus::Done(current)
            })
        })
        .await;

        match outcome {
            PollOutcome::Terminal(file) => Ok(file),
            PollOutcome::Error(err) => Err(err),
            PollOutcome::TimedOut { elapsed, .. } => {
                Err(ServiceError::PollTimeout { name, elapsed })
            }
        }
    }

    /// Returns the response unchanged when it is 2xx, otherwise decodes the
    /// error envelope into [`ServiceError::Api`].
    async fn check_status(response: Response) -> Result<Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => envelope.error.message,
            Err(_) => body.trim().chars().take(MAX_ERROR_BODY).collect(),
        };
        Err(ServiceError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn read_json<T: DeserializeOwned>(
        response: Response,
        context: &str,
    ) -> Result<T, ServiceError> {
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ServiceError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = GeminiClient::with_base_url("k", "m", 30, "http://localhost:9999/")
            .expect("client construction should not fail");
        assert_eq!(client.base_url, "http://localhost:9999");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = GeminiClient::with_base_url("k", "m", 30, "not a url").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidBaseUrl { .. }), "{err:?}");
    }

    #[test]
    fn debug_output_hides_api_key() {
        let client = GeminiClient::new("very-secret", "gemini-test", 30).unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("very-secret"), "{rendered}");
        assert!(rendered.contains("gemini-test"));
    }
}
