use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure fetching remote media before upload.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The download did not finish within the configured timeout.
    #[error("timed out downloading {url}")]
    Timeout { url: String },

    /// The media host answered with a non-2xx status.
    #[error("download of {url} failed with HTTP {status}")]
    Status { url: String, status: u16 },

    /// Connection, TLS or body-read failure.
    #[error("download of {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The temporary file could not be created or written.
    #[error("cannot write downloaded media to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors returned by the Gemini API client.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("Gemini API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A generation call succeeded but produced no text.
    #[error("Gemini returned no text: {0}")]
    EmptyResponse(String),

    /// The resumable upload handshake did not return an upload URL.
    #[error("upload session for {file} returned no upload URL")]
    MissingUploadUrl { file: String },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// A local file could not be read for upload.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The uploaded file never left the `PROCESSING` state.
    #[error("file {name} still processing after {elapsed:?}")]
    PollTimeout { name: String, elapsed: Duration },

    #[error(transparent)]
    Download(#[from] DownloadError),
}
