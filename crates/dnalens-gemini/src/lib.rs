//! Gemini REST client and the [`CreativeService`] seam.
//!
//! Implements creative download, resumable upload, file-state polling and
//! `generateContent` calls. The pipeline crate depends only on the
//! [`CreativeService`] trait so it can be tested against fakes.

pub mod client;
pub(crate) mod download;
pub mod error;
pub mod poll;
pub mod service;
pub mod types;

pub use client::GeminiClient;
pub use download::mime_for_path;
pub use error::{DownloadError, ServiceError};
pub use poll::{poll_until, poll_until_blocking, PollOutcome, PollStatus};
pub use service::CreativeService;
pub use types::{FileState, RemoteFile};
