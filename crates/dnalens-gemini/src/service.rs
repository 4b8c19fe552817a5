//! The generative-service seam used by the pipeline, and its Gemini-backed
//! implementation.

use std::future::Future;
use std::path::PathBuf;

use dnalens_core::prompts::{VIDEO_ANALYSIS_PROMPT, VIDEO_ANALYSIS_REQUEST};
use dnalens_core::{extract_json, CreativeRef, VideoInsight};

use crate::client::GeminiClient;
use crate::download::download_to_temp;
use crate::error::ServiceError;
use crate::types::{FileState, RemoteFile};

/// Operations the synthesis and report pipelines need from a generative model.
pub trait CreativeService: Send + Sync {
    /// One generation call: system instruction, user text and optional
    /// attached media. Returns the model's text.
    fn generate(
        &self,
        system_prompt: &str,
        user_input: &str,
        media: Option<&RemoteFile>,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;

    /// Extracts structured features from one creative.
    ///
    /// Soft failures (missing local file, processing failure, unparseable
    /// model output) come back as a [`VideoInsight::Failed`] marker; hard
    /// failures (download, upload, network) come back as `Err`.
    fn analyze_video(
        &self,
        creative: &CreativeRef,
    ) -> impl Future<Output = Result<VideoInsight, ServiceError>> + Send;
}

impl GeminiClient {
    /// Fetches or locates the creative, uploads it, waits for processing and
    /// asks the model for a feature JSON.
    ///
    /// Remote creatives are staged in a temporary file that is removed on
    /// every exit path. The uploaded copy is deleted from the service
    /// afterwards on a best-effort basis.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Download`] for remote fetch failures, plus any upload,
    /// poll or generation error.
    pub async fn analyze_video(&self, creative: &CreativeRef) -> Result<VideoInsight, ServiceError> {
        tracing::info!(creative = %creative, "analyzing creative");

        let mut staged = None;
        let local_path: PathBuf = match creative {
            CreativeRef::Remote(url) => {
                let file = staged.insert(
                    download_to_temp(&self.download_client, url, self.temp_dir.as_deref()).await?,
                );
                file.path().to_path_buf()
            }
            CreativeRef::Local(path) => path.clone(),
        };

        let is_file = tokio::fs::metadata(&local_path)
            .await
            .is_ok_and(|m| m.is_file());
        if !is_file {
            tracing::warn!(path = %local_path.display(), "creative file not found");
            return Ok(VideoInsight::failed(format!(
                "File not found: {}",
                local_path.display()
            )));
        }

        let uploaded = self.upload_file(&local_path).await?;
        let result = self.describe_uploaded(uploaded.clone()).await;

        if let Err(e) = self.delete_file(&uploaded.name).await {
            tracing::warn!(file = %uploaded.name, error = %e, "could not delete uploaded creative");
        }
        drop(staged);
        result
    }

    async fn describe_uploaded(&self, uploaded: RemoteFile) -> Result<VideoInsight, ServiceError> {
        let file = self.wait_until_processed(uploaded).await?;
        if file.state == FileState::Failed {
            let detail = file
                .error
                .as_ref()
                .map(|e| e.message.clone())
                .unwrap_or_default();
            tracing::warn!(file = %file.name, detail, "service failed to process creative");
            return Ok(VideoInsight::failed("Video processing failed"));
        }

        let text = self
            .generate(VIDEO_ANALYSIS_PROMPT, VIDEO_ANALYSIS_REQUEST, Some(&file))
            .await?;
        Ok(match extract_json(&text) {
            Ok(value) => VideoInsight::from_model_json(value),
            Err(e) => {
                tracing::warn!(file = %file.name, error = %e, "video analysis was not JSON");
                VideoInsight::failed(format!("Failed to parse video analysis: {e}"))
            }
        })
    }
}

impl CreativeService for GeminiClient {
    async fn generate(
        &self,
        system_prompt: &str,
        user_input: &str,
        media: Option<&RemoteFile>,
    ) -> Result<String, ServiceError> {
        GeminiClient::generate(self, system_prompt, user_input, media).await
    }

    async fn analyze_video(&self, creative: &CreativeRef) -> Result<VideoInsight, ServiceError> {
        GeminiClient::analyze_video(self, creative).await
    }
}
