//! Creative benchmark reports for uploaded files and remote URLs.

use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    Extension, Json,
};
use dnalens_core::{CreativeRef, WinningDna};
use dnalens_pipeline::report::MISSING_PROFILE;
use dnalens_pipeline::{analyze_creative, report_on_insight, CreativeReport, PipelineError};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{
    map_pipeline_error, require_service, stage_file_field, ApiError, ApiResponse, AppState,
};

#[derive(Debug, Deserialize)]
pub(super) struct VideoUrlRequest {
    pub video_url: String,
}

async fn current_profile(state: &AppState, request_id: &str) -> Result<WinningDna, ApiError> {
    state
        .dna
        .lock()
        .await
        .profile()
        .cloned()
        .ok_or_else(|| ApiError::new(request_id, "bad_request", MISSING_PROFILE))
}

/// `POST /api/v1/creatives/file`: scores an uploaded video.
///
/// The upload is streamed to a temporary file under the data directory and
/// removed once the report is done.
pub(super) async fn analyze_creative_file(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<CreativeReport>>, ApiError> {
    let profile = current_profile(&state, &req_id.0).await?;
    let service = require_service(&state, &req_id.0)?;
    let upload = stage_file_field(
        &req_id.0,
        &mut multipart,
        &state.config.data_dir,
        "creative-",
        "mp4",
    )
    .await?;

    tracing::info!(
        filename = upload.file_name.as_deref().unwrap_or("upload"),
        bytes = upload.bytes,
        "analyzing uploaded creative"
    );
    let creative = CreativeRef::local(upload.file.path());
    match analyze_creative(service.as_ref(), &creative, Some(&profile)).await {
        Ok(report) => Ok(ApiResponse::new(req_id.0, report)),
        Err(e) => Err(map_pipeline_error(req_id.0, &e)),
    }
}

/// `POST /api/v1/creatives/url`: scores a remote video.
///
/// Unlike uploads, a video whose analysis comes back as an error marker is
/// answered with `400` and that message; no report is generated.
pub(super) async fn analyze_creative_url(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<VideoUrlRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<CreativeReport>>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        ApiError::new(req_id.0.as_str(), "validation_error", rejection.body_text())
    })?;
    let creative = match CreativeRef::parse(&body.video_url) {
        Some(creative @ CreativeRef::Remote(_)) => creative,
        _ => {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                "video_url must be an http(s) URL",
            ))
        }
    };
    let profile = current_profile(&state, &req_id.0).await?;
    let service = require_service(&state, &req_id.0)?;

    tracing::info!(url = %creative, "analyzing remote creative");
    let insight = service
        .analyze_video(&creative)
        .await
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &PipelineError::from(e)))?;
    if let Some(error) = insight.error() {
        tracing::warn!(url = %creative, error, "remote creative could not be analyzed");
        return Err(ApiError::new(req_id.0, "bad_request", error));
    }

    match report_on_insight(service.as_ref(), &creative, &profile, insight).await {
        Ok(report) => Ok(ApiResponse::new(req_id.0, report)),
        Err(e) => Err(map_pipeline_error(req_id.0, &e)),
    }
}
