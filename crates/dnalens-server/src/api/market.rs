//! Market dataset upload and Winning DNA synthesis.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use dnalens_core::{parse_dataset, WinningDna};
use dnalens_pipeline::state::NO_MARKET_DATA;
use dnalens_pipeline::{get_winning_dna_with_policy, CreativePolicy};
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    map_pipeline_error, require_service, stage_file_field, ApiError, ApiResponse, AppState,
};

#[derive(Debug, Serialize)]
pub(super) struct MarketDataUploaded {
    pub filename: String,
    pub rows: usize,
}

async fn remove_best_effort(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::debug!(path = %path.display(), error = %e, "could not remove old market data");
    }
}

/// `POST /api/v1/market-data`: stores a competitor CSV for the next synthesis.
pub(super) async fn upload_market_data(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<MarketDataUploaded>>, ApiError> {
    let data_dir = &state.config.data_dir;
    let upload = stage_file_field(&req_id.0, &mut multipart, data_dir, "upload-", "csv").await?;

    let internal = |e: std::io::Error| {
        tracing::error!(dir = %data_dir.display(), error = %e, "failed to store market data");
        ApiError::new(req_id.0.as_str(), "internal_error", "failed to store market data")
    };
    let rows = parse_dataset(upload.file.reopen().map_err(internal)?)
        .map_err(|e| ApiError::new(req_id.0.as_str(), "bad_request", e.to_string()))?
        .len();

    let path = data_dir.join(format!("market-{}.csv", Uuid::new_v4()));
    upload.file.persist(&path).map_err(|e| internal(e.error))?;

    // `None` while a synthesis runs; the replaced file is released on finish.
    let previous = state.dna.lock().await.set_market_data(path.clone());
    if let Some(previous) = previous.filter(|p| *p != path) {
        remove_best_effort(&previous).await;
    }

    let filename = upload.file_name.unwrap_or_else(|| "market.csv".to_string());
    tracing::info!(%filename, rows, path = %path.display(), "market data uploaded");
    Ok(ApiResponse::new(
        req_id.0,
        MarketDataUploaded { filename, rows },
    ))
}

/// `POST /api/v1/market-data/analyze`: synthesizes and persists the profile.
///
/// The work runs in its own task so the processing flag is cleared even if
/// the client disconnects mid-request. Dataset rows may only point at URLs
/// or at files inside the data directory.
pub(super) async fn analyze_market_data(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<WinningDna>>, ApiError> {
    let (service, dataset) = {
        let mut dna = state.dna.lock().await;
        if dna.market_data().is_none() {
            return Err(ApiError::new(req_id.0, "bad_request", NO_MARKET_DATA));
        }
        let service = require_service(&state, &req_id.0)?;
        let dataset = dna
            .begin_synthesis()
            .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;
        (service, dataset)
    };
    let top_n = state.config.top_n;
    let policy = CreativePolicy::RemoteOrWithin(state.config.data_dir.clone());
    let dna = Arc::clone(&state.dna);

    let task = tokio::spawn(async move {
        let result = get_winning_dna_with_policy(service.as_ref(), &dataset, top_n, &policy).await;
        let released = dna
            .lock()
            .await
            .finish_synthesis(result.as_ref().ok().cloned());
        for path in released {
            remove_best_effort(&path).await;
        }
        result
    });

    match task.await {
        Ok(Ok(profile)) => Ok(ApiResponse::new(req_id.0, profile)),
        Ok(Err(e)) => Err(map_pipeline_error(req_id.0, &e)),
        Err(join_error) => {
            tracing::error!(error = %join_error, "synthesis task aborted");
            let released = state.dna.lock().await.finish_synthesis(None);
            for path in released {
                remove_best_effort(&path).await;
            }
            Err(ApiError::new(
                req_id.0,
                "internal_error",
                "market analysis was interrupted",
            ))
        }
    }
}
