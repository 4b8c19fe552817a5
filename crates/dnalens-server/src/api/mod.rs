mod creatives;
mod market;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use dnalens_core::{AppConfig, WinningDna};
use dnalens_gemini::{GeminiClient, ServiceError};
use dnalens_pipeline::report::MISSING_PROFILE;
use dnalens_pipeline::{DnaState, PipelineError};
use serde::Serialize;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, ApiKeys, RateLimiter, RequestId,
    X_REQUEST_ID,
};

const SERVICE_NOT_CONFIGURED: &str = "GEMINI_API_KEY is not configured on the server";

#[derive(Clone)]
pub struct AppState {
    pub dna: Arc<Mutex<DnaState>>,
    /// `None` when no API key is configured; service-backed routes return 503.
    pub service: Option<Arc<GeminiClient>>,
    pub config: Arc<AppConfig>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    profile_loaded: bool,
    service_configured: bool,
    processing: bool,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "payload_too_large" => StatusCode::PAYLOAD_TOO_LARGE,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "bad_gateway" => StatusCode::BAD_GATEWAY,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_pipeline_error(request_id: String, error: &PipelineError) -> ApiError {
    let code = match error {
        PipelineError::Dataset(_)
        | PipelineError::EmptyDataset { .. }
        | PipelineError::Precondition(_)
        | PipelineError::Service(ServiceError::Download(_)) => "bad_request",
        PipelineError::Busy => "conflict",
        PipelineError::Service(_) | PipelineError::Synthesis { .. } => {
            tracing::error!(error = %error, "generation service failed");
            "bad_gateway"
        }
    };
    ApiError::new(request_id, code, error.to_string())
}

pub(super) fn require_service(
    state: &AppState,
    request_id: &str,
) -> Result<Arc<GeminiClient>, ApiError> {
    state.service.clone().ok_or_else(|| {
        ApiError::new(request_id, "service_unavailable", SERVICE_NOT_CONFIGURED)
    })
}

/// One uploaded file from a multipart form, staged on disk.
pub(super) struct Upload {
    pub file_name: Option<String>,
    pub file: NamedTempFile,
    pub bytes: u64,
}

/// Extension for a staged upload taken from the client's file name, so
/// later readers see the right type. Falls back to `default_ext`.
pub(super) fn upload_suffix(file_name: Option<&str>, default_ext: &str) -> String {
    file_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map_or_else(
            || format!(".{default_ext}"),
            |e| format!(".{}", e.to_ascii_lowercase()),
        )
}

/// Streams the multipart field named `file` into a temporary file under
/// `dir`; other fields are ignored. The file is removed when the returned
/// [`Upload`] is dropped unless the caller persists it.
pub(super) async fn stage_file_field(
    request_id: &str,
    multipart: &mut Multipart,
    dir: &Path,
    prefix: &str,
    default_ext: &str,
) -> Result<Upload, ApiError> {
    let multipart_error = |e: axum::extract::multipart::MultipartError| {
        let code = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            "payload_too_large"
        } else {
            "bad_request"
        };
        ApiError::new(request_id, code, e.body_text())
    };
    let internal = |e: std::io::Error| {
        tracing::error!(dir = %dir.display(), error = %e, "failed to stage upload");
        ApiError::new(request_id, "internal_error", "failed to stage upload")
    };

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(ToOwned::to_owned);

        tokio::fs::create_dir_all(dir).await.map_err(internal)?;
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(&upload_suffix(file_name.as_deref(), default_ext))
            .tempfile_in(dir)
            .map_err(internal)?;
        let mut out = tokio::fs::File::from_std(file.reopen().map_err(internal)?);

        let mut bytes: u64 = 0;
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            out.write_all(&chunk).await.map_err(internal)?;
            bytes += chunk.len() as u64;
        }
        out.flush().await.map_err(internal)?;

        if bytes == 0 {
            return Err(ApiError::new(request_id, "bad_request", "uploaded file is empty"));
        }
        return Ok(Upload {
            file_name,
            file,
            bytes,
        });
    }
    Err(ApiError::new(
        request_id,
        "bad_request",
        "multipart field 'file' is required",
    ))
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            X_REQUEST_ID,
        ])
}

fn protected_router(keys: ApiKeys, limiter: RateLimiter) -> Router<AppState> {
    Router::new()
        .route("/api/v1/winning-dna", get(get_winning_dna))
        .route("/api/v1/market-data", post(market::upload_market_data))
        .route(
            "/api/v1/market-data/analyze",
            post(market::analyze_market_data),
        )
        .route(
            "/api/v1/creatives/file",
            post(creatives::analyze_creative_file),
        )
        .route(
            "/api/v1/creatives/url",
            post(creatives::analyze_creative_url),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    limiter,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    keys,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, keys: ApiKeys, limiter: RateLimiter) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));
    let body_limit = state.config.max_upload_bytes();

    Router::new()
        .merge(public_routes)
        .merge(protected_router(keys, limiter))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let dna = state.dna.lock().await;
    ApiResponse::new(
        req_id.0,
        HealthData {
            status: "ok",
            profile_loaded: dna.profile().is_some(),
            service_configured: state.service.is_some(),
            processing: dna.is_processing(),
        },
    )
}

async fn get_winning_dna(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<WinningDna>>, ApiError> {
    let profile = state.dna.lock().await.profile().cloned();
    match profile {
        Some(profile) => Ok(ApiResponse::new(req_id.0, profile)),
        None => Err(ApiError::new(req_id.0, "not_found", MISSING_PROFILE)),
    }
}

pub fn default_rate_limiter() -> RateLimiter {
    RateLimiter::new(120, Duration::from_secs(60))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
