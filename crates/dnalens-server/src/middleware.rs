//! Request ids, bearer-token auth and the request budget for API routes.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

const API_KEYS_VAR: &str = "DNALENS_API_KEYS";
const MAX_REQUEST_ID_LEN: usize = 128;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request id stored as a request extension and echoed on the response.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer tokens accepted on protected routes. `None` leaves them open.
#[derive(Debug, Clone)]
pub struct ApiKeys(Option<Arc<HashSet<String>>>);

impl ApiKeys {
    /// Reads the comma-separated token list from `DNALENS_API_KEYS`.
    ///
    /// # Errors
    ///
    /// Fails outside development when no token is configured.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        Self::parse(
            &std::env::var(API_KEYS_VAR).unwrap_or_default(),
            is_development,
        )
    }

    /// # Errors
    ///
    /// Same as [`ApiKeys::from_env`].
    pub fn parse(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let keys: HashSet<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_owned)
            .collect();

        match (keys.is_empty(), is_development) {
            (false, _) => Ok(Self(Some(Arc::new(keys)))),
            (true, true) => {
                tracing::warn!("{API_KEYS_VAR} not set; API routes are open in development");
                Ok(Self::open())
            }
            (true, false) => {
                anyhow::bail!("{API_KEYS_VAR} must list at least one bearer token outside development")
            }
        }
    }

    #[must_use]
    pub fn open() -> Self {
        Self(None)
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.0.is_none()
    }

    fn accepts(&self, authorization: Option<&HeaderValue>) -> bool {
        let Some(keys) = &self.0 else {
            return true;
        };
        bearer_token(authorization).is_some_and(|token| keys.contains(token))
    }
}

#[derive(Debug)]
struct Window {
    opened: Instant,
    used: usize,
}

/// Fixed-window request budget shared by the protected routes.
///
/// Every protected call may end in a Gemini request, so the budget is
/// global rather than per client.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    current: Arc<Mutex<Window>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            current: Arc::new(Mutex::new(Window {
                opened: Instant::now(),
                used: 0,
            })),
        }
    }

    /// Takes one request from the budget, or returns the time left until
    /// the window resets.
    async fn acquire(&self) -> Result<(), Duration> {
        let mut current = self.current.lock().await;
        let now = Instant::now();
        if now.duration_since(current.opened) >= self.window {
            *current = Window {
                opened: now,
                used: 0,
            };
        }
        if current.used >= self.limit {
            return Err(self
                .window
                .saturating_sub(now.duration_since(current.opened)));
        }
        current.used += 1;
        Ok(())
    }
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map_or_else(String::new, |id| id.0.clone())
}

/// Reuses a caller-supplied `x-request-id` when it is short and printable,
/// otherwise assigns a fresh UUID. The id is echoed on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}

pub async fn require_bearer_auth(
    State(keys): State<ApiKeys>,
    req: Request,
    next: Next,
) -> Response {
    if keys.accepts(req.headers().get(header::AUTHORIZATION)) {
        return next.run(req).await;
    }
    tracing::debug!(path = %req.uri().path(), "rejected request without a valid bearer token");
    ApiError::new(
        request_id_of(&req),
        "unauthorized",
        "missing or invalid bearer token",
    )
    .into_response()
}

/// Answers `429` with `Retry-After` once the window's budget is spent.
pub async fn enforce_rate_limit(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    match limiter.acquire().await {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            tracing::warn!(retry_after_secs = retry_after.as_secs(), "request budget exhausted");
            let mut response =
                ApiError::new(request_id_of(&req), "rate_limited", "rate limit exceeded")
                    .into_response();
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after.as_secs().max(1)),
            );
            response
        }
    }
}

fn bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    let token = value?.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
