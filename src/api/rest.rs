//! REST API Handlers
//!
//! Thin HTTP adapter over [`ContentService`]: one endpoint registers
//! content, one resolves a base64-encoded request URL.

use crate::error::{Error, ErrorKind};
use crate::service::ContentService;
use axum::{
    extract::{DefaultBodyLimit, Json, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Response header telling whether the hot cache answered
pub const CACHE_STATUS_HEADER: &str = "x-cache";

// =============================================================================
// Request/Response Types
// =============================================================================

/// Content registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterContentRequest {
    /// URL (optionally with `*` segments) the content is registered under
    pub endpoint: String,
    pub video_url: String,
    pub thumbnail_url: String,
}

/// Content registration response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterContentResponse {
    pub origin: String,
    pub path: String,
}

/// Resolved content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentResponse {
    pub video_url: String,
    pub thumbnail_url: String,
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
}

/// Error wrapper mapping error kinds to status codes
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Canceled => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::CorruptData | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        (
            status,
            Json(ApiErrorResponse {
                error: self.0.kind().to_string(),
                message: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

// =============================================================================
// Request Deadline
// =============================================================================

/// Cancellation token that fires after the request timeout
struct Deadline {
    token: CancellationToken,
    timer: JoinHandle<()>,
}

impl Deadline {
    fn after(timeout: Duration) -> Self {
        let token = CancellationToken::new();
        let fire = token.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            fire.cancel();
        });
        Self { token, timer }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

// =============================================================================
// REST Router
// =============================================================================

/// REST API router builder
pub struct RestRouter {
    service: Arc<ContentService>,
    request_timeout: Duration,
    max_body_size: usize,
}

impl RestRouter {
    /// Create a new REST router
    pub fn new(service: Arc<ContentService>) -> Self {
        Self {
            service,
            request_timeout: Duration::from_secs(30),
            max_body_size: 64 * 1024,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        let state = AppState {
            service: self.service,
            request_timeout: self.request_timeout,
        };

        Router::new()
            // Content endpoints
            .route("/v1/content", post(register_content))
            .route("/v1/content/*encoded", get(get_content))
            // Health endpoints
            .route("/health", get(health_check))
            .route("/ready", get(readiness_check))
            .route("/metrics", get(metrics))
            .layer(DefaultBodyLimit::max(self.max_body_size))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    service: Arc<ContentService>,
    request_timeout: Duration,
}

// =============================================================================
// Handlers
// =============================================================================

/// Register content
async fn register_content(
    State(state): State<AppState>,
    Json(request): Json<RegisterContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let deadline = Deadline::after(state.request_timeout);
    let record = state
        .service
        .register_content(
            &request.endpoint,
            &request.video_url,
            &request.thumbnail_url,
            &deadline.token,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterContentResponse {
            origin: record.origin().to_string(),
            path: record.pattern().to_string(),
        }),
    ))
}

/// Resolve a base64-encoded request URL
async fn get_content(
    State(state): State<AppState>,
    Path(encoded): Path<String>,
) -> Result<Response, ApiError> {
    let deadline = Deadline::after(state.request_timeout);
    let resolution = state
        .service
        .resolve_encoded(&encoded, &deadline.token)
        .await?;

    let cache_status = if resolution.is_cache_hit() { "HIT" } else { "MISS" };
    let mut response = (
        StatusCode::OK,
        Json(ContentResponse {
            video_url: resolution.payload.video_url,
            thumbnail_url: resolution.payload.thumbnail_url,
        }),
    )
        .into_response();
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(cache_status));
    Ok(response)
}

/// Health check
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness check
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.service.is_ready().await {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "backend unavailable")
    }
}

/// Prometheus metrics
async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let metrics = state.service.metrics();
    if let Some(cache) = state.service.cache() {
        metrics.observe_cache(&cache.stats());
    }
    let body = metrics.render()?;
    let content_type = HeaderValue::from_str(&metrics.content_type())
        .unwrap_or_else(|_| HeaderValue::from_static("text/plain"));
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}
