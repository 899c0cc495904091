use std::sync::Arc;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::{ApiError, AppState};

pub const API_KEY_HEADER: &str = "x-api-key";

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "content-type, x-api-key";

/// Rejects requests without the configured `X-API-Key`
pub async fn api_key_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.api_key.as_deref() {
        if let Err(e) = check_api_key(req.headers(), expected) {
            state.logger.log_unauthorized(req.uri().path(), e.error_code());
            return Err(e);
        }
    }
    Ok(next.run(req).await)
}

fn check_api_key(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    let provided = headers
        .get(API_KEY_HEADER)
        .ok_or(ApiError::MissingApiKey)?
        .to_str()
        .map_err(|_| ApiError::InvalidApiKey)?;

    if provided != expected {
        return Err(ApiError::InvalidApiKey);
    }
    Ok(())
}

/// Allowed cross-origin callers
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: Vec<String>,
}

impl CorsPolicy {
    pub fn new(origins: Vec<String>) -> Self {
        Self { origins }
    }

    fn allows_any(&self) -> bool {
        self.origins.iter().any(|o| o == "*")
    }

    /// Value for `Access-Control-Allow-Origin`, if the origin may call us
    fn allow_origin(&self, origin: Option<&HeaderValue>) -> Option<HeaderValue> {
        if self.allows_any() {
            return Some(HeaderValue::from_static("*"));
        }
        let origin = origin?;
        let text = origin.to_str().ok()?;
        self.origins.iter().any(|o| o == text).then(|| origin.clone())
    }

    fn apply(&self, origin: Option<&HeaderValue>, headers: &mut HeaderMap) {
        let Some(allowed) = self.allow_origin(origin) else {
            return;
        };
        if allowed != "*" {
            headers.insert(header::VARY, HeaderValue::from_static("origin"));
        }
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
    }
}

/// Answers preflight requests and tags every response with CORS headers
pub async fn cors_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let origin = req.headers().get(header::ORIGIN).cloned();

    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    state.cors.apply(origin.as_ref(), response.headers_mut());
    response
}

/// Counts requests per route and status
pub async fn track_requests(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;
    state
        .metrics
        .inc_http_requests(&method, &route, response.status().as_u16());
    response
}
