//! HTTP middleware for authentication, rate limiting, request ids, and logging

use crate::auth::{claims_to_session, dev_session, extract_bearer_token, validate_token};
use crate::error::{ApiError, ErrorCode};
use crate::state::{AppState, UserSession};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use governor::{state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Key used for requests without a session (public share routes)
const ANONYMOUS: &str = "anonymous";

/// Rate limiter type
pub type KeyedRateLimiter =
    RateLimiter<String, DefaultKeyedStateStore<String>, governor::clock::DefaultClock>;

/// Create a rate limiter
pub fn create_rate_limiter(requests_per_second: u32) -> Arc<KeyedRateLimiter> {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::keyed(Quota::per_second(rps)))
}

/// Authentication middleware for owner routes
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.config.auth_enabled {
        request.extensions_mut().insert(dev_session());
        return Ok(next.run(request).await);
    }

    let header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::new(ErrorCode::MissingToken, "Authentication required"))?;

    let token = extract_bearer_token(header).ok_or_else(|| {
        ApiError::new(ErrorCode::InvalidToken, "Invalid Authorization header format")
    })?;

    let secret = state
        .config
        .jwt_secret
        .as_ref()
        .ok_or_else(|| ApiError::Internal("JWT secret not configured".to_string()))?;

    let session = claims_to_session(validate_token(token, secret)?)?;
    if session.is_expired() {
        return Err(ApiError::new(ErrorCode::InvalidToken, "Token has expired"));
    }

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Rate limiting middleware, keyed by principal
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<KeyedRateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let key = request
        .extensions()
        .get::<UserSession>()
        .map(|s| s.principal.clone())
        .unwrap_or_else(|| ANONYMOUS.to_string());

    if limiter.check_key(&key).is_err() {
        return Err(ApiError::new(
            ErrorCode::SlowDown,
            "Please reduce your request rate",
        ));
    }

    Ok(next.run(request).await)
}

/// Request ID middleware - adds an x-request-id header unless an error body already set one
pub async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;
    if !response.headers().contains_key("x-request-id") {
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }
    }
    response
}

/// Request ID extension
#[derive(Clone)]
pub struct RequestId(pub String);

/// Logging middleware
///
/// Logs the route template rather than the raw URI so share tokens stay out
/// of the logs.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let route = request
        .extensions()
        .get::<axum::extract::MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        route = %route,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "Request completed"
    );

    response
}
