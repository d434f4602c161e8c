//! HTTP route definitions

use crate::{handlers, middleware, AppState};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{HeaderValue, Request},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main router
pub fn create_router(state: Arc<AppState>) -> Router {
    let rate_limiter = middleware::create_rate_limiter(state.config.rate_limit_rps);

    // Owner routes: session required, rate limited per principal
    let owner = Router::new()
        .route("/api/keys", put(handlers::register_key))
        .route("/api/keys/{principal}", get(handlers::get_key))
        .route("/api/files", post(handlers::upload_file).get(handlers::list_files))
        .route("/api/files/usage", get(handlers::storage_usage))
        .route(
            "/api/files/{id}",
            get(handlers::get_file).delete(handlers::delete_file),
        )
        .route("/api/files/{id}/rename", put(handlers::rename_file))
        .route("/api/links", post(handlers::create_link).get(handlers::list_links))
        .route("/api/links/{token}", delete(handlers::revoke_link))
        .route_layer(axum_middleware::from_fn_with_state(
            Arc::clone(&rate_limiter),
            middleware::rate_limit_middleware,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::auth_middleware,
        ));

    // Share routes: the token is the credential
    let public = Router::new()
        .route(
            "/api/share/{token}",
            get(handlers::resolve_share).post(handlers::resolve_share_with_password),
        )
        .route("/api/share/{token}/confirm", post(handlers::confirm_share))
        .route("/api/share/{token}/download", post(handlers::download_share))
        .route_layer(axum_middleware::from_fn_with_state(
            rate_limiter,
            middleware::rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(owner)
        .merge(public)
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(cors_layer(&state))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            let route = req
                .extensions()
                .get::<MatchedPath>()
                .map(MatchedPath::as_str)
                .unwrap_or("unmatched");
            tracing::debug_span!("request", method = %req.method(), route)
        }))
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .with_state(state)
}

fn cors_layer(state: &AppState) -> CorsLayer {
    if !state.config.cors_enabled {
        return CorsLayer::new();
    }
    let origins = &state.config.cors_origins;
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    if origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        layer.allow_origin(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GatewayConfig;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    async fn router(auth_enabled: bool) -> Router {
        let config = GatewayConfig {
            auth_enabled,
            jwt_secret: Some("test-secret".into()),
            ..Default::default()
        };
        create_router(Arc::new(AppState::new(config).await.unwrap()))
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = router(true)
            .await
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_owner_routes_require_session() {
        let response = router(true)
            .await
            .oneshot(Request::get("/api/files").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_dev_session_when_auth_disabled() {
        let response = router(false)
            .await
            .oneshot(Request::get("/api/files").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_share_routes_are_public() {
        let response = router(true)
            .await
            .oneshot(
                Request::get("/api/share/does-not-exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
