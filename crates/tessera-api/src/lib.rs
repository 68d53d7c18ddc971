//! # tessera-api
//!
//! HTTP facade over the tessera suggestion pipeline. Routes live under
//! `/api/v1`; every error body is `{"error": message}`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{ServerConfig, StoreKind};
pub use error::ApiError;
pub use state::{AppState, PipelineConfig};

/// Build the router without CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/api/v1/items/:id/connections/suggestions",
            get(handlers::suggest_connections),
        )
        .route(
            "/api/v1/items/:id/connections",
            post(handlers::create_connection),
        )
        .route(
            "/api/v1/items/:id/connections/dismiss",
            post(handlers::dismiss_connection),
        )
        .route(
            "/api/v1/clusters/suggestions",
            get(handlers::suggest_clusters),
        )
        .route(
            "/api/v1/clusters/accept",
            post(handlers::accept_cluster_suggestion),
        )
        .route("/api/v1/starters", get(handlers::list_starters))
        .route("/api/v1/starters/refresh", post(handlers::refresh_starters))
        .route("/api/v1/synthesis", post(handlers::generate_synthesis))
        .route("/api/v1/synthesis/commit", post(handlers::commit_synthesis))
        .route("/api/v1/suggestions", get(handlers::suggestion_feed))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Build the full application: routes plus CORS for `allowed_origins`.
pub fn app(state: AppState, allowed_origins: &[String]) -> Router {
    router(state).layer(cors_layer(allowed_origins))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
