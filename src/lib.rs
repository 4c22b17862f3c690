//! Token issuance and client-side session coordination for a LiveKit-style
//! video conferencing front-end.
//!
//! The HTTP side ([`build_router`]) issues signed join credentials and serves
//! the join page and the room view. The [`session`] module holds the
//! coordinator that drives a room connection, the remote participant roster,
//! local screen sharing and local recording.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod navigation;
pub mod session;
pub mod token;

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, Method},
    middleware::{self, Next},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

// ─── AppState ───────────────────────────────────────────────────────────────

pub struct AppState {
    pub config: config::Config,
}

// ─── Version header middleware ──────────────────────────────────────────────

async fn version_header_middleware(request: Request, next: Next) -> impl IntoResponse {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        HeaderName::from_static("x-roomgate-version"),
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    response
}

// ─── CORS configuration ────────────────────────────────────────────────────

fn build_cors_layer(allowed_origins: &str) -> CorsLayer {
    if allowed_origins == "*" {
        warn!("CORS: permissive mode (allow all origins), not suitable for production");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("CORS: ignoring invalid origin '{s}': {e}");
                None
            }
        })
        .collect();

    info!("CORS: restricted to {} origin(s)", origins.len());

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET])
        .allow_headers([HeaderName::from_static("content-type")])
}

// ─── Router ─────────────────────────────────────────────────────────────────

/// Build the HTTP application.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.config.allowed_origins);

    Router::new()
        // Pages
        .route("/", get(api::join_page))
        .route(navigation::ROOM_PATH, get(api::room_view))
        // Health (no configuration required)
        .route("/health", get(api::health))
        // Credential issuance
        .route("/api/get-token", get(api::get_token))
        // Middleware
        .layer(middleware::from_fn(version_header_middleware))
        .layer(cors)
        .with_state(state)
}
