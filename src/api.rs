use axum::{
    extract::{Query, State},
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::error::ApiError;
use crate::navigation::{self, RoomQuery};

// ---------------------------------------------------------------------------
// Request / Response DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    #[serde(rename = "roomName")]
    pub room_name: Option<String>,
    #[serde(rename = "participantName")]
    pub participant_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub configured: bool,
}

// ---------------------------------------------------------------------------
// GET /api/get-token: issue a join credential
// ---------------------------------------------------------------------------

pub async fn get_token(
    State(state): State<Arc<crate::AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<TokenResponse>, ApiError> {
    let room = required(query.room_name, "roomName")?;
    let identity = required(query.participant_name, "participantName")?;

    let creds = state
        .config
        .credentials()
        .ok_or_else(ApiError::misconfigured)?;

    let token = crate::token::create_token(
        creds.api_key,
        creds.api_secret,
        &identity,
        &room,
        state.config.token_ttl_secs,
    )
    .map_err(|e| {
        error!("Failed to sign token for '{identity}' in room '{room}': {e}");
        ApiError::token_generation_failed()
    })?;

    info!("Issued token for '{identity}' in room '{room}'");

    Ok(Json(TokenResponse { token }))
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::missing_param(name))
}

// ---------------------------------------------------------------------------
// GET /room: room view
// ---------------------------------------------------------------------------

pub async fn room_view(
    State(state): State<Arc<crate::AppState>>,
    Query(query): Query<RoomQuery>,
) -> Result<Html<String>, ApiError> {
    let params = query.into_params()?;
    let server_url = state
        .config
        .server_url
        .as_deref()
        .ok_or_else(ApiError::misconfigured)?;

    Ok(Html(navigation::render_room_page(&params, server_url)))
}

// ---------------------------------------------------------------------------
// GET /: join page
// ---------------------------------------------------------------------------

pub async fn join_page() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub async fn health(State(state): State<Arc<crate::AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        configured: state.config.credentials().is_some(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state(configured: bool) -> Arc<crate::AppState> {
        let some = |v: &str| configured.then(|| v.to_string());
        Arc::new(crate::AppState {
            config: Config {
                bind_addr: "127.0.0.1:0".into(),
                api_key: some("devkey"),
                api_secret: some("devsecret"),
                server_url: some("wss://sfu.example.test"),
                token_ttl_secs: 3600,
                allowed_origins: "*".into(),
                log_level: "info".into(),
            },
        })
    }

    async fn get(state: Arc<crate::AppState>, uri: &str) -> (StatusCode, Vec<u8>) {
        let app = crate::build_router(state);
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn get_json(state: Arc<crate::AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, bytes) = get(state, uri).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn issues_token_for_valid_request() {
        let (status, body) =
            get_json(state(true), "/api/get-token?roomName=standup&participantName=alice").await;

        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap();
        assert!(!token.is_empty());

        let claims = crate::token::verify_token("devsecret", token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iss, "devkey");
        assert_eq!(claims.video.room, "standup");
        assert!(claims.video.room_join);
    }

    #[tokio::test]
    async fn missing_room_name_is_400() {
        let (status, body) = get_json(state(true), "/api/get-token?participantName=alice").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("roomName"));
    }

    #[tokio::test]
    async fn missing_participant_name_is_400() {
        let (status, body) = get_json(state(true), "/api/get-token?roomName=standup").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("participantName"));
    }

    #[tokio::test]
    async fn empty_param_counts_as_missing() {
        let (status, body) =
            get_json(state(true), "/api/get-token?roomName=&participantName=alice").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("roomName"));
    }

    #[tokio::test]
    async fn input_is_checked_before_configuration() {
        let (status, _) = get_json(state(false), "/api/get-token?participantName=alice").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unconfigured_server_is_500() {
        let (status, body) =
            get_json(state(false), "/api/get-token?roomName=r&participantName=p").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Server misconfigured");
    }

    #[tokio::test]
    async fn room_view_requires_token_and_room() {
        let (status, body) = get_json(state(true), "/room?roomName=standup").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing token or room name");

        let (status, html) = get(state(true), "/room?roomName=standup&token=abc").await;
        assert_eq!(status, StatusCode::OK);
        let html = String::from_utf8(html).unwrap();
        assert!(html.contains("standup"));
        assert!(html.contains("wss://sfu.example.test"));
    }

    #[tokio::test]
    async fn health_reports_configuration() {
        let (status, body) = get_json(state(false), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["configured"], false);
    }

    #[tokio::test]
    async fn version_header_is_attached() {
        let app = crate::build_router(state(true));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-roomgate-version"));
    }
}
