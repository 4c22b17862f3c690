//! Join flow as seen from a client: fetch a credential from the token
//! endpoint and build the room view URL to navigate to.

use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::navigation;

const FETCH_FAILED: &str = "Failed to fetch token";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base url: {0}")]
    InvalidUrl(String),
    /// The token endpoint answered with an error message.
    #[error("{0}")]
    Rejected(String),
    #[error("Failed to fetch token")]
    Fetch(#[source] reqwest::Error),
}

#[derive(Deserialize)]
struct TokenBody {
    token: Option<String>,
    error: Option<String>,
}

/// HTTP client for `GET /api/get-token`.
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: reqwest::Client,
    base_url: Url,
}

impl TokenClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        Ok(Self::with_client(reqwest::Client::new(), base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Request a credential for `participant_name` in `room_name`.
    pub async fn fetch_token(
        &self,
        room_name: &str,
        participant_name: &str,
    ) -> Result<String, ClientError> {
        let mut url = self.base_url.clone();
        url.set_path("/api/get-token");
        url.query_pairs_mut()
            .clear()
            .append_pair("roomName", room_name)
            .append_pair("participantName", participant_name);

        debug!("Requesting token from {url}");

        let response = self.http.get(url).send().await.map_err(ClientError::Fetch)?;
        let status = response.status();
        let body: TokenBody = response.json().await.map_err(ClientError::Fetch)?;

        if !status.is_success() {
            let message = body.error.unwrap_or_else(|| FETCH_FAILED.to_string());
            warn!("Token request rejected ({status}): {message}");
            return Err(ClientError::Rejected(message));
        }

        body.token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Rejected(FETCH_FAILED.to_string()))
    }

    /// Fetch a credential and return the room view URL to navigate to.
    pub async fn join(&self, room_name: &str, participant_name: &str) -> Result<Url, ClientError> {
        let token = self.fetch_token(room_name, participant_name).await?;
        Ok(navigation::room_url(&self.base_url, &token, room_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::sync::Arc;

    async fn serve(configured: bool) -> String {
        let some = |v: &str| configured.then(|| v.to_string());
        let state = Arc::new(crate::AppState {
            config: Config {
                bind_addr: "127.0.0.1:0".into(),
                api_key: some("devkey"),
                api_secret: some("devsecret"),
                server_url: some("wss://sfu.example.test"),
                token_ttl_secs: 600,
                allowed_origins: "*".into(),
                log_level: "info".into(),
            },
        });
        let app = crate::build_router(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn join_builds_room_url_with_credential() {
        let base = serve(true).await;
        let client = TokenClient::new(&base).unwrap();

        let url = client.join("design review", "bob").await.unwrap();
        assert_eq!(url.path(), "/room");

        let pairs: std::collections::HashMap<String, String> =
            url.query_pairs().into_owned().collect();
        assert_eq!(pairs["roomName"], "design review");

        let claims = crate::token::verify_token("devsecret", &pairs["token"]).unwrap();
        assert_eq!(claims.sub, "bob");
        assert_eq!(claims.video.room, "design review");
    }

    #[tokio::test]
    async fn server_error_message_is_surfaced() {
        let base = serve(false).await;
        let client = TokenClient::new(&base).unwrap();

        let err = client.fetch_token("room", "bob").await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected(ref m) if m == "Server misconfigured"));

        let err = client.fetch_token("", "bob").await.unwrap_err();
        assert!(err.to_string().contains("roomName"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            TokenClient::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }
}
