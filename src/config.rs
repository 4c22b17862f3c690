use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Process configuration: loaded from environment variables
// ---------------------------------------------------------------------------

/// Complete server configuration loaded at startup.
///
/// The three signing settings keep the names the conferencing SDK uses
/// (`LIVEKIT_API_KEY`, `LIVEKIT_API_SECRET`, `LIVEKIT_URL`). Everything else
/// is prefixed with `ROOMGATE_`.
///
/// Missing signing settings do not stop the server from starting: the token
/// endpoint answers `500 Server misconfigured` until they are supplied.
#[derive(Debug, Clone)]
pub struct Config {
    // ── Network ─────────────────────────────────────────────────────────
    /// Address to bind the HTTP listener to.
    pub bind_addr: String,

    // ── Credentials ─────────────────────────────────────────────────────
    /// Signing key identifier, written to the `iss` claim.
    pub api_key: Option<String>,
    /// HMAC secret used to sign credentials.
    pub api_secret: Option<String>,
    /// WebSocket URL of the collaboration server handed to clients.
    pub server_url: Option<String>,
    /// Lifetime of an issued credential.
    pub token_ttl_secs: u64,

    // ── CORS ─────────────────────────────────────────────────────────────
    pub allowed_origins: String,

    // ── Logging ──────────────────────────────────────────────────────────
    pub log_level: String,
}

/// The settings required to sign a credential, available only when all
/// three are configured.
#[derive(Debug, Clone, Copy)]
pub struct SigningCredentials<'a> {
    pub api_key: &'a str,
    pub api_secret: &'a str,
    pub server_url: &'a str,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Automatically loads a `.env` file if present (via `dotenvy`).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let config = Config {
            bind_addr: env_or("ROOMGATE_BIND_ADDR", "0.0.0.0:3000"),
            api_key: env_non_empty("LIVEKIT_API_KEY"),
            api_secret: env_non_empty("LIVEKIT_API_SECRET"),
            server_url: env_non_empty("LIVEKIT_URL"),
            token_ttl_secs: env_or("ROOMGATE_TOKEN_TTL_SECS", "3600")
                .parse::<u64>()
                .unwrap_or(3600),
            allowed_origins: env_or("ROOMGATE_ALLOWED_ORIGINS", "*"),
            log_level: env_or("ROOMGATE_LOG_LEVEL", "info"),
        };

        if config.credentials().is_none() {
            warn!(
                "LIVEKIT_API_KEY, LIVEKIT_API_SECRET and LIVEKIT_URL must all be set, token endpoint will report misconfiguration"
            );
        }

        config.log_summary();
        config
    }

    /// Signing settings, or `None` if any of the three is missing.
    pub fn credentials(&self) -> Option<SigningCredentials<'_>> {
        Some(SigningCredentials {
            api_key: self.api_key.as_deref()?,
            api_secret: self.api_secret.as_deref()?,
            server_url: self.server_url.as_deref()?,
        })
    }

    fn log_summary(&self) {
        info!("──── roomgate configuration ────");
        info!("  bind_addr          : {}", self.bind_addr);
        info!(
            "  api_key            : {}",
            self.api_key.as_deref().unwrap_or("(not set)")
        );
        info!(
            "  api_secret         : {}",
            if self.api_secret.is_some() { "****" } else { "(not set)" }
        );
        info!(
            "  server_url         : {}",
            self.server_url.as_deref().unwrap_or("(not set)")
        );
        info!("  token_ttl_secs     : {}", self.token_ttl_secs);
        info!(
            "  cors_origins       : {}",
            if self.allowed_origins == "*" {
                "* (permissive)"
            } else {
                &self.allowed_origins
            }
        );
        info!("  log_level          : {}", self.log_level);
        info!("────────────────────────────────");
    }
}

// ---------------------------------------------------------------------------
// Environment helpers
// ---------------------------------------------------------------------------

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
