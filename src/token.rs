use jsonwebtoken::{decode, encode, get_current_timestamp, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

/// Room permissions carried in the `video` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    pub room: String,
    pub room_join: bool,
    pub can_publish: bool,
    pub can_subscribe: bool,
}

impl VideoGrant {
    /// Join, publish and subscribe rights on `room`.
    pub fn participant(room: &str) -> Self {
        Self {
            room: room.to_string(),
            room_join: true,
            can_publish: true,
            can_subscribe: true,
        }
    }
}

/// Access-token claims understood by the conferencing server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Signing key identifier.
    pub iss: String,
    /// Participant identity.
    pub sub: String,
    /// Display name (same as the identity here).
    pub name: String,
    /// Unique token id.
    pub jti: String,
    /// Not-before (unix timestamp).
    pub nbf: u64,
    /// Expiration (unix timestamp).
    pub exp: u64,
    pub video: VideoGrant,
}

// ---------------------------------------------------------------------------
// Sign / verify
// ---------------------------------------------------------------------------

/// Create a signed HS256 credential granting `identity` access to `room`.
pub fn create_token(
    api_key: &str,
    api_secret: &str,
    identity: &str,
    room: &str,
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = get_current_timestamp();

    let claims = TokenClaims {
        iss: api_key.to_string(),
        sub: identity.to_string(),
        name: identity.to_string(),
        jti: Uuid::new_v4().to_string(),
        nbf: now,
        exp: now.saturating_add(ttl_secs),
        video: VideoGrant::participant(room),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(api_secret.as_bytes()),
    )
}

/// Verify and decode a credential, returning the inner claims.
pub fn verify_token(
    api_secret: &str,
    token: &str,
) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(api_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
