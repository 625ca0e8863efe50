use crate::domain_model::{SessionId, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    /// The client sent a string that does not parse as a token at all.
    /// Always fails closed (unauthenticated), never skips authorization.
    #[error("malformed token")]
    Malformed,
    #[error("token invalid")]
    InvalidToken,
    #[error("session revoked")]
    SessionRevoked,
    #[error("refresh token reuse detected")]
    ReuseDetected,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct RefreshToken(pub String);

/// What a successful `issue` or `rotate` hands back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub session_id: SessionId,
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
}

/// The session/refresh-token lifecycle: create a token family at login,
/// exchange a live refresh token for a new pair, and tear a family down.
///
/// `rotate` has exactly five outcomes and no other return path: a new pair
/// (sole rotation winner), `InvalidToken` (unparseable or unknown id, or a
/// real id with a wrong secret — the latter revokes the session family),
/// `SessionRevoked` (family already terminated), `ReuseDetected` (a spent or
/// concurrently-spent token presented again; revokes the family), or
/// `Store`/`Internal` on infrastructure failure.
#[async_trait::async_trait]
pub trait RotationService: Send + Sync {
    async fn issue(
        &self,
        user_id: UserId,
        device: serde_json::Value,
    ) -> Result<TokenPair, RotationError>;

    async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, RotationError>;

    /// Explicit logout: revokes the session and every access token derived
    /// from it. Idempotent.
    async fn logout(&self, session_id: SessionId) -> Result<(), RotationError>;
}
