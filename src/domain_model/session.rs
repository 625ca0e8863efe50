use super::{SessionId, TokenId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a session family was revoked. Stored on the session row and echoed
/// into audit events.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    /// A spent (or concurrently-spent) refresh token was presented again.
    ReuseDetected,
    /// The presented refresh secret did not match the stored hash.
    InvalidRefreshSecret,
    /// Explicit logout or administrative action.
    Logout,
}

impl RevocationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevocationReason::ReuseDetected => "reuse_detected",
            RevocationReason::InvalidRefreshSecret => "invalid_refresh_secret",
            RevocationReason::Logout => "logout",
        }
    }
}

impl std::str::FromStr for RevocationReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reuse_detected" => Ok(RevocationReason::ReuseDetected),
            "invalid_refresh_secret" => Ok(RevocationReason::InvalidRefreshSecret),
            "logout" => Ok(RevocationReason::Logout),
            other => Err(format!("unknown revocation reason: {}", other)),
        }
    }
}

/// One authenticated login. `revoked` is monotonic: once true it never
/// returns to false. Rows are retained for audit, never deleted.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub device: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub revoked: bool,
}

/// One issued refresh credential, child of exactly one session. Only the
/// hash of the secret half is ever stored. `rotated` is monotonic and its
/// false-to-true transition happens exactly once per token.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub token_id: TokenId,
    pub session_id: SessionId,
    pub secret_hash: String,
    pub created_at: DateTime<Utc>,
    pub rotated: bool,
}

/// A refresh token joined with the state of its owning session, as the
/// rotation engine needs both in one lookup.
#[derive(Debug, Clone)]
pub struct RefreshTokenLookup {
    pub token: RefreshTokenRecord,
    pub user_id: UserId,
    pub session_revoked: bool,
}

/// Revocation state of one issued access token (the JTI record). Created on
/// every issuance; revoked individually on logout or in bulk when the owning
/// session is revoked; never deleted.
#[derive(Debug, Clone)]
pub struct AccessTokenRecord {
    pub token_id: TokenId,
    pub session_id: SessionId,
    pub issued_at: DateTime<Utc>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
}
