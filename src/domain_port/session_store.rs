use crate::application_port::RotationError;
use crate::domain_model::*;

/// Durable storage for sessions, refresh tokens and access-token revocation
/// records, plus the atomic primitives the rotation engine builds on.
///
/// All rows are append-mostly: nothing is ever deleted, records outlive
/// revocation for forensic audit.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(
        &self,
        user_id: UserId,
        device: &serde_json::Value,
    ) -> Result<Session, RotationError>;

    async fn create_refresh_token(
        &self,
        session_id: SessionId,
        secret_hash: &str,
    ) -> Result<RefreshTokenRecord, RotationError>;

    async fn create_access_token_record(
        &self,
        session_id: SessionId,
    ) -> Result<AccessTokenRecord, RotationError>;

    /// Token joined with its owning session's revocation state.
    async fn find_refresh_token(
        &self,
        token_id: TokenId,
    ) -> Result<Option<RefreshTokenLookup>, RotationError>;

    /// Atomically transition `rotated` from false to true. Returns true only
    /// if this call performed the transition; false when the token was
    /// already rotated (by this or a concurrent call) or does not exist.
    ///
    /// Implementations MUST issue a single conditional update
    /// (`... WHERE token_id = ? AND rotated = false`), never a read followed
    /// by a write: two `rotate` calls for the same token may run fully in
    /// parallel and exactly one of them may win.
    async fn try_mark_rotated(&self, token_id: TokenId) -> Result<bool, RotationError>;

    /// Set the session's `revoked` flag and revoke every access-token record
    /// belonging to it, in one transaction. Idempotent: revoking an
    /// already-revoked session is a no-op, not an error.
    async fn revoke_session_cascade(
        &self,
        session_id: SessionId,
        reason: RevocationReason,
    ) -> Result<(), RotationError>;

    /// Revoke a single access token (logout of one credential). Idempotent.
    async fn revoke_access_token(&self, token_id: TokenId) -> Result<(), RotationError>;

    /// Indexed point read, served on every inbound request. Unknown ids are
    /// not revoked.
    async fn is_access_token_revoked(&self, token_id: TokenId) -> Result<bool, RotationError>;
}
