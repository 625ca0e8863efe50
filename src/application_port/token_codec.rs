use super::RotationError;
use crate::domain_model::{SessionId, TokenId, UserId};

/// Stateless encode/decode of the two token wire formats plus secret
/// hashing. Both formats are `"<uuid>.<opaque>"`: the identifier before the
/// first `.` is the public, loggable half; everything after it is
/// client-held material (a random secret for refresh tokens, a signed blob
/// for access tokens).
#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    fn encode_access_token(&self, token_id: TokenId, signed_blob: &str) -> String;

    fn encode_refresh_token(&self, token_id: TokenId, secret: &str) -> String;

    /// Split on the first `.`. Fails with `RotationError::Malformed` when no
    /// dot is present or the identifier segment is not a UUID.
    fn decode<'a>(&self, token: &'a str) -> Result<(TokenId, &'a str), RotationError>;

    /// Fresh client-held secret for a refresh token, from a CSPRNG.
    fn generate_secret(&self) -> String;

    /// One-way hash of a refresh secret. The plaintext secret is never
    /// stored.
    async fn hash_secret(&self, secret: &str) -> Result<String, RotationError>;

    /// Constant-time verification of a presented secret against a stored
    /// hash.
    async fn verify_secret(&self, secret: &str, hash: &str) -> Result<bool, RotationError>;
}

/// External signing collaborator producing the opaque blob after the `.` in
/// an access token, along with the blob's expiry.
#[async_trait::async_trait]
pub trait AccessTokenSigner: Send + Sync {
    async fn sign(
        &self,
        user_id: UserId,
        session_id: SessionId,
        token_id: TokenId,
    ) -> Result<(String, chrono::DateTime<chrono::Utc>), RotationError>;
}
