use crate::application_port::{RotationError, TokenCodec};
use crate::domain_model::TokenId;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

const SECRET_LEN: usize = 64;

/// Hashing cost for refresh-token secrets. Secrets are 64 chars of CSPRNG
/// output, so the cost can sit well below interactive-password settings;
/// it is still injected from configuration rather than hardcoded.
#[derive(Debug, Clone)]
pub struct SecretHashConfig {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for SecretHashConfig {
    fn default() -> Self {
        SecretHashConfig {
            m_cost: 8192,
            t_cost: 2,
            p_cost: 1,
        }
    }
}

/// The `"<uuid>.<opaque>"` wire format plus argon2id secret hashing.
pub struct UuidDotCodec {
    cfg: SecretHashConfig,
}

impl UuidDotCodec {
    pub fn new(cfg: SecretHashConfig) -> Self {
        UuidDotCodec { cfg }
    }

    fn hasher(&self) -> Result<Argon2<'static>, RotationError> {
        let params = Params::new(self.cfg.m_cost, self.cfg.t_cost, self.cfg.p_cost, None)
            .map_err(|e| RotationError::Internal(e.to_string()))?;
        Ok(Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            params,
        ))
    }
}

#[async_trait::async_trait]
impl TokenCodec for UuidDotCodec {
    fn encode_access_token(&self, token_id: TokenId, signed_blob: &str) -> String {
        format!("{}.{}", token_id, signed_blob)
    }

    fn encode_refresh_token(&self, token_id: TokenId, secret: &str) -> String {
        format!("{}.{}", token_id, secret)
    }

    fn decode<'a>(&self, token: &'a str) -> Result<(TokenId, &'a str), RotationError> {
        let (id_segment, remainder) = token.split_once('.').ok_or(RotationError::Malformed)?;
        let token_id = id_segment
            .parse::<TokenId>()
            .map_err(|_| RotationError::Malformed)?;
        Ok((token_id, remainder))
    }

    fn generate_secret(&self) -> String {
        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SECRET_LEN)
            .map(char::from)
            .collect()
    }

    async fn hash_secret(&self, secret: &str) -> Result<String, RotationError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()?
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| RotationError::Internal(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    async fn verify_secret(&self, secret: &str, hash: &str) -> Result<bool, RotationError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| RotationError::Internal(format!("invalid PHC hash: {}", e)))?;

        match self.hasher()?.verify_password(secret.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(RotationError::Internal(format!("verify error: {}", e))),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_codec() -> UuidDotCodec {
    // Minimal cost so the suite stays fast.
    UuidDotCodec::new(SecretHashConfig {
        m_cost: 32,
        t_cost: 1,
        p_cost: 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_splits_on_first_dot_only() {
        let codec = test_codec();
        let id = TokenId::generate();
        let encoded = codec.encode_access_token(id, "head.payload.sig");
        let (decoded_id, remainder) = codec.decode(&encoded).unwrap();
        assert_eq!(decoded_id, id);
        assert_eq!(remainder, "head.payload.sig");
    }

    #[test]
    fn decode_rejects_missing_dot() {
        let codec = test_codec();
        assert!(matches!(
            codec.decode("justonesegment"),
            Err(RotationError::Malformed)
        ));
    }

    #[test]
    fn decode_rejects_non_uuid_identifier() {
        let codec = test_codec();
        assert!(matches!(
            codec.decode("not-a-uuid.secret"),
            Err(RotationError::Malformed)
        ));
        assert!(matches!(codec.decode(".secret"), Err(RotationError::Malformed)));
    }

    #[test]
    fn generated_secrets_are_long_and_distinct() {
        let codec = test_codec();
        let a = codec.generate_secret();
        let b = codec.generate_secret();
        assert_eq!(a.len(), SECRET_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn hash_verifies_and_never_echoes_the_secret() {
        let codec = test_codec();
        let secret = codec.generate_secret();
        let hash = codec.hash_secret(&secret).await.unwrap();
        assert!(!hash.contains(&secret));
        assert!(codec.verify_secret(&secret, &hash).await.unwrap());
        assert!(!codec.verify_secret("wrong-secret", &hash).await.unwrap());
    }
}
