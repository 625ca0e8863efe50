use crate::application_port::{AccessTokenSigner, RotationError};
use crate::domain_model::{SessionId, TokenId, UserId};
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SignerConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub signing_key: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String,
    sid: String,
    jti: String,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
}

/// HS256 blob signer. Stands in for whatever service owns access-token
/// signature validity; this subsystem only tracks revocation by JTI, so the
/// blob stays opaque to everything downstream of `sign`.
pub struct JwtHs256Signer {
    cfg: SignerConfig,
}

impl JwtHs256Signer {
    pub fn new(cfg: SignerConfig) -> Self {
        JwtHs256Signer { cfg }
    }
}

#[async_trait::async_trait]
impl AccessTokenSigner for JwtHs256Signer {
    async fn sign(
        &self,
        user_id: UserId,
        session_id: SessionId,
        token_id: TokenId,
    ) -> Result<(String, DateTime<Utc>), RotationError> {
        let iat_dt = Utc::now();
        let exp_dt = iat_dt + self.cfg.access_ttl;
        let claims = AccessClaims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            jti: token_id.to_string(),
            exp: exp_dt.timestamp(),
            iat: iat_dt.timestamp(),
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
        };
        let blob = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.cfg.signing_key),
        )
        .map_err(|e| RotationError::Internal(e.to_string()))?;
        Ok((blob, exp_dt))
    }
}

#[cfg(test)]
pub(crate) fn test_signer() -> JwtHs256Signer {
    JwtHs256Signer::new(SignerConfig {
        issuer: "capstan.test".to_string(),
        audience: "capstan-client".to_string(),
        access_ttl: Duration::from_secs(900),
        signing_key: b"test-signing-key".to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    #[tokio::test]
    async fn blob_round_trips_with_expected_claims() {
        let signer = test_signer();
        let user = UserId(uuid::Uuid::new_v4());
        let session = SessionId::generate();
        let jti = TokenId::generate();

        let (blob, exp_dt) = signer.sign(user, session, jti).await.unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["capstan-client"]);
        validation.set_issuer(&["capstan.test"]);
        let data = decode::<AccessClaims>(
            &blob,
            &DecodingKey::from_secret(b"test-signing-key"),
            &validation,
        )
        .unwrap();

        assert_eq!(data.claims.sub, user.to_string());
        assert_eq!(data.claims.jti, jti.to_string());
        assert_eq!(data.claims.exp, exp_dt.timestamp());
    }
}
