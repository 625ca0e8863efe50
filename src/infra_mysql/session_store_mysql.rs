use crate::application_port::RotationError;
use crate::domain_model::*;
use crate::domain_port::SessionStore;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

/// sqlx-backed `SessionStore`. Identifiers are stored as BINARY(16); both
/// token tables are indexed by their token id and keyed to `auth_session`.
/// Schema lives in `migrations/`.
pub struct MySqlSessionStore {
    pool: MySqlPool,
}

impl MySqlSessionStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlSessionStore { pool }
    }

    #[inline]
    fn id_bytes(id: &Uuid) -> &[u8] {
        id.as_bytes()
    }

    #[inline]
    fn id_from_bytes(bytes: &[u8]) -> Result<Uuid, RotationError> {
        Uuid::from_slice(bytes).map_err(|e| RotationError::Store(e.to_string()))
    }

    fn row_to_lookup(row: MySqlRow) -> Result<RefreshTokenLookup, RotationError> {
        let token_id_bytes: Vec<u8> = row
            .try_get("token_id")
            .map_err(|e| RotationError::Store(e.to_string()))?;
        let session_id_bytes: Vec<u8> = row
            .try_get("session_id")
            .map_err(|e| RotationError::Store(e.to_string()))?;
        let user_id_bytes: Vec<u8> = row
            .try_get("user_id")
            .map_err(|e| RotationError::Store(e.to_string()))?;

        let secret_hash: String = row
            .try_get("secret_hash")
            .map_err(|e| RotationError::Store(e.to_string()))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| RotationError::Store(e.to_string()))?;
        let rotated: bool = row
            .try_get("rotated")
            .map_err(|e| RotationError::Store(e.to_string()))?;
        let session_revoked: bool = row
            .try_get("session_revoked")
            .map_err(|e| RotationError::Store(e.to_string()))?;

        Ok(RefreshTokenLookup {
            token: RefreshTokenRecord {
                token_id: TokenId(Self::id_from_bytes(&token_id_bytes)?),
                session_id: SessionId(Self::id_from_bytes(&session_id_bytes)?),
                secret_hash,
                created_at,
                rotated,
            },
            user_id: UserId(Self::id_from_bytes(&user_id_bytes)?),
            session_revoked,
        })
    }
}

#[async_trait::async_trait]
impl SessionStore for MySqlSessionStore {
    async fn create_session(
        &self,
        user_id: UserId,
        device: &serde_json::Value,
    ) -> Result<Session, RotationError> {
        let session = Session {
            session_id: SessionId::generate(),
            user_id,
            device: device.clone(),
            created_at: Utc::now(),
            revoked: false,
        };
        let device_text = serde_json::to_string(device)
            .map_err(|e| RotationError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
INSERT INTO auth_session (session_id, user_id, device, created_at, revoked)
VALUES (?, ?, ?, ?, FALSE)
"#,
        )
        .bind(Self::id_bytes(&session.session_id.0))
        .bind(Self::id_bytes(&session.user_id.0))
        .bind(device_text)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RotationError::Store(e.to_string()))?;

        Ok(session)
    }

    async fn create_refresh_token(
        &self,
        session_id: SessionId,
        secret_hash: &str,
    ) -> Result<RefreshTokenRecord, RotationError> {
        let record = RefreshTokenRecord {
            token_id: TokenId::generate(),
            session_id,
            secret_hash: secret_hash.to_string(),
            created_at: Utc::now(),
            rotated: false,
        };

        sqlx::query(
            r#"
INSERT INTO refresh_token (token_id, session_id, secret_hash, created_at, rotated)
VALUES (?, ?, ?, ?, FALSE)
"#,
        )
        .bind(Self::id_bytes(&record.token_id.0))
        .bind(Self::id_bytes(&record.session_id.0))
        .bind(secret_hash)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RotationError::Store(e.to_string()))?;

        Ok(record)
    }

    async fn create_access_token_record(
        &self,
        session_id: SessionId,
    ) -> Result<AccessTokenRecord, RotationError> {
        let record = AccessTokenRecord {
            token_id: TokenId::generate(),
            session_id,
            issued_at: Utc::now(),
            revoked: false,
            revoked_at: None,
        };

        sqlx::query(
            r#"
INSERT INTO access_token (token_id, session_id, issued_at, revoked)
VALUES (?, ?, ?, FALSE)
"#,
        )
        .bind(Self::id_bytes(&record.token_id.0))
        .bind(Self::id_bytes(&record.session_id.0))
        .bind(record.issued_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RotationError::Store(e.to_string()))?;

        Ok(record)
    }

    async fn find_refresh_token(
        &self,
        token_id: TokenId,
    ) -> Result<Option<RefreshTokenLookup>, RotationError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT rt.token_id, rt.session_id, rt.secret_hash, rt.created_at, rt.rotated,
       s.user_id, s.revoked AS session_revoked
FROM refresh_token rt
JOIN auth_session s ON s.session_id = rt.session_id
WHERE rt.token_id = ?
"#,
        )
        .bind(Self::id_bytes(&token_id.0))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RotationError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_lookup).transpose()
    }

    async fn try_mark_rotated(&self, token_id: TokenId) -> Result<bool, RotationError> {
        // The single conditional update that closes the rotation race: the
        // row predicate and the flag flip are one statement, so only one
        // concurrent caller can match `rotated = FALSE`.
        let result = sqlx::query(
            r#"
UPDATE refresh_token
SET rotated = TRUE
WHERE token_id = ? AND rotated = FALSE
"#,
        )
        .bind(Self::id_bytes(&token_id.0))
        .execute(&self.pool)
        .await
        .map_err(|e| RotationError::Store(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_session_cascade(
        &self,
        session_id: SessionId,
        reason: RevocationReason,
    ) -> Result<(), RotationError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RotationError::Store(e.to_string()))?;

        let flipped = sqlx::query(
            r#"
UPDATE auth_session
SET revoked = TRUE, revoked_reason = ?
WHERE session_id = ? AND revoked = FALSE
"#,
        )
        .bind(reason.as_str())
        .bind(Self::id_bytes(&session_id.0))
        .execute(&mut *tx)
        .await
        .map_err(|e| RotationError::Store(e.to_string()))?;

        if flipped.rows_affected() == 0 {
            // Already revoked (or never existed): idempotent no-op, and the
            // children were handled by whichever call won.
            tx.rollback()
                .await
                .map_err(|e| RotationError::Store(e.to_string()))?;
            return Ok(());
        }

        sqlx::query(
            r#"
UPDATE access_token
SET revoked = TRUE, revoked_at = ?
WHERE session_id = ? AND revoked = FALSE
"#,
        )
        .bind(Utc::now())
        .bind(Self::id_bytes(&session_id.0))
        .execute(&mut *tx)
        .await
        .map_err(|e| RotationError::Store(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RotationError::Store(e.to_string()))?;

        Ok(())
    }

    async fn revoke_access_token(&self, token_id: TokenId) -> Result<(), RotationError> {
        sqlx::query(
            r#"
UPDATE access_token
SET revoked = TRUE, revoked_at = ?
WHERE token_id = ? AND revoked = FALSE
"#,
        )
        .bind(Utc::now())
        .bind(Self::id_bytes(&token_id.0))
        .execute(&self.pool)
        .await
        .map_err(|e| RotationError::Store(e.to_string()))?;

        Ok(())
    }

    async fn is_access_token_revoked(&self, token_id: TokenId) -> Result<bool, RotationError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT revoked
FROM access_token
WHERE token_id = ?
"#,
        )
        .bind(Self::id_bytes(&token_id.0))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RotationError::Store(e.to_string()))?;

        match row_opt {
            Some(row) => row
                .try_get("revoked")
                .map_err(|e| RotationError::Store(e.to_string())),
            None => Ok(false),
        }
    }
}
