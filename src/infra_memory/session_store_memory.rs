use crate::application_port::RotationError;
use crate::domain_model::*;
use crate::domain_port::SessionStore;
use chrono::Utc;
use dashmap::DashMap;

#[derive(Debug, Clone)]
struct SessionRow {
    session: Session,
    revoked_reason: Option<RevocationReason>,
}

/// In-process `SessionStore` used by the test suite and the `"memory"`
/// backend. `DashMap::get_mut` holds the shard write lock for the duration
/// of the closure-free mutation, which gives `try_mark_rotated` the same
/// one-winner guarantee as the SQL conditional update.
///
/// The revocation cascade here is not a single transaction across maps; the
/// session flag flips first, so a crash mid-cascade can only leave extra
/// work, never an unrevoked session.
pub struct MemorySessionStore {
    sessions: DashMap<SessionId, SessionRow>,
    refresh_tokens: DashMap<TokenId, RefreshTokenRecord>,
    access_tokens: DashMap<TokenId, AccessTokenRecord>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        MemorySessionStore {
            sessions: DashMap::new(),
            refresh_tokens: DashMap::new(),
            access_tokens: DashMap::new(),
        }
    }

    /// Test inspection helper; `None` for an unknown session.
    pub fn session_revoked(&self, session_id: SessionId) -> Option<bool> {
        self.sessions
            .get(&session_id)
            .map(|row| row.session.revoked)
    }

    /// Test inspection helper.
    pub fn refresh_token_count(&self) -> usize {
        self.refresh_tokens.len()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
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
        self.sessions.insert(
            session.session_id,
            SessionRow {
                session: session.clone(),
                revoked_reason: None,
            },
        );
        Ok(session)
    }

    async fn create_refresh_token(
        &self,
        session_id: SessionId,
        secret_hash: &str,
    ) -> Result<RefreshTokenRecord, RotationError> {
        if !self.sessions.contains_key(&session_id) {
            return Err(RotationError::Store(format!(
                "unknown session: {}",
                session_id
            )));
        }
        let record = RefreshTokenRecord {
            token_id: TokenId::generate(),
            session_id,
            secret_hash: secret_hash.to_string(),
            created_at: Utc::now(),
            rotated: false,
        };
        self.refresh_tokens.insert(record.token_id, record.clone());
        Ok(record)
    }

    async fn create_access_token_record(
        &self,
        session_id: SessionId,
    ) -> Result<AccessTokenRecord, RotationError> {
        if !self.sessions.contains_key(&session_id) {
            return Err(RotationError::Store(format!(
                "unknown session: {}",
                session_id
            )));
        }
        let record = AccessTokenRecord {
            token_id: TokenId::generate(),
            session_id,
            issued_at: Utc::now(),
            revoked: false,
            revoked_at: None,
        };
        self.access_tokens.insert(record.token_id, record.clone());
        Ok(record)
    }

    async fn find_refresh_token(
        &self,
        token_id: TokenId,
    ) -> Result<Option<RefreshTokenLookup>, RotationError> {
        let Some(token) = self.refresh_tokens.get(&token_id).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        let row = self.sessions.get(&token.session_id).ok_or_else(|| {
            RotationError::Store(format!("refresh token without session: {}", token_id))
        })?;
        Ok(Some(RefreshTokenLookup {
            user_id: row.session.user_id,
            session_revoked: row.session.revoked,
            token,
        }))
    }

    async fn try_mark_rotated(&self, token_id: TokenId) -> Result<bool, RotationError> {
        // Shard lock held across the read-and-flip: only one caller sees
        // rotated == false.
        let Some(mut record) = self.refresh_tokens.get_mut(&token_id) else {
            return Ok(false);
        };
        if record.rotated {
            return Ok(false);
        }
        record.rotated = true;
        Ok(true)
    }

    async fn revoke_session_cascade(
        &self,
        session_id: SessionId,
        reason: RevocationReason,
    ) -> Result<(), RotationError> {
        {
            // Unknown and already-revoked sessions are both no-ops, matching
            // the conditional update the MySQL backend issues.
            let Some(mut row) = self.sessions.get_mut(&session_id) else {
                return Ok(());
            };
            if row.session.revoked {
                return Ok(());
            }
            row.session.revoked = true;
            row.revoked_reason = Some(reason);
        }

        let now = Utc::now();
        for mut entry in self.access_tokens.iter_mut() {
            if entry.session_id == session_id && !entry.revoked {
                entry.revoked = true;
                entry.revoked_at = Some(now);
            }
        }
        Ok(())
    }

    async fn revoke_access_token(&self, token_id: TokenId) -> Result<(), RotationError> {
        if let Some(mut record) = self.access_tokens.get_mut(&token_id) {
            if !record.revoked {
                record.revoked = true;
                record.revoked_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn is_access_token_revoked(&self, token_id: TokenId) -> Result<bool, RotationError> {
        Ok(self
            .access_tokens
            .get(&token_id)
            .map(|r| r.revoked)
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_token() -> (MemorySessionStore, SessionId, TokenId) {
        let store = MemorySessionStore::new();
        let session = store
            .create_session(UserId(uuid::Uuid::new_v4()), &serde_json::json!({}))
            .await
            .unwrap();
        let token = store
            .create_refresh_token(session.session_id, "phc-hash")
            .await
            .unwrap();
        (store, session.session_id, token.token_id)
    }

    #[tokio::test]
    async fn try_mark_rotated_flips_exactly_once() {
        let (store, _, token_id) = store_with_token().await;

        assert!(store.try_mark_rotated(token_id).await.unwrap());
        assert!(!store.try_mark_rotated(token_id).await.unwrap());

        let lookup = store.find_refresh_token(token_id).await.unwrap().unwrap();
        assert!(lookup.token.rotated);
    }

    #[tokio::test]
    async fn try_mark_rotated_on_unknown_token_is_false() {
        let store = MemorySessionStore::new();
        assert!(!store.try_mark_rotated(TokenId::generate()).await.unwrap());
    }

    #[tokio::test]
    async fn cascade_revokes_session_and_children_and_sets_timestamps() {
        let (store, session_id, _) = store_with_token().await;
        let access = store.create_access_token_record(session_id).await.unwrap();
        assert!(access.revoked_at.is_none());

        store
            .revoke_session_cascade(session_id, RevocationReason::ReuseDetected)
            .await
            .unwrap();

        assert_eq!(store.session_revoked(session_id), Some(true));
        assert!(store.is_access_token_revoked(access.token_id).await.unwrap());
        let row = store.access_tokens.get(&access.token_id).unwrap();
        assert!(row.revoked_at.is_some());
    }

    #[tokio::test]
    async fn cascade_is_idempotent() {
        let (store, session_id, _) = store_with_token().await;

        store
            .revoke_session_cascade(session_id, RevocationReason::Logout)
            .await
            .unwrap();
        store
            .revoke_session_cascade(session_id, RevocationReason::ReuseDetected)
            .await
            .unwrap();

        // First reason wins; the flag never flips back.
        let row = store.sessions.get(&session_id).unwrap();
        assert!(row.session.revoked);
        assert_eq!(row.revoked_reason, Some(RevocationReason::Logout));
    }

    #[tokio::test]
    async fn children_require_a_live_parent_session() {
        let store = MemorySessionStore::new();
        let orphan = SessionId::generate();
        assert!(store.create_refresh_token(orphan, "h").await.is_err());
        assert!(store.create_access_token_record(orphan).await.is_err());
    }
}
