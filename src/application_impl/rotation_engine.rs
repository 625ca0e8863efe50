use crate::application_port::{
    AccessToken, AccessTokenSigner, AuditEvent, AuditKind, AuditSink, RefreshToken,
    RotationError, RotationService, TokenCodec, TokenPair,
};
use crate::domain_model::{RevocationReason, SessionId, UserId};
use crate::domain_port::SessionStore;
use std::sync::Arc;
use tracing::warn;

/// The refresh-token state machine. One lineage moves ISSUED -> ROTATED per
/// token, the owning session moves ACTIVE -> REVOKED (terminal), and the
/// "one use, one token" rule is anchored on the store's conditional update
/// rather than any check here: two concurrent `rotate` calls for the same
/// token may both reach `try_mark_rotated`, and the store guarantees only
/// one of them wins.
///
/// Any anomaly on a real token id (wrong secret, spent token, lost race)
/// revokes the entire session family, not just the offending token: once one
/// credential in a lineage is suspect, every sibling derived from the same
/// login is assumed compromised.
pub struct RotationEngine {
    store: Arc<dyn SessionStore>,
    codec: Arc<dyn TokenCodec>,
    signer: Arc<dyn AccessTokenSigner>,
    audit: Arc<dyn AuditSink>,
}

impl RotationEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        codec: Arc<dyn TokenCodec>,
        signer: Arc<dyn AccessTokenSigner>,
        audit: Arc<dyn AuditSink>,
    ) -> RotationEngine {
        RotationEngine {
            store,
            codec,
            signer,
            audit,
        }
    }

    /// New refresh token + new access record for an existing session.
    async fn mint_pair(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> Result<TokenPair, RotationError> {
        let secret = self.codec.generate_secret();
        let secret_hash = self.codec.hash_secret(&secret).await?;
        let refresh_record = self
            .store
            .create_refresh_token(session_id, &secret_hash)
            .await?;
        let access_record = self.store.create_access_token_record(session_id).await?;

        let (blob, expires_at) = self
            .signer
            .sign(user_id, session_id, access_record.token_id)
            .await?;

        Ok(TokenPair {
            session_id,
            access_token: AccessToken(
                self.codec.encode_access_token(access_record.token_id, &blob),
            ),
            refresh_token: RefreshToken(
                self.codec
                    .encode_refresh_token(refresh_record.token_id, &secret),
            ),
            access_token_expires_at: expires_at,
        })
    }

    async fn revoke_family(
        &self,
        session_id: SessionId,
        reason: RevocationReason,
    ) -> Result<(), RotationError> {
        self.store.revoke_session_cascade(session_id, reason).await
    }
}

#[async_trait::async_trait]
impl RotationService for RotationEngine {
    async fn issue(
        &self,
        user_id: UserId,
        device: serde_json::Value,
    ) -> Result<TokenPair, RotationError> {
        let session = self.store.create_session(user_id, &device).await?;
        let pair = self.mint_pair(user_id, session.session_id).await?;

        self.audit
            .emit(AuditEvent::new(AuditKind::SessionCreated, session.session_id).user(user_id))
            .await;

        Ok(pair)
    }

    async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, RotationError> {
        // Unparseable input carries no identifier, so there is no session to
        // punish; reject with no state change.
        let (token_id, presented_secret) = self
            .codec
            .decode(refresh_token)
            .map_err(|_| RotationError::InvalidToken)?;

        let Some(lookup) = self.store.find_refresh_token(token_id).await? else {
            // Unknown id: same reasoning, nothing identifies a session.
            return Err(RotationError::InvalidToken);
        };

        let session_id = lookup.token.session_id;
        let user_id = lookup.user_id;

        if lookup.session_revoked {
            return Err(RotationError::SessionRevoked);
        }

        let secret_ok = self
            .codec
            .verify_secret(presented_secret, &lookup.token.secret_hash)
            .await?;
        if !secret_ok {
            // The identifier is real but the secret is not: a forged or
            // tampered credential.
            warn!(%session_id, %token_id, "refresh secret mismatch, revoking session family");
            self.revoke_family(session_id, RevocationReason::InvalidRefreshSecret)
                .await?;
            self.audit
                .emit(
                    AuditEvent::new(AuditKind::InvalidRefreshToken, session_id)
                        .user(user_id)
                        .token(token_id)
                        .reason(RevocationReason::InvalidRefreshSecret),
                )
                .await;
            return Err(RotationError::InvalidToken);
        }

        // A token already observed as spent and a concurrent rotation that
        // wins the conditional update first are the same theft signal: this
        // exact credential was used more than once.
        let won = if lookup.token.rotated {
            false
        } else {
            self.store.try_mark_rotated(token_id).await?
        };

        if !won {
            warn!(%session_id, %token_id, "refresh token reuse detected, revoking session family");
            self.revoke_family(session_id, RevocationReason::ReuseDetected)
                .await?;
            self.audit
                .emit(
                    AuditEvent::new(AuditKind::RefreshTokenReuseDetected, session_id)
                        .user(user_id)
                        .token(token_id)
                        .reason(RevocationReason::ReuseDetected),
                )
                .await;
            return Err(RotationError::ReuseDetected);
        }

        // Sole winner of the rotation.
        let pair = self.mint_pair(user_id, session_id).await?;
        self.audit
            .emit(
                AuditEvent::new(AuditKind::RefreshTokenRotated, session_id)
                    .user(user_id)
                    .token(token_id),
            )
            .await;

        Ok(pair)
    }

    async fn logout(&self, session_id: SessionId) -> Result<(), RotationError> {
        self.revoke_family(session_id, RevocationReason::Logout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::token_codec_impl::test_codec;
    use crate::application_impl::token_signer_impl::test_signer;
    use crate::application_impl::RevocationGate;
    use crate::domain_model::TokenId;
    use crate::infra_memory::MemorySessionStore;
    use std::sync::Mutex;

    /// Captures everything emitted so tests can assert on event kinds.
    struct RecordingSink {
        events: Mutex<Vec<AuditEvent>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(RecordingSink {
                events: Mutex::new(Vec::new()),
            })
        }

        fn kinds(&self) -> Vec<AuditKind> {
            self.events.lock().unwrap().iter().map(|e| e.kind).collect()
        }
    }

    #[async_trait::async_trait]
    impl AuditSink for RecordingSink {
        async fn emit(&self, event: AuditEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    struct Harness {
        engine: Arc<RotationEngine>,
        store: Arc<MemorySessionStore>,
        sink: Arc<RecordingSink>,
        user_id: UserId,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemorySessionStore::new());
        let sink = RecordingSink::new();
        let engine = Arc::new(RotationEngine::new(
            store.clone(),
            Arc::new(test_codec()),
            Arc::new(test_signer()),
            sink.clone(),
        ));
        Harness {
            engine,
            store,
            sink,
            user_id: UserId(uuid::Uuid::new_v4()),
        }
    }

    fn device() -> serde_json::Value {
        serde_json::json!({ "agent": "test", "ip": "127.0.0.1" })
    }

    #[tokio::test]
    async fn issue_creates_session_and_decodable_pair() {
        let h = harness();
        let pair = h.engine.issue(h.user_id, device()).await.unwrap();

        let codec = test_codec();
        codec.decode(&pair.access_token.0).unwrap();
        codec.decode(&pair.refresh_token.0).unwrap();
        assert_eq!(h.sink.kinds(), vec![AuditKind::SessionCreated]);
        assert!(!h.store.session_revoked(pair.session_id).unwrap());
    }

    #[tokio::test]
    async fn rotate_returns_fresh_pair_and_spends_the_old_token() {
        let h = harness();
        let first = h.engine.issue(h.user_id, device()).await.unwrap();

        let second = h.engine.rotate(&first.refresh_token.0).await.unwrap();
        assert_eq!(second.session_id, first.session_id);
        assert_ne!(second.refresh_token.0, first.refresh_token.0);
        assert!(h.sink.kinds().contains(&AuditKind::RefreshTokenRotated));
        assert!(!h.store.session_revoked(first.session_id).unwrap());
    }

    #[tokio::test]
    async fn second_presentation_of_spent_token_revokes_the_family() {
        let h = harness();
        let first = h.engine.issue(h.user_id, device()).await.unwrap();
        let second = h.engine.rotate(&first.refresh_token.0).await.unwrap();

        let err = h.engine.rotate(&first.refresh_token.0).await.unwrap_err();
        assert!(matches!(err, RotationError::ReuseDetected));
        assert!(h.store.session_revoked(first.session_id).unwrap());
        assert!(h
            .sink
            .kinds()
            .contains(&AuditKind::RefreshTokenReuseDetected));

        // The cascade also kills the pair that was validly issued moments
        // earlier.
        let codec = test_codec();
        let (jti, _) = codec.decode(&second.access_token.0).unwrap();
        assert!(h.store.is_access_token_revoked(jti).await.unwrap());

        let gate = RevocationGate::new(h.store.clone(), Arc::new(test_codec()));
        assert!(gate.check(&second.access_token.0).await.unwrap().is_rejected());
    }

    #[tokio::test]
    async fn wrong_secret_revokes_family_without_minting_anything() {
        let h = harness();
        let first = h.engine.issue(h.user_id, device()).await.unwrap();
        let tokens_before = h.store.refresh_token_count();

        let codec = test_codec();
        let (token_id, _) = codec.decode(&first.refresh_token.0).unwrap();
        let tampered = format!("{}.tamperedsecret", token_id);

        let err = h.engine.rotate(&tampered).await.unwrap_err();
        assert!(matches!(err, RotationError::InvalidToken));
        assert!(h.store.session_revoked(first.session_id).unwrap());
        assert_eq!(h.store.refresh_token_count(), tokens_before);
        assert!(h.sink.kinds().contains(&AuditKind::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn unknown_token_id_fails_without_touching_any_session() {
        let h = harness();
        let issued = h.engine.issue(h.user_id, device()).await.unwrap();

        let stranger = format!("{}.somesecret", TokenId::generate());
        let err = h.engine.rotate(&stranger).await.unwrap_err();
        assert!(matches!(err, RotationError::InvalidToken));
        assert!(!h.store.session_revoked(issued.session_id).unwrap());
    }

    #[tokio::test]
    async fn malformed_refresh_token_fails_with_no_state_change() {
        let h = harness();
        let issued = h.engine.issue(h.user_id, device()).await.unwrap();

        for bad in ["no-dot-here", "", "not-a-uuid.secret"] {
            let err = h.engine.rotate(bad).await.unwrap_err();
            assert!(matches!(err, RotationError::InvalidToken));
        }
        assert!(!h.store.session_revoked(issued.session_id).unwrap());
        assert_eq!(h.store.refresh_token_count(), 1);
    }

    #[tokio::test]
    async fn rotating_after_logout_reports_session_revoked() {
        let h = harness();
        let issued = h.engine.issue(h.user_id, device()).await.unwrap();

        h.engine.logout(issued.session_id).await.unwrap();

        let err = h.engine.rotate(&issued.refresh_token.0).await.unwrap_err();
        assert!(matches!(err, RotationError::SessionRevoked));
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let h = harness();
        let issued = h.engine.issue(h.user_id, device()).await.unwrap();

        h.engine.logout(issued.session_id).await.unwrap();
        h.engine.logout(issued.session_id).await.unwrap();
        assert!(h.store.session_revoked(issued.session_id).unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_rotations_have_exactly_one_winner() {
        const CONTENDERS: usize = 8;

        let h = harness();
        let issued = h.engine.issue(h.user_id, device()).await.unwrap();
        let token = issued.refresh_token.0.clone();

        let tasks: Vec<_> = (0..CONTENDERS)
            .map(|_| {
                let engine = h.engine.clone();
                let token = token.clone();
                tokio::spawn(async move { engine.rotate(&token).await })
            })
            .collect();

        let mut wins = 0;
        for task in futures_util::future::join_all(tasks).await {
            match task.unwrap() {
                Ok(_) => wins += 1,
                // Late contenders may observe the cascade a loser already
                // performed instead of the reuse itself.
                Err(RotationError::ReuseDetected) | Err(RotationError::SessionRevoked) => {}
                Err(other) => panic!("unexpected outcome: {:?}", other),
            }
        }

        assert_eq!(wins, 1);
        assert!(h.store.session_revoked(issued.session_id).unwrap());
    }
}
