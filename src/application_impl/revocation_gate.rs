use crate::application_port::{RotationError, TokenCodec};
use crate::domain_model::TokenId;
use crate::domain_port::SessionStore;
use std::sync::Arc;
use tracing::warn;

/// Outcome of the fast-path check. `Rejected` carries the public token id
/// only; the opaque half never leaves the request.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum GateDecision {
    Allowed,
    Rejected { token_id: TokenId },
}

impl GateDecision {
    pub fn is_rejected(&self) -> bool {
        matches!(self, GateDecision::Rejected { .. })
    }
}

/// Cheap synchronous check run ahead of all protected request handling. It
/// only short-circuits credentials that are positively known to be revoked:
/// malformed and unknown identifiers pass through, because downstream
/// authentication is the authority on validity and this gate must never be
/// the sole source of "unauthenticated".
pub struct RevocationGate {
    store: Arc<dyn SessionStore>,
    codec: Arc<dyn TokenCodec>,
}

impl RevocationGate {
    pub fn new(store: Arc<dyn SessionStore>, codec: Arc<dyn TokenCodec>) -> RevocationGate {
        RevocationGate { store, codec }
    }

    pub async fn check(&self, access_token: &str) -> Result<GateDecision, RotationError> {
        let Ok((token_id, _)) = self.codec.decode(access_token) else {
            return Ok(GateDecision::Allowed);
        };

        if self.store.is_access_token_revoked(token_id).await? {
            warn!(%token_id, "request carried a revoked access token");
            return Ok(GateDecision::Rejected { token_id });
        }

        Ok(GateDecision::Allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::token_codec_impl::test_codec;
    use crate::infra_memory::MemorySessionStore;
    use crate::domain_model::{SessionId, UserId};

    async fn gate_with_store() -> (RevocationGate, Arc<MemorySessionStore>, SessionId) {
        let store = Arc::new(MemorySessionStore::new());
        let session = store
            .create_session(UserId(uuid::Uuid::new_v4()), &serde_json::json!({}))
            .await
            .unwrap();
        let gate = RevocationGate::new(store.clone(), Arc::new(test_codec()));
        (gate, store, session.session_id)
    }

    #[tokio::test]
    async fn malformed_tokens_pass_through() {
        let (gate, _, _) = gate_with_store().await;
        assert_eq!(gate.check("garbage").await.unwrap(), GateDecision::Allowed);
        assert_eq!(
            gate.check("not-a-uuid.blob").await.unwrap(),
            GateDecision::Allowed
        );
    }

    #[tokio::test]
    async fn never_issued_identifier_is_allowed() {
        let (gate, _, _) = gate_with_store().await;
        let unknown = format!("{}.blob", TokenId::generate());
        // Absence of a record is not evidence of revocation.
        assert_eq!(gate.check(&unknown).await.unwrap(), GateDecision::Allowed);
    }

    #[tokio::test]
    async fn live_token_is_allowed_and_revoked_token_is_rejected() {
        let (gate, store, session_id) = gate_with_store().await;
        let record = store.create_access_token_record(session_id).await.unwrap();
        let token = format!("{}.blob", record.token_id);

        assert_eq!(gate.check(&token).await.unwrap(), GateDecision::Allowed);

        store.revoke_access_token(record.token_id).await.unwrap();
        assert_eq!(
            gate.check(&token).await.unwrap(),
            GateDecision::Rejected {
                token_id: record.token_id
            }
        );
    }

    #[tokio::test]
    async fn session_cascade_rejects_every_child_token() {
        let (gate, store, session_id) = gate_with_store().await;
        let a = store.create_access_token_record(session_id).await.unwrap();
        let b = store.create_access_token_record(session_id).await.unwrap();

        store
            .revoke_session_cascade(session_id, crate::domain_model::RevocationReason::Logout)
            .await
            .unwrap();

        for record in [a, b] {
            let token = format!("{}.blob", record.token_id);
            assert!(gate.check(&token).await.unwrap().is_rejected());
        }
    }
}
