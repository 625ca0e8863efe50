use crate::domain_model::{RevocationReason, SessionId, TokenId, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    SessionCreated,
    RefreshTokenRotated,
    RefreshTokenReuseDetected,
    InvalidRefreshToken,
}

/// Structured security event. The token id is the public half only; secrets
/// never appear in events.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub kind: AuditKind,
    pub user_id: Option<UserId>,
    pub session_id: SessionId,
    pub token_id: Option<TokenId>,
    pub reason: Option<RevocationReason>,
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(kind: AuditKind, session_id: SessionId) -> Self {
        AuditEvent {
            kind,
            user_id: None,
            session_id,
            token_id: None,
            reason: None,
            at: Utc::now(),
        }
    }

    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn token(mut self, token_id: TokenId) -> Self {
        self.token_id = Some(token_id);
        self
    }

    pub fn reason(mut self, reason: RevocationReason) -> Self {
        self.reason = Some(reason);
        self
    }
}

/// Receives security events. Emission is best-effort and must never block
/// or fail the operation that produced the event; buffering and retry are
/// the sink's own concern.
#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    async fn emit(&self, event: AuditEvent);
}
