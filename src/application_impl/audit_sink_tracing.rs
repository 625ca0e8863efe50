use crate::application_port::{AuditEvent, AuditSink};
use tracing::{info, warn};

/// Logs events as structured tracing records. Durable audit storage lives
/// in a separate service; losing an event here must never fail the
/// operation that produced it, so serialization errors are swallowed with
/// a warning.
pub struct TracingAuditSink;

impl TracingAuditSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AuditSink for TracingAuditSink {
    async fn emit(&self, event: AuditEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => info!(target: "capstan::audit", event = %json, "audit"),
            Err(e) => warn!("failed to serialize audit event: {}", e),
        }
    }
}
