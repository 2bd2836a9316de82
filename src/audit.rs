//! Security audit sink
//!
//! Every denied operation is handed to an [`AuditSink`]. Recording is
//! infallible from the caller's point of view so a denial can never be lost
//! to an error path.

use async_trait::async_trait;

use crate::models::AuditEvent;

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent);
}

/// Writes audit events to the `audit` tracing target
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) {
        tracing::warn!(
            target: "audit",
            audit_id = %event.id,
            actor_id = event.actor_id,
            action = event.action.as_str(),
            target_id = event.target_id,
            "User #{} illegally tried to {} #{}",
            event.actor_id,
            event.action.as_str(),
            event.target_id
        );
    }
}
