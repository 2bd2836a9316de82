//! Leave request state machine
//!
//! Submitted -> Accepted | Rejected. Both targets are terminal. A transition
//! runs load, status check, authorization and then a conditional write; the
//! write is the only step that decides a race between concurrent callers.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::audit::AuditSink;
use crate::authorizer::{ApprovalAuthorizer, Authorization};
use crate::error::{AppError, Result};
use crate::models::{AuditEvent, LeaveStatus, TransitionAction, TransitionEvent};
use crate::store::LeaveRequestStore;

pub struct LeaveStateMachine {
    store: Arc<dyn LeaveRequestStore>,
    authorizer: ApprovalAuthorizer,
    audit: Arc<dyn AuditSink>,
    event_tx: broadcast::Sender<TransitionEvent>,
}

impl LeaveStateMachine {
    pub fn new(
        store: Arc<dyn LeaveRequestStore>,
        authorizer: ApprovalAuthorizer,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            store,
            authorizer,
            audit,
            event_tx,
        }
    }

    /// Subscribe to transition events
    pub fn subscribe(&self) -> broadcast::Receiver<TransitionEvent> {
        self.event_tx.subscribe()
    }

    pub async fn accept(&self, request_id: i64, actor_id: i64) -> Result<TransitionEvent> {
        self.transition(request_id, actor_id, TransitionAction::Accept)
            .await
    }

    pub async fn reject(&self, request_id: i64, actor_id: i64) -> Result<TransitionEvent> {
        self.transition(request_id, actor_id, TransitionAction::Reject)
            .await
    }

    pub async fn transition(
        &self,
        request_id: i64,
        actor_id: i64,
        action: TransitionAction,
    ) -> Result<TransitionEvent> {
        let request = self
            .store
            .get(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Leave request #{}", request_id)))?;

        if request.status != LeaveStatus::Submitted {
            tracing::debug!(
                request_id,
                actor_id,
                status = request.status.as_str(),
                "Leave request already processed"
            );
            return Err(AppError::AlreadyProcessed { request_id });
        }

        let grant = match self.authorizer.can_act(actor_id, &request).await? {
            Authorization::Allowed(grant) => grant,
            Authorization::Forbidden => {
                self.audit
                    .record(AuditEvent::forbidden(actor_id, action.into(), request_id))
                    .await;
                return Err(AppError::Forbidden {
                    actor_id,
                    action: action.into(),
                    target_id: request_id,
                });
            }
        };

        let target = action.target_status();
        let moved = self
            .store
            .transition_status(request_id, LeaveStatus::Submitted, target)
            .await?;
        if !moved {
            tracing::debug!(request_id, actor_id, "Lost transition race");
            return Err(AppError::AlreadyProcessed { request_id });
        }

        tracing::info!(
            request_id,
            actor_id,
            grant = grant.as_str(),
            status = target.as_str(),
            "Leave request {}",
            target.as_str()
        );

        let event = TransitionEvent::new(&request, target, actor_id);
        let _ = self.event_tx.send(event.clone());

        Ok(event)
    }
}
