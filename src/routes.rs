//! HTTP boundary
//!
//! The actor is taken from the `X-Actor-Id` header, standing in for the
//! session layer that resolves identities upstream.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::authorizer::{Authorization, Grant};
use crate::delegation::DeleteOutcome;
use crate::error::{AppError, Result};
use crate::models::{
    AddDelegationForm, AuditAction, AuditEvent, CreateLeaveRequest, Delegation,
    DeleteDelegationForm, Employee, LeaveRequest, ListRequestsQuery, TransitionEvent,
};
use crate::AppState;

pub const ACTOR_HEADER: &str = "x-actor-id";

/// Identity of the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub i64);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .map(Actor)
            .ok_or(AppError::Unauthenticated)
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/requests", get(list_requests))
        .route("/requests/:id/accept", post(accept))
        .route("/requests/:id/reject", post(reject))
        .route("/collaborators", get(list_collaborators))
        .route("/collaborators/:employee_id/leaves", post(create_leave))
        .route("/delegations", post(add_delegation))
        .route("/delegations/delete", post(delete_delegation))
        .route("/delegations/:manager_id", get(list_delegations))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Turn a denial into an audited `Forbidden` error.
async fn require(
    state: &AppState,
    decision: Authorization,
    actor_id: i64,
    action: AuditAction,
    target_id: i64,
) -> Result<Grant> {
    match decision {
        Authorization::Allowed(grant) => Ok(grant),
        Authorization::Forbidden => {
            state
                .audit
                .record(AuditEvent::forbidden(actor_id, action, target_id))
                .await;
            Err(AppError::Forbidden {
                actor_id,
                action,
                target_id,
            })
        }
    }
}

// The transition is already committed; a delivery failure must not turn it
// into an error response.
async fn notify(state: &AppState, event: &TransitionEvent) {
    if let Err(e) = state.notifier.dispatch(event).await {
        tracing::error!(
            request_id = event.request_id,
            "Failed to dispatch leave notification: {}",
            e
        );
    }
}

async fn accept(
    State(state): State<Arc<AppState>>,
    Actor(actor_id): Actor,
    Path(id): Path<i64>,
) -> Result<Json<TransitionEvent>> {
    let event = state.machine.accept(id, actor_id).await?;
    notify(&state, &event).await;
    Ok(Json(event))
}

async fn reject(
    State(state): State<Arc<AppState>>,
    Actor(actor_id): Actor,
    Path(id): Path<i64>,
) -> Result<Json<TransitionEvent>> {
    let event = state.machine.reject(id, actor_id).await?;
    notify(&state, &event).await;
    Ok(Json(event))
}

/// Requests of the actor's team and of every manager who delegated to them
async fn list_requests(
    State(state): State<Arc<AppState>>,
    Actor(actor_id): Actor,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<Vec<LeaveRequest>>> {
    let mut managers = vec![actor_id];
    managers.extend(state.registry.managers_delegating_to(actor_id).await?);

    let requests = state.store.list_for_managers(&managers, query.filter).await?;
    Ok(Json(requests))
}

async fn list_collaborators(
    State(state): State<Arc<AppState>>,
    Actor(actor_id): Actor,
) -> Result<Json<Vec<Employee>>> {
    let collaborators = state.directory.collaborators_of(actor_id).await?;
    Ok(Json(collaborators))
}

/// Create a leave for a collaborator. No notification is sent: the manager
/// sets the status directly.
async fn create_leave(
    State(state): State<Arc<AppState>>,
    Actor(actor_id): Actor,
    Path(employee_id): Path<i64>,
    Json(body): Json<CreateLeaveRequest>,
) -> Result<impl IntoResponse> {
    let decision = state
        .authorizer
        .can_manage_employee(actor_id, employee_id)
        .await?;
    require(&state, decision, actor_id, AuditAction::CreateLeave, employee_id).await?;

    let leave = state.store.create(employee_id, &body).await?;
    tracing::info!(
        leave_id = leave.id,
        employee_id,
        actor_id,
        "Leave created on behalf of collaborator"
    );
    Ok((StatusCode::CREATED, Json(leave)))
}

async fn list_delegations(
    State(state): State<Arc<AppState>>,
    Actor(actor_id): Actor,
    Path(manager_id): Path<i64>,
) -> Result<Json<Vec<Delegation>>> {
    let decision = state
        .authorizer
        .can_manage_delegations(actor_id, manager_id)
        .await?;
    require(&state, decision, actor_id, AuditAction::ListDelegations, manager_id).await?;

    Ok(Json(state.registry.list_for_manager(manager_id).await?))
}

/// Responds with the new or existing delegation id as plain text
async fn add_delegation(
    State(state): State<Arc<AppState>>,
    Actor(actor_id): Actor,
    Form(form): Form<AddDelegationForm>,
) -> Result<String> {
    let (Some(manager_id), Some(delegate_id)) = (form.manager_id, form.delegate_id) else {
        return Err(AppError::InvalidArgument(
            "manager_id and delegate_id are required".to_string(),
        ));
    };

    let decision = state
        .authorizer
        .can_manage_delegations(actor_id, manager_id)
        .await?;
    require(&state, decision, actor_id, AuditAction::AddDelegation, manager_id).await?;

    let id = state.registry.add_delegate(manager_id, delegate_id).await?;
    Ok(id.to_string())
}

/// Responds with the removed id, or `null` when nothing was removed
async fn delete_delegation(
    State(state): State<Arc<AppState>>,
    Actor(actor_id): Actor,
    Form(form): Form<DeleteDelegationForm>,
) -> Result<String> {
    let (Some(manager_id), Some(delegation_id)) = (form.manager_id, form.delegation_id) else {
        return Err(AppError::InvalidArgument(
            "manager_id and delegation_id are required".to_string(),
        ));
    };

    let decision = state
        .authorizer
        .can_manage_delegations(actor_id, manager_id)
        .await?;
    require(&state, decision, actor_id, AuditAction::DeleteDelegation, manager_id).await?;

    match state.registry.delete_owned(delegation_id, manager_id).await? {
        DeleteOutcome::Removed(id) => Ok(id.to_string()),
        DeleteOutcome::NotFound => Ok("null".to_string()),
    }
}
