//! Data models for employees, delegations and leave requests

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An employee as seen through the directory. Read-only for this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    /// None for the root of the hierarchy
    pub manager_id: Option<i64>,
    pub organization_id: Option<i64>,
    pub is_hr: bool,
    pub language: String,
}

/// "Manager X has delegated approval authority to user Y"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Delegation {
    pub id: i64,
    pub manager_id: i64,
    pub delegate_id: i64,
}

/// Status of a leave request, persisted as the integer codes of the legacy schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    /// Draft, still owned by the employee
    Planned,
    Submitted,
    Accepted,
    Rejected,
}

impl LeaveStatus {
    pub fn code(&self) -> i64 {
        match self {
            LeaveStatus::Planned => 1,
            LeaveStatus::Submitted => 2,
            LeaveStatus::Accepted => 3,
            LeaveStatus::Rejected => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(LeaveStatus::Planned),
            2 => Some(LeaveStatus::Submitted),
            3 => Some(LeaveStatus::Accepted),
            4 => Some(LeaveStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Planned => "planned",
            LeaveStatus::Submitted => "submitted",
            LeaveStatus::Accepted => "accepted",
            LeaveStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LeaveStatus::Accepted | LeaveStatus::Rejected)
    }
}

/// Half-day marker on the first and last day of a leave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayPart {
    Morning,
    Afternoon,
}

impl DayPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayPart::Morning => "Morning",
            DayPart::Afternoon => "Afternoon",
        }
    }
}

impl std::str::FromStr for DayPart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Morning" => Ok(DayPart::Morning),
            "Afternoon" => Ok(DayPart::Afternoon),
            _ => Err(format!("Invalid day part: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub id: i64,
    pub employee_id: i64,
    pub status: LeaveStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_date_type: DayPart,
    pub end_date_type: DayPart,
    pub duration: f64,
    pub leave_type: String,
    pub cause: Option<String>,
}

/// A decision an approver can take on a submitted request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    Accept,
    Reject,
}

impl TransitionAction {
    pub fn target_status(&self) -> LeaveStatus {
        match self {
            TransitionAction::Accept => LeaveStatus::Accepted,
            TransitionAction::Reject => LeaveStatus::Rejected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionAction::Accept => "accept",
            TransitionAction::Reject => "reject",
        }
    }
}

impl From<TransitionAction> for AuditAction {
    fn from(action: TransitionAction) -> Self {
        match action {
            TransitionAction::Accept => AuditAction::Accept,
            TransitionAction::Reject => AuditAction::Reject,
        }
    }
}

/// Emitted once per successful transition; input for the notification dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub event_id: Uuid,
    pub request_id: i64,
    pub status: LeaveStatus,
    pub actor_id: i64,
    pub employee_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_date_type: DayPart,
    pub end_date_type: DayPart,
    pub leave_type: String,
    pub cause: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl TransitionEvent {
    pub fn new(request: &LeaveRequest, status: LeaveStatus, actor_id: i64) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            request_id: request.id,
            status,
            actor_id,
            employee_id: request.employee_id,
            start_date: request.start_date,
            end_date: request.end_date,
            start_date_type: request.start_date_type,
            end_date_type: request.end_date_type,
            leave_type: request.leave_type.clone(),
            cause: request.cause.clone(),
            occurred_at: Utc::now(),
        }
    }
}

/// Operations whose denial is recorded as a security event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Accept,
    Reject,
    ListDelegations,
    AddDelegation,
    DeleteDelegation,
    CreateLeave,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Accept => "accept",
            AuditAction::Reject => "reject",
            AuditAction::ListDelegations => "list_delegations",
            AuditAction::AddDelegation => "add_delegation",
            AuditAction::DeleteDelegation => "delete_delegation",
            AuditAction::CreateLeave => "create_leave",
        }
    }
}

/// An unauthorized access attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub actor_id: i64,
    pub action: AuditAction,
    /// Leave request, manager or employee the action was aimed at
    pub target_id: i64,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn forbidden(actor_id: i64, action: AuditAction, target_id: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id,
            action,
            target_id,
            occurred_at: Utc::now(),
        }
    }
}

/// Filter for the "requests submitted to me" listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestFilter {
    #[default]
    Requested,
    All,
}

impl std::str::FromStr for RequestFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(RequestFilter::Requested),
            "all" => Ok(RequestFilter::All),
            _ => Err(format!("Invalid filter: {}", s)),
        }
    }
}

/// Query string for listing requests
#[derive(Debug, Default, Deserialize)]
pub struct ListRequestsQuery {
    #[serde(default)]
    pub filter: RequestFilter,
}

/// Body for creating a leave on behalf of a collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLeaveRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_date_type: DayPart,
    pub end_date_type: DayPart,
    pub duration: f64,
    pub leave_type: String,
    pub cause: Option<String>,
    pub status: LeaveStatus,
}

/// Form fields of the add-delegation endpoint. Both are required.
#[derive(Debug, Deserialize)]
pub struct AddDelegationForm {
    pub manager_id: Option<i64>,
    pub delegate_id: Option<i64>,
}

/// Form fields of the delete-delegation endpoint. Both are required.
#[derive(Debug, Deserialize)]
pub struct DeleteDelegationForm {
    pub manager_id: Option<i64>,
    pub delegation_id: Option<i64>,
}
