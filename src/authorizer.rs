//! Approval authorizer
//!
//! The single decision point for "may this actor act on that request /
//! manager / employee". Every call re-resolves live directory and
//! delegation state.

use std::sync::Arc;

use crate::delegation::DelegationRegistry;
use crate::directory::EmployeeDirectory;
use crate::error::{AppError, Result};
use crate::models::LeaveRequest;

/// Why an actor was allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// The actor is the employee's manager, or the manager whose
    /// delegations are being managed
    Manager,
    /// Unconditional HR override
    Hr,
    /// The actor holds a delegation from the employee's manager
    Delegate,
}

impl Grant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grant::Manager => "manager",
            Grant::Hr => "hr",
            Grant::Delegate => "delegate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Allowed(Grant),
    Forbidden,
}

impl Authorization {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Authorization::Allowed(_))
    }
}

#[derive(Clone)]
pub struct ApprovalAuthorizer {
    directory: Arc<dyn EmployeeDirectory>,
    registry: DelegationRegistry,
}

impl ApprovalAuthorizer {
    pub fn new(directory: Arc<dyn EmployeeDirectory>, registry: DelegationRegistry) -> Self {
        Self {
            directory,
            registry,
        }
    }

    /// May `actor_id` accept or reject `request`?
    ///
    /// Checks run in a fixed order: direct manager, HR override, then a
    /// delegation from the employee's manager. Fails with `NotFound` when the
    /// request's employee is missing from the directory.
    pub async fn can_act(&self, actor_id: i64, request: &LeaveRequest) -> Result<Authorization> {
        let employee = self
            .directory
            .get(request.employee_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Employee #{} of leave request #{}",
                    request.employee_id, request.id
                ))
            })?;

        if employee.manager_id == Some(actor_id) {
            return Ok(Authorization::Allowed(Grant::Manager));
        }

        if self.is_hr(actor_id).await? {
            return Ok(Authorization::Allowed(Grant::Hr));
        }

        if let Some(manager_id) = employee.manager_id {
            if self.registry.is_delegate(actor_id, manager_id).await? {
                return Ok(Authorization::Allowed(Grant::Delegate));
            }
        }

        Ok(Authorization::Forbidden)
    }

    /// May `actor_id` list, add or remove the delegations of `manager_id`?
    /// Only the manager themselves or HR; a delegate cannot re-delegate.
    pub async fn can_manage_delegations(
        &self,
        actor_id: i64,
        manager_id: i64,
    ) -> Result<Authorization> {
        if actor_id == manager_id {
            return Ok(Authorization::Allowed(Grant::Manager));
        }

        if self.is_hr(actor_id).await? {
            return Ok(Authorization::Allowed(Grant::Hr));
        }

        Ok(Authorization::Forbidden)
    }

    /// May `actor_id` create leave on behalf of `employee_id`?
    /// The employee's manager or HR; delegations do not extend to this.
    pub async fn can_manage_employee(
        &self,
        actor_id: i64,
        employee_id: i64,
    ) -> Result<Authorization> {
        let employee = self
            .directory
            .get(employee_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Employee #{}", employee_id)))?;

        if employee.manager_id == Some(actor_id) {
            return Ok(Authorization::Allowed(Grant::Manager));
        }

        if self.is_hr(actor_id).await? {
            return Ok(Authorization::Allowed(Grant::Hr));
        }

        Ok(Authorization::Forbidden)
    }

    // An actor unknown to the directory has no HR capability.
    async fn is_hr(&self, actor_id: i64) -> Result<bool> {
        let actor = self.directory.get(actor_id).await?;
        Ok(actor.map(|a| a.is_hr).unwrap_or(false))
    }
}
