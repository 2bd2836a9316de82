//! Notification dispatch
//!
//! Turns a [`TransitionEvent`] into a notice for the employee whose leave was
//! decided. Formatting and delivery of the actual mail happen downstream; this
//! module resolves who to notify and which template applies.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::directory::EmployeeDirectory;
use crate::error::{AppError, Result};
use crate::models::{DayPart, LeaveStatus, TransitionEvent};

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, event: &TransitionEvent) -> Result<()>;
}

/// Mail-ready notice for a decided leave request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveNotice {
    pub event_id: Uuid,
    pub request_id: i64,
    pub status: LeaveStatus,
    /// `request_accepted` or `request_rejected`
    pub template: String,
    pub language: String,
    pub to: String,
    /// Supervisor of the employee's organization, if any
    pub cc: Option<String>,
    pub firstname: String,
    pub lastname: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_date_type: DayPart,
    pub end_date_type: DayPart,
    pub leave_type: String,
    pub cause: Option<String>,
}

fn template_for(status: LeaveStatus) -> &'static str {
    match status {
        LeaveStatus::Accepted => "request_accepted",
        _ => "request_rejected",
    }
}

/// Resolve the recipients of a transition event.
pub async fn build_notice(
    directory: &dyn EmployeeDirectory,
    event: &TransitionEvent,
) -> Result<LeaveNotice> {
    let employee = directory.get(event.employee_id).await?.ok_or_else(|| {
        AppError::NotFound(format!("Employee #{} to notify", event.employee_id))
    })?;

    let supervisor = match employee.organization_id {
        Some(org) => directory.supervisor_of(org).await?,
        None => None,
    };

    Ok(LeaveNotice {
        event_id: event.event_id,
        request_id: event.request_id,
        status: event.status,
        template: template_for(event.status).to_string(),
        language: employee.language,
        to: employee.email,
        cc: supervisor.map(|s| s.email),
        firstname: employee.firstname,
        lastname: employee.lastname,
        start_date: event.start_date,
        end_date: event.end_date,
        start_date_type: event.start_date_type,
        end_date_type: event.end_date_type,
        leave_type: event.leave_type.clone(),
        cause: event.cause.clone(),
    })
}

/// Logs notices instead of delivering them
pub struct LogDispatcher {
    directory: Arc<dyn EmployeeDirectory>,
}

impl LogDispatcher {
    pub fn new(directory: Arc<dyn EmployeeDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(&self, event: &TransitionEvent) -> Result<()> {
        let notice = build_notice(self.directory.as_ref(), event).await?;
        tracing::info!(
            request_id = notice.request_id,
            to = %notice.to,
            cc = ?notice.cc,
            template = %notice.template,
            language = %notice.language,
            "Leave notification"
        );
        Ok(())
    }
}

/// POSTs notices as JSON to a mail relay
pub struct WebhookDispatcher {
    client: Client,
    url: String,
    directory: Arc<dyn EmployeeDirectory>,
}

impl WebhookDispatcher {
    pub fn new(url: impl Into<String>, directory: Arc<dyn EmployeeDirectory>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            directory,
        }
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookDispatcher {
    async fn dispatch(&self, event: &TransitionEvent) -> Result<()> {
        let notice = build_notice(self.directory.as_ref(), event).await?;

        let response = self
            .client
            .post(&self.url)
            .json(&notice)
            .send()
            .await
            .map_err(|e| AppError::Notification(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Notification(format!(
                "Webhook rejected notice: {} - {}",
                status, text
            )));
        }

        tracing::debug!(request_id = notice.request_id, "Notification delivered");
        Ok(())
    }
}
