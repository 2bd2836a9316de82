//! Leave request store
//!
//! The store exclusively owns leave request rows. Status only ever changes
//! through [`LeaveRequestStore::transition_status`], a single conditional
//! `UPDATE` that checks and sets in one statement.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::{AppError, Result};
use crate::models::{CreateLeaveRequest, LeaveRequest, LeaveStatus, RequestFilter};

#[async_trait]
pub trait LeaveRequestStore: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<LeaveRequest>>;

    /// Move `id` from `from` to `to`. Returns `false` when the persisted
    /// status no longer equals `from` (or the row is gone); nothing is
    /// written in that case.
    async fn transition_status(&self, id: i64, from: LeaveStatus, to: LeaveStatus)
        -> Result<bool>;

    /// Requests of employees whose manager is one of `manager_ids`, most
    /// recent start date first
    async fn list_for_managers(
        &self,
        manager_ids: &[i64],
        filter: RequestFilter,
    ) -> Result<Vec<LeaveRequest>>;

    async fn create(&self, employee_id: i64, leave: &CreateLeaveRequest) -> Result<LeaveRequest>;
}

/// Database store
#[derive(Clone)]
pub struct SqliteLeaveStore {
    pool: SqlitePool,
}

impl SqliteLeaveStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const LEAVE_COLUMNS: &str = "l.id, l.employee_id, l.status, l.start_date, l.end_date, \
     l.start_date_type, l.end_date_type, l.duration, l.leave_type, l.cause";

#[async_trait]
impl LeaveRequestStore for SqliteLeaveStore {
    async fn get(&self, id: i64) -> Result<Option<LeaveRequest>> {
        let row = sqlx::query_as::<_, LeaveRow>(&format!(
            "SELECT {} FROM leaves l WHERE l.id = ?",
            LEAVE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(LeaveRequest::try_from).transpose()
    }

    async fn transition_status(
        &self,
        id: i64,
        from: LeaveStatus,
        to: LeaveStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE leaves SET status = ? WHERE id = ? AND status = ?
            "#,
        )
        .bind(to.code())
        .bind(id)
        .bind(from.code())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_for_managers(
        &self,
        manager_ids: &[i64],
        filter: RequestFilter,
    ) -> Result<Vec<LeaveRequest>> {
        if manager_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM leaves l JOIN users u ON u.id = l.employee_id WHERE u.manager_id IN (",
            LEAVE_COLUMNS
        ));
        let mut ids = query.separated(", ");
        for id in manager_ids {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");

        if filter == RequestFilter::Requested {
            query
                .push(" AND l.status = ")
                .push_bind(LeaveStatus::Submitted.code());
        }
        query.push(" ORDER BY l.start_date DESC, l.id DESC");

        let rows = query
            .build_query_as::<LeaveRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(LeaveRequest::try_from).collect()
    }

    async fn create(&self, employee_id: i64, leave: &CreateLeaveRequest) -> Result<LeaveRequest> {
        if leave.end_date < leave.start_date {
            return Err(AppError::InvalidArgument(
                "End date precedes start date".to_string(),
            ));
        }

        let id = sqlx::query(
            r#"
            INSERT INTO leaves (employee_id, status, start_date, end_date, start_date_type, end_date_type, duration, leave_type, cause)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(employee_id)
        .bind(leave.status.code())
        .bind(leave.start_date)
        .bind(leave.end_date)
        .bind(leave.start_date_type.as_str())
        .bind(leave.end_date_type.as_str())
        .bind(leave.duration)
        .bind(&leave.leave_type)
        .bind(&leave.cause)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(LeaveRequest {
            id,
            employee_id,
            status: leave.status,
            start_date: leave.start_date,
            end_date: leave.end_date,
            start_date_type: leave.start_date_type,
            end_date_type: leave.end_date_type,
            duration: leave.duration,
            leave_type: leave.leave_type.clone(),
            cause: leave.cause.clone(),
        })
    }
}

// Internal row type for sqlx

#[derive(sqlx::FromRow)]
struct LeaveRow {
    id: i64,
    employee_id: i64,
    status: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    start_date_type: String,
    end_date_type: String,
    duration: f64,
    leave_type: String,
    cause: Option<String>,
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = AppError;

    fn try_from(row: LeaveRow) -> Result<Self> {
        let status = LeaveStatus::from_code(row.status).ok_or_else(|| {
            AppError::Corrupt(format!(
                "Leave request #{} has unknown status code {}",
                row.id, row.status
            ))
        })?;

        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            status,
            start_date: row.start_date,
            end_date: row.end_date,
            start_date_type: row.start_date_type.parse().map_err(|e| {
                AppError::Corrupt(format!("Leave request #{}: {}", row.id, e))
            })?,
            end_date_type: row.end_date_type.parse().map_err(|e| {
                AppError::Corrupt(format!("Leave request #{}: {}", row.id, e))
            })?,
            duration: row.duration,
            leave_type: row.leave_type,
            cause: row.cause,
        })
    }
}
