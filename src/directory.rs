//! Employee directory
//!
//! The directory owns employee and organization data. This crate only reads
//! it, and never caches a lookup across calls: a manager reassignment is
//! visible to the very next authorization decision.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::Employee;

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Point lookup by identifier
    async fn get(&self, id: i64) -> Result<Option<Employee>>;

    /// Employees whose direct manager is `manager_id`
    async fn collaborators_of(&self, manager_id: i64) -> Result<Vec<Employee>>;

    /// Supervisor of an organization, copied on leave notifications
    async fn supervisor_of(&self, organization_id: i64) -> Result<Option<Employee>>;
}

/// Directory backed by the `users` and `organizations` tables
#[derive(Clone)]
pub struct SqliteDirectory {
    pool: SqlitePool,
}

impl SqliteDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeDirectory for SqliteDirectory {
    async fn get(&self, id: i64) -> Result<Option<Employee>> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT id, firstname, lastname, email, manager_id, organization_id, is_hr, language
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Employee::from))
    }

    async fn collaborators_of(&self, manager_id: i64) -> Result<Vec<Employee>> {
        let rows = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT id, firstname, lastname, email, manager_id, organization_id, is_hr, language
            FROM users
            WHERE manager_id = ?
            ORDER BY lastname ASC, firstname ASC, id ASC
            "#,
        )
        .bind(manager_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Employee::from).collect())
    }

    async fn supervisor_of(&self, organization_id: i64) -> Result<Option<Employee>> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT u.id, u.firstname, u.lastname, u.email, u.manager_id, u.organization_id, u.is_hr, u.language
            FROM organizations o
            JOIN users u ON u.id = o.supervisor_id
            WHERE o.id = ?
            "#,
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Employee::from))
    }
}

#[derive(sqlx::FromRow)]
struct EmployeeRow {
    id: i64,
    firstname: String,
    lastname: String,
    email: String,
    manager_id: Option<i64>,
    organization_id: Option<i64>,
    is_hr: bool,
    language: String,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Employee {
            id: row.id,
            firstname: row.firstname,
            lastname: row.lastname,
            email: row.email,
            manager_id: row.manager_id,
            organization_id: row.organization_id,
            is_hr: row.is_hr,
            language: row.language,
        }
    }
}
