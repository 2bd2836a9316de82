//! Delegation registry
//!
//! Pure store of manager -> delegate pairs. Who may add or remove a
//! delegation is decided by the authorizer, not here. The `UNIQUE
//! (manager_id, delegate_id)` constraint makes add-if-absent a single atomic
//! statement, so concurrent adds of the same pair converge on one row.

use sqlx::SqlitePool;

use crate::error::{AppError, Result};
use crate::models::Delegation;

/// Result of removing a delegation by identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed(i64),
    NotFound,
}

#[derive(Clone)]
pub struct DelegationRegistry {
    pool: SqlitePool,
}

impl DelegationRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record that `manager_id` delegates to `delegate_id`.
    ///
    /// Adding an existing pair is not an error: the identifier of the row
    /// already stored is returned and nothing is inserted.
    pub async fn add_delegate(&self, manager_id: i64, delegate_id: i64) -> Result<i64> {
        if manager_id == delegate_id {
            return Err(AppError::InvalidArgument(format!(
                "User #{} cannot delegate to themselves",
                manager_id
            )));
        }

        let known: Vec<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id IN (?, ?)")
            .bind(manager_id)
            .bind(delegate_id)
            .fetch_all(&self.pool)
            .await?;
        if let Some(missing) = [manager_id, delegate_id]
            .into_iter()
            .find(|id| !known.contains(id))
        {
            return Err(AppError::InvalidArgument(format!(
                "User #{} does not exist",
                missing
            )));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO delegations (manager_id, delegate_id)
            VALUES (?, ?)
            ON CONFLICT(manager_id, delegate_id) DO NOTHING
            "#,
        )
        .bind(manager_id)
        .bind(delegate_id)
        .execute(&self.pool)
        .await?;

        let id: i64 = sqlx::query_scalar(
            "SELECT id FROM delegations WHERE manager_id = ? AND delegate_id = ?",
        )
        .bind(manager_id)
        .bind(delegate_id)
        .fetch_one(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!(manager_id, delegate_id, delegation_id = id, "Delegation added");
        } else {
            tracing::debug!(manager_id, delegate_id, delegation_id = id, "Delegation already exists");
        }

        Ok(id)
    }

    /// True iff a row holds exactly this (manager, candidate) pair.
    pub async fn is_delegate(&self, candidate_id: i64, manager_id: i64) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM delegations WHERE manager_id = ? AND delegate_id = ?",
        )
        .bind(manager_id)
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }

    pub async fn get(&self, delegation_id: i64) -> Result<Option<Delegation>> {
        let delegation = sqlx::query_as::<_, Delegation>(
            "SELECT id, manager_id, delegate_id FROM delegations WHERE id = ?",
        )
        .bind(delegation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(delegation)
    }

    pub async fn delete_delegation(&self, delegation_id: i64) -> Result<DeleteOutcome> {
        let result = sqlx::query("DELETE FROM delegations WHERE id = ?")
            .bind(delegation_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(DeleteOutcome::NotFound);
        }

        tracing::info!(delegation_id, "Delegation removed");
        Ok(DeleteOutcome::Removed(delegation_id))
    }

    /// Remove a delegation only if it was granted by `manager_id`.
    pub async fn delete_owned(&self, delegation_id: i64, manager_id: i64) -> Result<DeleteOutcome> {
        let result = sqlx::query("DELETE FROM delegations WHERE id = ? AND manager_id = ?")
            .bind(delegation_id)
            .bind(manager_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(DeleteOutcome::NotFound);
        }

        tracing::info!(delegation_id, manager_id, "Delegation removed");
        Ok(DeleteOutcome::Removed(delegation_id))
    }

    /// Delegations granted by a manager, in insertion order
    pub async fn list_for_manager(&self, manager_id: i64) -> Result<Vec<Delegation>> {
        let delegations = sqlx::query_as::<_, Delegation>(
            r#"
            SELECT id, manager_id, delegate_id
            FROM delegations
            WHERE manager_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(manager_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(delegations)
    }

    /// Managers who delegated their approval rights to `delegate_id`
    pub async fn managers_delegating_to(&self, delegate_id: i64) -> Result<Vec<i64>> {
        let managers: Vec<i64> = sqlx::query_scalar(
            "SELECT manager_id FROM delegations WHERE delegate_id = ? ORDER BY id ASC",
        )
        .bind(delegate_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(managers)
    }
}
