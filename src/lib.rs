//! Leavedesk - leave request approval service
//!
//! Decides who may accept or reject a leave request (the employee's manager,
//! HR, or a delegate of the manager) and performs each decision exactly once.

pub mod audit;
pub mod authorizer;
pub mod config;
pub mod db;
pub mod delegation;
pub mod directory;
pub mod error;
pub mod machine;
pub mod models;
pub mod notify;
pub mod routes;
pub mod store;

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::audit::{AuditSink, TracingAuditSink};
use crate::authorizer::ApprovalAuthorizer;
use crate::delegation::DelegationRegistry;
use crate::directory::{EmployeeDirectory, SqliteDirectory};
use crate::machine::LeaveStateMachine;
use crate::notify::{LogDispatcher, NotificationDispatcher};
use crate::store::{LeaveRequestStore, SqliteLeaveStore};

pub use config::Config;
pub use routes::create_router;

/// Application state shared across handlers
pub struct AppState {
    pub machine: LeaveStateMachine,
    pub authorizer: ApprovalAuthorizer,
    pub registry: DelegationRegistry,
    pub directory: Arc<dyn EmployeeDirectory>,
    pub store: Arc<dyn LeaveRequestStore>,
    pub audit: Arc<dyn AuditSink>,
    pub notifier: Arc<dyn NotificationDispatcher>,
}

impl AppState {
    /// State with audit events and notifications going to the log
    pub fn new(pool: SqlitePool) -> Arc<Self> {
        let directory: Arc<dyn EmployeeDirectory> = Arc::new(SqliteDirectory::new(pool.clone()));
        let notifier = Arc::new(LogDispatcher::new(directory.clone()));
        Self::with_collaborators(pool, Arc::new(TracingAuditSink), notifier)
    }

    pub fn with_collaborators(
        pool: SqlitePool,
        audit: Arc<dyn AuditSink>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Arc<Self> {
        let directory: Arc<dyn EmployeeDirectory> = Arc::new(SqliteDirectory::new(pool.clone()));
        let store: Arc<dyn LeaveRequestStore> = Arc::new(SqliteLeaveStore::new(pool.clone()));
        let registry = DelegationRegistry::new(pool);
        let authorizer = ApprovalAuthorizer::new(directory.clone(), registry.clone());
        let machine = LeaveStateMachine::new(store.clone(), authorizer.clone(), audit.clone());

        Arc::new(Self {
            machine,
            authorizer,
            registry,
            directory,
            store,
            audit,
            notifier,
        })
    }
}
