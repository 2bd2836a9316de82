//! Leavedesk server

use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leavedesk::audit::TracingAuditSink;
use leavedesk::directory::SqliteDirectory;
use leavedesk::notify::{LogDispatcher, NotificationDispatcher, WebhookDispatcher};
use leavedesk::{create_router, db, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leavedesk=debug,audit=warn,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    tracing::info!("Database: {}", config.database_url);

    let pool = db::init_pool(&config.database_url, config.max_connections).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    let directory = Arc::new(SqliteDirectory::new(pool.clone()));
    let notifier: Arc<dyn NotificationDispatcher> = match &config.notify_webhook {
        Some(url) => {
            tracing::info!("Leave notices go to {}", url);
            Arc::new(WebhookDispatcher::new(url.clone(), directory))
        }
        None => {
            tracing::info!("No webhook configured, leave notices are logged only");
            Arc::new(LogDispatcher::new(directory))
        }
    };

    let state = AppState::with_collaborators(pool, Arc::new(TracingAuditSink), notifier);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
