use std::sync::Arc;

use reqflow_core::config::{AppConfig, ConfigError, LoadOptions};
use reqflow_core::WorkflowService;
use reqflow_db::{
    connect_pool, migrations, DbPool, SqlManagerDirectory, SqlRequestQueries, SqlThresholdPolicy,
    SqlWorkflowStore,
};
use thiserror::Error;
use tracing::info;

use crate::api::AppState;
use crate::notify::TracingDispatcher;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: Arc<AppState>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_pool(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let service = WorkflowService::new(
        SqlWorkflowStore::new(db_pool.clone()),
        SqlThresholdPolicy::new(db_pool.clone()),
        SqlManagerDirectory::new(db_pool.clone()),
        TracingDispatcher,
    );
    let state = Arc::new(AppState { service, queries: SqlRequestQueries::new(db_pool.clone()) });

    Ok(Application { config, db_pool, state })
}
