use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use vittalogic_core::audit::{AuditEvent, AuditSink};
use vittalogic_core::config::{AppConfig, ConfigError, LoadOptions};
use vittalogic_db::{
    connect_with_settings, migrations, DbPool, SqlApprovalRepository,
    SqlDepartmentBudgetRepository, SqlDepartmentRepository, SqlEmployeeDirectory,
};
use vittalogic_workflow::{
    BudgetService, DepartmentService, LoggingNotificationChannel, WorkflowCoordinator,
};

use crate::api::ApiState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub api_state: ApiState,
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

/// Audit sink for the running server: decisions land in the log stream.
struct LoggingAuditSink;

impl AuditSink for LoggingAuditSink {
    fn emit(&self, event: AuditEvent) {
        info!(
            event_name = %event.event_type,
            correlation_id = %event.correlation_id,
            approval_id = event.approval_id.as_ref().map(|id| id.0.as_str()).unwrap_or("unknown"),
            actor = %event.actor,
            outcome = ?event.outcome,
            "audit event recorded"
        );
    }
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

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
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

    let approvals = Arc::new(SqlApprovalRepository::new(db_pool.clone()));
    let departments = Arc::new(SqlDepartmentRepository::new(db_pool.clone()));
    let budgets = Arc::new(SqlDepartmentBudgetRepository::new(db_pool.clone()));
    let directory = Arc::new(SqlEmployeeDirectory::new(db_pool.clone()));
    let notifier = Arc::new(LoggingNotificationChannel);

    let api_state = ApiState {
        coordinator: Arc::new(WorkflowCoordinator::new(
            approvals.clone(),
            directory,
            notifier.clone(),
            Arc::new(LoggingAuditSink),
        )),
        departments: Arc::new(DepartmentService::new(departments.clone())),
        budgets: Arc::new(BudgetService::new(budgets, departments, approvals, notifier)),
    };

    Ok(Application { config, db_pool, api_state })
}

#[cfg(test)]
mod tests {
    use vittalogic_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn options(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_invalid_database_url() {
        let result = bootstrap(options("postgres://elsewhere")).await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("database.url"));
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_wires_services() {
        let app = bootstrap(options("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('employee', 'department', 'approval', 'department_budget')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected baseline tables to be available after bootstrap");
        assert_eq!(table_count, 4, "bootstrap should expose baseline workflow tables");

        app.db_pool.close().await;
    }
}
