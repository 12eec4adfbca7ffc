pub mod backend;
pub mod communications;
pub mod config;
pub mod contacts;
pub mod currency;
pub mod dashboard;
pub mod db;
pub mod errors;
pub mod meetings;
pub mod models;
pub mod pipeline;
pub mod service;
pub mod session;
pub mod store;
pub mod sweep;
pub mod templates;
pub mod validation;

use crate::config::CrmConfig;
use crate::currency::format_amount;
use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::service::CrmService;
use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

const SYSTEM_USER: &str = "system";

/// Loads configuration, opens the local database and refreshes the
/// configured organization once, logging the pipeline totals.
pub async fn run() -> AppResult<()> {
    let config = CrmConfig::from_env()?;
    init_tracing(&config.log_dir, &config.log_filter)?;

    let database = Arc::new(Database::new(&config.database_path)?);
    tracing::info!(
        path = %database.path().display(),
        org_id = %config.organization_id,
        "database opened"
    );

    let service = CrmService::new(database, &config.organization_id, SYSTEM_USER, config.clone());
    let report = service.refresh().await?;
    tracing::info!(
        deals = report.deals,
        meetings = report.meetings,
        contacts = report.contacts,
        tasks = report.tasks,
        promoted = report.sweep.promoted(),
        "workspace loaded"
    );

    for aggregate in service.stage_aggregates().await {
        tracing::info!(
            stage = %aggregate.stage,
            count = aggregate.count,
            total = %format_amount(aggregate.total, &config.currency),
            "stage aggregate"
        );
    }
    let summary = service.pipeline_summary().await;
    tracing::info!(
        open = summary.open_count,
        won = summary.won_count,
        forecast = %format_amount(summary.open_value, &config.currency),
        "pipeline summary"
    );
    Ok(())
}

pub fn init_tracing(log_dir: &Path, default_filter: &str) -> AppResult<()> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "crm-desk.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| AppError::Internal(error.to_string()))
}
