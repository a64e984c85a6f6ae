// Bootstrap utilities shared by the api and scheduler binaries

use crate::config::{Service, Settings};
use crate::db::repositories::RotationRepository;
use crate::db::DbPool;
use crate::notifier::SlackNotifier;
use anyhow::{Context, Result};
use tracing::info;

/// Load settings and reject invalid combinations before anything starts
pub fn load_settings(service: Service) -> Result<Settings> {
    let settings = Settings::load().context("Failed to load configuration")?;
    settings
        .validate_for(service)
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    Ok(settings)
}

/// Initialize logging from the observability settings
pub fn init_telemetry(settings: &Settings) -> Result<()> {
    crate::telemetry::init_logging(
        &settings.observability.log_level,
        settings.observability.tracing_endpoint.as_deref(),
    )
}

/// Initialize database pool, applying migrations when enabled
///
/// # Errors
/// Returns error if the pool cannot connect or a migration fails
#[tracing::instrument(skip(settings))]
pub async fn init_database_pool(settings: &Settings) -> Result<DbPool> {
    info!("Initializing database pool");

    let db_pool = DbPool::new(&settings.database)
        .await
        .context("Failed to initialize database pool")?;

    if settings.database.run_migrations {
        db_pool
            .migrate()
            .await
            .context("Failed to apply database migrations")?;
    } else {
        info!("Skipping database migrations");
    }

    info!("Database pool initialized");
    Ok(db_pool)
}

/// Rotation store bound to the configured lock timeout
pub fn init_rotation_repository(settings: &Settings, db_pool: DbPool) -> RotationRepository {
    RotationRepository::new(db_pool).with_lock_timeout_ms(settings.database.lock_timeout_ms)
}

/// Slack notifier for announcements
pub fn init_slack_notifier(settings: &Settings) -> Result<SlackNotifier> {
    SlackNotifier::from_config(&settings.slack).context("Failed to create Slack notifier")
}
