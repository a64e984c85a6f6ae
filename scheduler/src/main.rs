// Scheduler binary entry point

use common::bootstrap;
use common::config::Service;
use common::db::repositories::RotationStore;
use common::notifier::NotificationSender;
use common::schedule::{CronTrigger, ScheduleTrigger};
use common::scheduler::{AdvancerConfig, RotationAdvancer, Scheduler, SchedulerEngine};
use common::telemetry;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = bootstrap::load_settings(Service::Scheduler)?;
    bootstrap::init_telemetry(&settings)?;

    info!(
        cron_expression = %settings.scheduler.cron_expression,
        timezone = %settings.scheduler.timezone,
        "Starting release train scheduler"
    );

    telemetry::init_metrics(settings.observability.metrics_port)?;

    let db_pool = bootstrap::init_database_pool(&settings).await?;
    let store: Arc<dyn RotationStore> = Arc::new(bootstrap::init_rotation_repository(
        &settings,
        db_pool.clone(),
    ));
    let notifier: Arc<dyn NotificationSender> = Arc::new(bootstrap::init_slack_notifier(&settings)?);

    let trigger: Arc<dyn ScheduleTrigger> = Arc::new(CronTrigger::new(
        &settings.scheduler.cron_expression,
        &settings.scheduler.timezone,
    )?);

    let advancer = Arc::new(RotationAdvancer::new(
        store,
        notifier,
        AdvancerConfig::from(&settings.scheduler),
    ));
    let scheduler = Arc::new(SchedulerEngine::new(trigger, advancer));
    info!("Scheduler engine created");

    let scheduler_for_shutdown = Arc::clone(&scheduler);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Initiating graceful shutdown");
        if let Err(e) = scheduler_for_shutdown.stop().await {
            error!(error = %e, "Error during scheduler shutdown");
        }
    });

    if let Err(e) = scheduler.start().await {
        error!(error = %e, "Scheduler error");
        return Err(anyhow::anyhow!("Scheduler failed: {}", e));
    }

    db_pool.close().await;
    telemetry::shutdown_tracer();

    info!("Scheduler stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received SIGTERM signal"),
    }
}
