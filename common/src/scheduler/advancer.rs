// Rotation advancer: one rotate-and-announce pass over every channel

use crate::db::repositories::{Announce, RotationStore};
use crate::errors::{RotateError, SendError, StoreError};
use crate::mentions::format_mention;
use crate::models::RotationOutcome;
use crate::notifier::NotificationSender;
use crate::telemetry;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Configuration for a rotation pass
#[derive(Debug, Clone)]
pub struct AdvancerConfig {
    /// Upper bound on a single channel's rotate-and-announce
    pub channel_timeout: Duration,
    /// Channels processed at the same time
    pub max_concurrent_channels: usize,
}

impl Default for AdvancerConfig {
    fn default() -> Self {
        Self {
            channel_timeout: Duration::from_secs(30),
            max_concurrent_channels: 4,
        }
    }
}

impl From<&crate::config::SchedulerConfig> for AdvancerConfig {
    fn from(config: &crate::config::SchedulerConfig) -> Self {
        Self {
            channel_timeout: Duration::from_secs(config.channel_timeout_seconds),
            max_concurrent_channels: config.max_concurrent_channels,
        }
    }
}

/// Counts for one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    pub advanced: usize,
    pub empty: usize,
    pub failed: usize,
}

#[derive(Debug)]
enum ChannelFailure {
    Rotate(RotateError),
    TimedOut,
}

impl ChannelFailure {
    fn reason(&self) -> &'static str {
        match self {
            ChannelFailure::Rotate(e) => e.reason(),
            ChannelFailure::TimedOut => "timeout",
        }
    }
}

impl std::fmt::Display for ChannelFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelFailure::Rotate(e) => write!(f, "{}", e),
            ChannelFailure::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Text posted to a channel when a user's turn comes up
pub fn announcement_text(user_id: &str) -> String {
    format!(
        "🔁 This week's release train engineer: {}",
        format_mention(user_id)
    )
}

/// Rotates every channel once, announcing each new head
pub struct RotationAdvancer {
    store: Arc<dyn RotationStore>,
    notifier: Arc<dyn NotificationSender>,
    config: AdvancerConfig,
}

impl RotationAdvancer {
    pub fn new(
        store: Arc<dyn RotationStore>,
        notifier: Arc<dyn NotificationSender>,
        config: AdvancerConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    /// Advance every channel with a rotation.
    ///
    /// A failing channel is logged and counted; it never stops the others.
    /// Only failing to list channels fails the pass.
    #[instrument(skip(self), fields(tick_id = %Uuid::new_v4()))]
    pub async fn advance_all(&self) -> Result<AdvanceReport, StoreError> {
        let started = Instant::now();

        let channels = self.store.list_channels().await.map_err(|e| {
            error!(error = %e, "Failed to list channels with rotations");
            telemetry::record_rotation_failure("list");
            e
        })?;

        info!(channels = channels.len(), "Starting rotation pass");

        let concurrency = self.config.max_concurrent_channels.max(1);
        let outcomes: Vec<Result<RotationOutcome, ChannelFailure>> =
            stream::iter(channels)
                .map(|channel_id| async move { self.advance_channel(&channel_id).await })
                .buffer_unordered(concurrency)
                .collect()
                .await;

        let mut report = AdvanceReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(RotationOutcome::Advanced { .. }) => report.advanced += 1,
                Ok(RotationOutcome::Empty) => report.empty += 1,
                Err(_) => report.failed += 1,
            }
        }

        let elapsed = started.elapsed().as_secs_f64();
        telemetry::record_tick_duration(elapsed);

        info!(
            advanced = report.advanced,
            empty = report.empty,
            failed = report.failed,
            duration_seconds = elapsed,
            "Rotation pass finished"
        );
        Ok(report)
    }

    /// Rotate one channel, bounded by the channel timeout.
    ///
    /// A timeout drops the store transaction, which rolls it back.
    #[instrument(skip(self))]
    async fn advance_channel(&self, channel_id: &str) -> Result<RotationOutcome, ChannelFailure> {
        let result = tokio::time::timeout(self.config.channel_timeout, self.rotate(channel_id))
            .await
            .map_err(|_| ChannelFailure::TimedOut)
            .and_then(|r| r.map_err(ChannelFailure::Rotate));

        match &result {
            Ok(RotationOutcome::Advanced { announced, .. }) => {
                telemetry::record_rotation_advanced();
                info!(channel_id = %channel_id, user_id = %announced, "Announced next engineer");
            }
            Ok(RotationOutcome::Empty) => {}
            Err(failure) => {
                telemetry::record_rotation_failure(failure.reason());
                warn!(
                    channel_id = %channel_id,
                    reason = failure.reason(),
                    error = %failure,
                    "Channel rotation failed, will retry next tick"
                );
            }
        }

        result
    }

    async fn rotate(&self, channel_id: &str) -> Result<RotationOutcome, RotateError> {
        let notifier = Arc::clone(&self.notifier);
        let channel = channel_id.to_string();
        let announce: Announce<'_> = Box::new(
            move |user_id: String| -> BoxFuture<'static, Result<(), SendError>> {
                Box::pin(async move {
                    notifier
                        .send(&channel, &announcement_text(&user_id))
                        .await
                })
            },
        );

        self.store.rotate_once(channel_id, announce).await
    }
}
