// Schedule parsing and next fire time calculation
//
// The scheduler engine only sees the ScheduleTrigger trait, so the rotation
// advancer never depends on how ticks are produced.

use crate::errors::ScheduleError;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;
use std::str::FromStr;

/// ScheduleTrigger defines when the next tick is due
pub trait ScheduleTrigger: Send + Sync {
    /// Next fire time strictly after `after`, or `None` if the schedule is exhausted
    fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Default cadence: Mondays at 01:00
pub const WEEKLY_ROTATION_CRON: &str = "0 0 1 * * Mon *";

/// Parse and validate a cron expression
///
/// Uses the `cron` crate syntax with second precision,
/// e.g. `0 0 1 * * Mon *` for Mondays at 01:00.
pub fn parse_cron_expression(expression: &str) -> Result<CronSchedule, ScheduleError> {
    CronSchedule::from_str(expression).map_err(|e| ScheduleError::InvalidCronExpression {
        expression: expression.to_string(),
        reason: e.to_string(),
    })
}

/// Cron expression evaluated in a fixed timezone
#[derive(Debug, Clone)]
pub struct CronTrigger {
    expression: String,
    schedule: CronSchedule,
    timezone: Tz,
}

impl CronTrigger {
    pub fn new(expression: &str, timezone: &str) -> Result<Self, ScheduleError> {
        let schedule = parse_cron_expression(expression)?;
        let timezone =
            Tz::from_str(timezone).map_err(|_| ScheduleError::InvalidTimezone(timezone.to_string()))?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
            timezone,
        })
    }

    /// Next fire time, failing when the schedule yields none
    pub fn next_fire(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
        self.next_fire_after(after)
            .ok_or_else(|| ScheduleError::NoNextExecution(self.expression.clone()))
    }
}

impl ScheduleTrigger for CronTrigger {
    fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let reference_in_tz = after.with_timezone(&self.timezone);
        self.schedule
            .after(&reference_in_tz)
            .next()
            .map(|next| next.with_timezone(&Utc))
    }

    fn describe(&self) -> String {
        format!("cron '{}' in {}", self.expression, self.timezone)
    }
}
