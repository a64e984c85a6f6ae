// Configuration management with layered configuration (file, env)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub slack: SlackConfig,
    #[serde(default)]
    pub cloudfront: CloudfrontConfig,
    pub scheduler: SchedulerConfig,
    pub observability: ObservabilityConfig,
}

/// Binary whose settings are being validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Api,
    Scheduler,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    #[default]
    Production,
    Development,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on the store work behind one slash command
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

/// Slack drops a slash command response that takes longer than this
pub const SLACK_RESPONSE_DEADLINE_MS: u64 = 3_000;

fn default_command_timeout_ms() -> u64 {
    2_500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Upper bound on waiting for a pooled connection
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    /// Upper bound on waiting for another transaction's per-channel lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_acquire_timeout_ms() -> u64 {
    2_000
}

fn default_lock_timeout_ms() -> u64 {
    2_000
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub bot_token: String,
    pub signing_secret: String,
    #[serde(default = "default_slack_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_send_timeout_seconds")]
    pub send_timeout_seconds: u64,
    #[serde(default = "default_command_name")]
    pub command_name: String,
    /// Only honoured in the development environment
    #[serde(default)]
    pub insecure_skip_signature_verification: bool,
}

fn default_slack_api_base_url() -> String {
    "https://slack.com/api".to_string()
}

fn default_send_timeout_seconds() -> u64 {
    10
}

fn default_command_name() -> String {
    "/release-train".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudfrontConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub cron_expression: String,
    pub timezone: String,
    pub channel_timeout_seconds: u64,
    pub max_concurrent_channels: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub metrics_port: u16,
    pub tracing_endpoint: Option<String>,
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default configuration
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Environment overrides, e.g. APP__SLACK__SIGNING_SECRET
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Whether inbound requests skip signature verification.
    ///
    /// Requires both the development environment and the explicit flag.
    pub fn skip_signature_verification(&self) -> bool {
        self.environment == AppEnvironment::Development
            && self.slack.insecure_skip_signature_verification
    }

    /// Validate the settings every binary needs
    pub fn validate(&self) -> Result<(), String> {
        self.validate_for(Service::Api)?;
        self.validate_for(Service::Scheduler)
    }

    /// Validate the settings one binary depends on
    pub fn validate_for(&self, service: Service) -> Result<(), String> {
        self.validate_shared()?;
        match service {
            Service::Api => self.validate_api(),
            Service::Scheduler => self.validate_scheduler(),
        }
    }

    fn validate_shared(&self) -> Result<(), String> {
        if self.database.url.is_empty() {
            return Err("Database URL cannot be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.database.acquire_timeout_ms == 0 {
            return Err("Database acquire_timeout_ms must be greater than 0".to_string());
        }
        if self.database.lock_timeout_ms == 0 {
            return Err("Database lock_timeout_ms must be greater than 0".to_string());
        }
        Ok(())
    }

    fn validate_api(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }

        // Store waits must expire inside the command budget so the user gets
        // a failure message rather than a dropped request
        let command_timeout_ms = self.server.command_timeout_ms;
        if command_timeout_ms == 0 || command_timeout_ms > SLACK_RESPONSE_DEADLINE_MS {
            return Err(format!(
                "Server command_timeout_ms must be between 1 and {}",
                SLACK_RESPONSE_DEADLINE_MS
            ));
        }
        if self.database.acquire_timeout_ms >= command_timeout_ms {
            return Err(format!(
                "Database acquire_timeout_ms must be below command_timeout_ms ({})",
                command_timeout_ms
            ));
        }
        if self.database.lock_timeout_ms >= command_timeout_ms {
            return Err(format!(
                "Database lock_timeout_ms must be below command_timeout_ms ({})",
                command_timeout_ms
            ));
        }

        if self.slack.insecure_skip_signature_verification
            && self.environment == AppEnvironment::Production
        {
            return Err(
                "Signature verification cannot be skipped in the production environment"
                    .to_string(),
            );
        }
        if self.slack.signing_secret.is_empty() && !self.skip_signature_verification() {
            return Err("Slack signing_secret cannot be empty".to_string());
        }
        if !self.slack.command_name.starts_with('/') {
            return Err("Slack command_name must start with '/'".to_string());
        }

        if self.cloudfront.enabled && self.cloudfront.token.is_empty() {
            return Err("CloudFront token required when cloudfront is enabled".to_string());
        }

        Ok(())
    }

    fn validate_scheduler(&self) -> Result<(), String> {
        if self.slack.bot_token.is_empty() {
            return Err("Slack bot_token cannot be empty".to_string());
        }
        if self.slack.send_timeout_seconds == 0 {
            return Err("Slack send_timeout_seconds must be greater than 0".to_string());
        }

        if let Err(e) = crate::schedule::parse_cron_expression(&self.scheduler.cron_expression) {
            return Err(e.to_string());
        }
        if chrono_tz::Tz::from_str(&self.scheduler.timezone).is_err() {
            return Err(format!(
                "Scheduler timezone '{}' is not a valid IANA timezone",
                self.scheduler.timezone
            ));
        }
        if self.scheduler.channel_timeout_seconds == 0 {
            return Err("Scheduler channel_timeout_seconds must be greater than 0".to_string());
        }
        if self.scheduler.max_concurrent_channels == 0 {
            return Err("Scheduler max_concurrent_channels must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: AppEnvironment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                command_timeout_ms: default_command_timeout_ms(),
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/releasetrain".to_string(),
                max_connections: 10,
                min_connections: 2,
                acquire_timeout_ms: default_acquire_timeout_ms(),
                lock_timeout_ms: default_lock_timeout_ms(),
                run_migrations: true,
            },
            slack: SlackConfig {
                bot_token: "xoxb-change-me".to_string(),
                signing_secret: "change-me-in-production".to_string(),
                api_base_url: default_slack_api_base_url(),
                send_timeout_seconds: default_send_timeout_seconds(),
                command_name: default_command_name(),
                insecure_skip_signature_verification: false,
            },
            cloudfront: CloudfrontConfig::default(),
            scheduler: SchedulerConfig {
                cron_expression: crate::schedule::WEEKLY_ROTATION_CRON.to_string(),
                timezone: "UTC".to_string(),
                channel_timeout_seconds: 30,
                max_concurrent_channels: 4,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                metrics_port: 9090,
                tracing_endpoint: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_default_environment_is_production() {
        assert_eq!(Settings::default().environment, AppEnvironment::Production);
        assert!(!Settings::default().skip_signature_verification());
    }

    #[test]
    fn test_validation_catches_empty_database_url() {
        let mut settings = Settings::default();
        settings.database.url = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_catches_zero_port() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_skip_flag_rejected_in_production() {
        let mut settings = Settings::default();
        settings.slack.insecure_skip_signature_verification = true;
        assert!(settings.validate().is_err());
        assert!(!settings.skip_signature_verification());
    }

    #[test]
    fn test_skip_flag_honoured_in_development() {
        let mut settings = Settings::default();
        settings.environment = AppEnvironment::Development;
        settings.slack.insecure_skip_signature_verification = true;
        settings.slack.signing_secret = String::new();
        assert!(settings.validate().is_ok());
        assert!(settings.skip_signature_verification());
    }

    #[test]
    fn test_development_alone_does_not_skip_verification() {
        let mut settings = Settings::default();
        settings.environment = AppEnvironment::Development;
        assert!(!settings.skip_signature_verification());
    }

    #[test]
    fn test_validation_catches_empty_signing_secret() {
        let mut settings = Settings::default();
        settings.slack.signing_secret = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_catches_bad_cron_and_timezone() {
        let mut settings = Settings::default();
        settings.scheduler.cron_expression = "every monday".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.scheduler.timezone = "Mars/Olympus_Mons".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_keeps_store_waits_inside_command_timeout() {
        let mut settings = Settings::default();
        settings.database.lock_timeout_ms = 15_000;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.database.acquire_timeout_ms = 30_000;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.server.command_timeout_ms = 10_000;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.database.lock_timeout_ms = settings.server.command_timeout_ms;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_each_binary_only_requires_its_own_secret() {
        let mut settings = Settings::default();
        settings.slack.bot_token = String::new();
        assert!(settings.validate_for(Service::Api).is_ok());
        assert!(settings.validate_for(Service::Scheduler).is_err());

        let mut settings = Settings::default();
        settings.slack.signing_secret = String::new();
        assert!(settings.validate_for(Service::Scheduler).is_ok());
        assert!(settings.validate_for(Service::Api).is_err());
    }

    #[test]
    fn test_validation_catches_cloudfront_without_token() {
        let mut settings = Settings::default();
        settings.cloudfront.enabled = true;
        assert!(settings.validate().is_err());
        settings.cloudfront.token = "origin-secret".to_string();
        assert!(settings.validate().is_ok());
    }
}
