// Error handling framework

use thiserror::Error;

/// Request authentication errors
///
/// Any of these rejects the inbound request before the store is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    #[error("Invalid request timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Request timestamp outside freshness window (skew {skew_seconds}s)")]
    StaleTimestamp { skew_seconds: i64 },

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Invalid request signature")]
    InvalidSignature,

    #[error("Invalid signing secret: {0}")]
    InvalidSecret(String),
}

impl AuthError {
    /// Short label used for metrics and log fields
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingHeader(_) => "missing_header",
            AuthError::InvalidTimestamp(_) => "invalid_timestamp",
            AuthError::StaleTimestamp { .. } => "stale_timestamp",
            AuthError::MalformedSignature(_) => "malformed_signature",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::InvalidSecret(_) => "invalid_secret",
        }
    }
}

/// Rotation store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Database health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Timed out waiting for channel lock: {0}")]
    LockTimeout(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Notification delivery errors
#[derive(Error, Debug)]
pub enum SendError {
    #[error("Notification request failed: {0}")]
    RequestFailed(String),

    #[error("Notification timed out after {0} seconds")]
    Timeout(u64),

    #[error("Notification rejected with status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Slack API error: {0}")]
    Api(String),

    #[error("Invalid notification client configuration: {0}")]
    InvalidConfiguration(String),
}

/// Failure of a single rotate-by-one
#[derive(Error, Debug)]
pub enum RotateError {
    #[error("Announcement failed, rotation unchanged: {0}")]
    Send(#[from] SendError),

    #[error("Rotation store failed: {0}")]
    Store(#[from] StoreError),
}

impl RotateError {
    pub fn reason(&self) -> &'static str {
        match self {
            RotateError::Send(_) => "send",
            RotateError::Store(_) => "store",
        }
    }
}

/// Schedule-related errors
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCronExpression { expression: String, reason: String },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("No next fire time available for schedule '{0}'")]
    NoNextExecution(String),
}

// Postgres SQLSTATE codes
const UNIQUE_VIOLATION: &str = "23505";
const CHECK_VIOLATION: &str = "23514";
const LOCK_NOT_AVAILABLE: &str = "55P03";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) | Some(CHECK_VIOLATION) => {
                    StoreError::ConstraintViolation(db_err.message().to_string())
                }
                Some(LOCK_NOT_AVAILABLE) => StoreError::LockTimeout(db_err.message().to_string()),
                _ => StoreError::QueryFailed(db_err.message().to_string()),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::ConnectionFailed(err.to_string())
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(err.to_string())
    }
}

impl From<reqwest::Error> for SendError {
    fn from(err: reqwest::Error) -> Self {
        SendError::RequestFailed(err.to_string())
    }
}
