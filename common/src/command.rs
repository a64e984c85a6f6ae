// Slash command processing: query, delete or replace a channel rotation

use crate::db::repositories::RotationStore;
use crate::mentions::{format_mention, parse_mentions};
use crate::telemetry;
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

/// Who sees a command result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Audience {
    /// Only the user who issued the command
    #[serde(rename = "ephemeral")]
    Private,
    /// Everyone in the channel
    #[serde(rename = "in_channel")]
    Public,
}

/// User-facing outcome of a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    pub audience: Audience,
    pub message: String,
}

impl CommandResult {
    pub fn private(message: impl Into<String>) -> Self {
        Self {
            audience: Audience::Private,
            message: message.into(),
        }
    }

    pub fn public(message: impl Into<String>) -> Self {
        Self {
            audience: Audience::Public,
            message: message.into(),
        }
    }
}

/// The operation selected by the command text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationCommand {
    Query,
    Delete,
    Replace(Vec<String>),
}

impl RotationCommand {
    /// Classify trimmed command text.
    ///
    /// Replace carries the parsed mentions, which may be empty.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return RotationCommand::Query;
        }

        let lowered = text.to_lowercase();
        if lowered == "delete" || lowered == "--delete" {
            return RotationCommand::Delete;
        }

        RotationCommand::Replace(parse_mentions(text))
    }

    fn operation(&self) -> &'static str {
        match self {
            RotationCommand::Query => "query",
            RotationCommand::Delete => "delete",
            RotationCommand::Replace(_) => "replace",
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            RotationCommand::Query => FETCH_FAILED_MESSAGE,
            RotationCommand::Delete => DELETE_FAILED_MESSAGE,
            RotationCommand::Replace(_) => UPDATE_FAILED_MESSAGE,
        }
    }
}

pub const NO_ROTATION_MESSAGE: &str = ":warning: *No rotation set for this channel.*";
pub const FETCH_FAILED_MESSAGE: &str = ":warning: *Failed to fetch rotation.*";
pub const DELETED_MESSAGE: &str = ":white_check_mark: *Rotation deleted for this channel.*";
pub const DELETE_FAILED_MESSAGE: &str = ":x: *Failed to delete rotation.*";
pub const NO_MENTIONS_MESSAGE: &str = ":warning: *No valid user mentions found.*";
pub const UPDATE_FAILED_MESSAGE: &str = ":x: *Failed to update rotation.*";

/// Turns an authenticated command into a store operation
#[derive(Clone)]
pub struct CommandProcessor {
    store: Arc<dyn RotationStore>,
    timeout: Duration,
}

impl CommandProcessor {
    pub fn new(store: Arc<dyn RotationStore>) -> Self {
        Self {
            store,
            timeout: Duration::from_millis(2_500),
        }
    }

    /// Bound the store work behind a single command
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run a command for a channel.
    ///
    /// Never fails: store errors become private messages so the channel stays
    /// usable for a retry.
    #[instrument(skip(self, text))]
    pub async fn process(&self, channel_id: &str, text: &str) -> CommandResult {
        let command = RotationCommand::parse(text);
        let operation = command.operation();
        let failure_message = command.failure_message();

        let work = async {
            match command {
                RotationCommand::Query => self.query(channel_id).await,
                RotationCommand::Delete => self.delete(channel_id).await,
                RotationCommand::Replace(user_ids) => self.replace(channel_id, &user_ids).await,
            }
        };

        // A dropped store future rolls back its transaction
        let (result, succeeded) = match tokio::time::timeout(self.timeout, work).await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(
                    channel_id = %channel_id,
                    operation = operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Rotation command timed out"
                );
                (CommandResult::private(failure_message), false)
            }
        };

        telemetry::record_command(operation, if succeeded { "ok" } else { "error" });
        result
    }

    async fn query(&self, channel_id: &str) -> (CommandResult, bool) {
        match self.store.get_rotation(channel_id).await {
            Ok(user_ids) if user_ids.is_empty() => (CommandResult::private(NO_ROTATION_MESSAGE), true),
            Ok(user_ids) => (CommandResult::public(format_rotation(&user_ids)), true),
            Err(e) => {
                error!(channel_id = %channel_id, error = %e, "Failed to fetch rotation");
                (CommandResult::private(FETCH_FAILED_MESSAGE), false)
            }
        }
    }

    async fn delete(&self, channel_id: &str) -> (CommandResult, bool) {
        match self.store.delete_rotation(channel_id).await {
            Ok(removed) => {
                info!(channel_id = %channel_id, removed = removed, "Rotation delete requested");
                (CommandResult::public(DELETED_MESSAGE), true)
            }
            Err(e) => {
                error!(channel_id = %channel_id, error = %e, "Failed to delete rotation");
                (CommandResult::private(DELETE_FAILED_MESSAGE), false)
            }
        }
    }

    async fn replace(&self, channel_id: &str, user_ids: &[String]) -> (CommandResult, bool) {
        if user_ids.is_empty() {
            info!(channel_id = %channel_id, "No mentions in replace command, ignoring");
            return (CommandResult::private(NO_MENTIONS_MESSAGE), true);
        }

        match self.store.replace_rotation(channel_id, user_ids).await {
            Ok(stored) => (
                CommandResult::public(format!(
                    ":white_check_mark: *Rotation updated* for <#{}> with *{}* users.",
                    channel_id, stored
                )),
                true,
            ),
            Err(e) => {
                error!(channel_id = %channel_id, error = %e, "Failed to replace rotation");
                (CommandResult::private(UPDATE_FAILED_MESSAGE), false)
            }
        }
    }
}

/// 1-indexed listing of a rotation
pub fn format_rotation(user_ids: &[String]) -> String {
    let mut listing = String::from("*Current Rotation:*\n");
    for (i, user_id) in user_ids.iter().enumerate() {
        let _ = writeln!(listing, "{}. {}", i + 1, format_mention(user_id));
    }
    listing
}
