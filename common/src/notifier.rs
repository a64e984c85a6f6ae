// Outbound channel notifications

use crate::config::SlackConfig;
use crate::errors::SendError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

/// Delivers a message to a channel.
///
/// Implementations must only return `Ok` once delivery is confirmed, because
/// the rotation is committed based on this result.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, channel_id: &str, text: &str) -> Result<(), SendError>;
}

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts messages with Slack's `chat.postMessage` Web API method
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: Client,
    api_base_url: String,
    bot_token: String,
    timeout_seconds: u64,
}

impl SlackNotifier {
    /// Create a notifier whose requests give up after `timeout_seconds`
    pub fn new(
        api_base_url: impl Into<String>,
        bot_token: impl Into<String>,
        timeout_seconds: u64,
    ) -> Result<Self, SendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| {
                SendError::InvalidConfiguration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            timeout_seconds,
        })
    }

    pub fn from_config(config: &SlackConfig) -> Result<Self, SendError> {
        Self::new(
            config.api_base_url.clone(),
            config.bot_token.clone(),
            config.send_timeout_seconds,
        )
    }

    fn post_message_url(&self) -> String {
        format!("{}/chat.postMessage", self.api_base_url)
    }
}

#[async_trait]
impl NotificationSender for SlackNotifier {
    #[instrument(skip(self, text))]
    async fn send(&self, channel_id: &str, text: &str) -> Result<(), SendError> {
        let response = self
            .client
            .post(self.post_message_url())
            .bearer_auth(&self.bot_token)
            .json(&PostMessageRequest {
                channel: channel_id,
                text,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SendError::Timeout(self.timeout_seconds)
                } else {
                    SendError::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Slack rejected message");
            return Err(SendError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let payload: PostMessageResponse = response.json().await.map_err(|e| {
            SendError::RequestFailed(format!("Invalid chat.postMessage response: {}", e))
        })?;

        if !payload.ok {
            let error = payload.error.unwrap_or_else(|| "unknown_error".to_string());
            tracing::warn!(error = %error, "Slack API returned an error");
            return Err(SendError::Api(error));
        }

        tracing::debug!("Message posted to channel");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_message_url_trims_trailing_slash() {
        let notifier = SlackNotifier::new("https://slack.example/api/", "xoxb-test", 5).unwrap();
        assert_eq!(
            notifier.post_message_url(),
            "https://slack.example/api/chat.postMessage"
        );
    }

    #[test]
    fn test_from_config_uses_settings() {
        let config = crate::config::Settings::default().slack;
        let notifier = SlackNotifier::from_config(&config).unwrap();
        assert_eq!(notifier.timeout_seconds, config.send_timeout_seconds);
        assert!(notifier.post_message_url().starts_with("https://slack.com/api"));
    }
}
