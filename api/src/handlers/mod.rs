pub mod commands;
pub mod health;
pub mod metrics;

// Common response types
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::command::{Audience, CommandResult};
use serde::Serialize;

/// Slack slash command response with a single mrkdwn section
#[derive(Debug, Serialize)]
pub struct SlackResponse {
    pub response_type: Audience,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Serialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: BlockText,
}

#[derive(Debug, Serialize)]
pub struct BlockText {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

impl From<CommandResult> for SlackResponse {
    fn from(result: CommandResult) -> Self {
        Self {
            response_type: result.audience,
            blocks: vec![Block {
                kind: "section",
                text: BlockText {
                    kind: "mrkdwn",
                    text: result.message,
                },
            }],
        }
    }
}

impl IntoResponse for SlackResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
