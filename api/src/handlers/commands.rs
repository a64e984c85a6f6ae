use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use common::command::CommandResult;
use serde::Deserialize;

use crate::handlers::SlackResponse;
use crate::state::AppState;

pub const MISSING_CHANNEL_MESSAGE: &str = ":warning: *Missing channel_id in request.*";

/// Fields Slack posts for a slash command; the rest are ignored
#[derive(Debug, Deserialize)]
pub struct SlashCommandForm {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user_id: String,
}

/// Slash command endpoint. The signature has already been verified.
#[tracing::instrument(
    skip(state, form),
    fields(command = %form.command, channel_id = %form.channel_id, user_id = %form.user_id)
)]
pub async fn handle_slash_command(
    State(state): State<AppState>,
    Form(form): Form<SlashCommandForm>,
) -> Response {
    if form.command != state.config.slack.command_name {
        tracing::warn!("Unknown slash command");
        return (StatusCode::NOT_FOUND, "Unknown command").into_response();
    }

    let channel_id = form.channel_id.trim();
    if channel_id.is_empty() {
        tracing::warn!("Slash command without channel_id");
        return (
            StatusCode::BAD_REQUEST,
            Json(SlackResponse::from(CommandResult::private(
                MISSING_CHANNEL_MESSAGE,
            ))),
        )
            .into_response();
    }

    let result = state.processor.process(channel_id, &form.text).await;
    SlackResponse::from(result).into_response()
}
