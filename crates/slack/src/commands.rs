use std::fmt;

use serde::Deserialize;

use barometer_core::pipeline::RequestInput;

/// Header Slack sets to the Unix-epoch second the command was issued.
pub const REQUEST_TIMESTAMP_HEADER: &str = "X-Slack-Request-Timestamp";

/// Form fields Slack sends with a slash command.
/// See https://api.slack.com/interactivity/slash-commands#app_command_handling.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SlashCommandPayload {
    pub token: String,
    pub team_id: String,
    pub team_domain: String,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub user_name: String,
    pub command: String,
    pub text: String,
    pub response_url: String,
    pub trigger_id: String,
}

impl fmt::Debug for SlashCommandPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlashCommandPayload")
            .field("token", &"<redacted>")
            .field("team_id", &self.team_id)
            .field("channel_id", &self.channel_id)
            .field("user_id", &self.user_id)
            .field("command", &self.command)
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

/// Deployment settings applied to every incoming command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandContext {
    pub area: String,
    pub debug_only: bool,
}

impl SlashCommandPayload {
    /// Builds the pipeline input. A missing timestamp header becomes an empty
    /// string, which the pipeline rejects as an invalid timestamp.
    pub fn into_request_input(
        self,
        request_timestamp: Option<&str>,
        context: &CommandContext,
    ) -> RequestInput {
        RequestInput {
            text: self.text,
            user_id: self.user_id,
            token: self.token,
            timestamp: request_timestamp.map(str::trim).unwrap_or_default().to_owned(),
            area: context.area.clone(),
            debug: context.debug_only,
        }
    }
}
