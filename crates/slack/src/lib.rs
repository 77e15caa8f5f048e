//! Slack slash-command surface for the barometer
//!
//! - **Slash commands** (`commands`): form payload Slack POSTs to `/log`, and
//!   its conversion into a pipeline request.
//! - **Responses** (`responses`): JSON bodies returned to Slack on failure.
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Add a slash command (e.g. `/barometer`) whose request URL is `https://<host>/log`
//! 3. Copy the app's Verification Token into `BB_SLACK_TOKEN` or `barometer init`

pub mod commands;
pub mod responses;

pub use commands::{CommandContext, SlashCommandPayload, REQUEST_TIMESTAMP_HEADER};
pub use responses::{ErrorBody, PongBody};
