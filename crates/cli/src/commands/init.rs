use std::env;
use std::path::Path;

use barometer_core::config::AppConfig;

use crate::commands::CommandResult;
use crate::prompt::{Prompter, StdioPrompter};

pub const REQUIRED_ENV_VARS: [&str; 4] = ["BB_PROJECT_ID", "BB_TABLE", "BB_SLACK_TOKEN", "BB_AREA"];

/// Values collected by `init` before they are turned into a config file.
#[derive(Clone, PartialEq, Eq)]
pub struct InitAnswers {
    pub project_id: String,
    pub table: String,
    pub slack_token: String,
    pub area: String,
}

impl std::fmt::Debug for InitAnswers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitAnswers")
            .field("project_id", &self.project_id)
            .field("table", &self.table)
            .field("slack_token", &"<redacted>")
            .field("area", &self.area)
            .finish()
    }
}

impl InitAnswers {
    pub fn into_config(self) -> AppConfig {
        let mut config = AppConfig::default();
        config.project_id = Some(self.project_id);
        config.storage.url = self.table;
        config.slack.token = self.slack_token.into();
        config.locale.area = self.area;
        config
    }
}

pub fn run(use_env_vars: bool, output_path: &Path) -> CommandResult {
    if use_env_vars {
        return match answers_from_env() {
            Ok(answers) => write(answers, output_path),
            Err(message) => CommandResult::failure("init", "missing_env", message, 2),
        };
    }

    let mut prompter = StdioPrompter::stdio();
    run_with_prompter(&mut prompter, output_path)
}

pub fn run_with_prompter(prompter: &mut impl Prompter, output_path: &Path) -> CommandResult {
    match answers_from_prompt(prompter) {
        Ok(answers) => write(answers, output_path),
        Err(error) => {
            CommandResult::failure("init", "prompt", format!("prompt aborted: {error}"), 2)
        }
    }
}

pub fn answers_from_env() -> Result<InitAnswers, String> {
    Ok(InitAnswers {
        project_id: lookup_env_var(REQUIRED_ENV_VARS[0])?,
        table: lookup_env_var(REQUIRED_ENV_VARS[1])?,
        slack_token: lookup_env_var(REQUIRED_ENV_VARS[2])?,
        area: lookup_env_var(REQUIRED_ENV_VARS[3])?,
    })
}

fn lookup_env_var(key: &str) -> Result<String, String> {
    env::var(key).map_err(|_| format!("cannot find environment variable: {key}"))
}

fn answers_from_prompt(prompter: &mut impl Prompter) -> std::io::Result<InitAnswers> {
    Ok(InitAnswers {
        project_id: prompter.ask("GCP Project ID", "my-gcp-project")?,
        table: prompter.ask("Table to store all logs", "bq://my-gcp-project.my-dataset.my-table")?,
        slack_token: prompter.ask("Slack verification token", "")?,
        area: prompter.ask("Where are you? (Refer to IANA Timezone database)", "Asia/Manila")?,
    })
}

fn write(answers: InitAnswers, output_path: &Path) -> CommandResult {
    let config = answers.into_config();

    if let Err(error) = config.validate() {
        return CommandResult::failure("init", "config_validation", error.to_string(), 2);
    }

    match config.write_config(output_path) {
        Ok(()) => CommandResult::success(
            "init",
            format!("Configuration file generated in {}!", output_path.display()),
        ),
        Err(error) => CommandResult::failure("init", "write_failed", error.to_string(), 3),
    }
}
