use std::path::PathBuf;

use barometer_core::config::AppConfig;
use barometer_db::migrations::{self, MigrationError};

use crate::commands::{load_options, CommandResult};

pub fn run(config_path: Option<PathBuf>) -> CommandResult {
    let config = match AppConfig::load(load_options(config_path)) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    match runtime.block_on(migrations::run_pending(&config.storage.url)) {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(error @ MigrationError::UnsupportedBackend(_)) => {
            CommandResult::failure("migrate", "unsupported_backend", error.to_string(), 4)
        }
        Err(error @ MigrationError::Connect(_)) => {
            CommandResult::failure("migrate", "db_connectivity", error.to_string(), 4)
        }
        Err(error @ MigrationError::Migrate(_)) => {
            CommandResult::failure("migrate", "migration", error.to_string(), 5)
        }
    }
}
