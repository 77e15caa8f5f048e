use std::path::PathBuf;

use barometer_core::config::ConfigOverrides;
use barometer_server::ServeOptions;

use crate::commands::{load_options, CommandResult};

pub fn run(port: Option<u16>, config_path: Option<PathBuf>, verbosity: u8) -> CommandResult {
    let mut load = load_options(config_path);
    load.overrides = ConfigOverrides { server_port: port, ..ConfigOverrides::default() };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "serve",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    match runtime.block_on(barometer_server::run(ServeOptions { load, verbosity })) {
        Ok(()) => CommandResult::success("serve", "server stopped"),
        Err(error) => CommandResult::failure("serve", "server", format!("{error:#}"), 1),
    }
}
