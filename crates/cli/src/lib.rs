pub mod commands;
pub mod prompt;

use std::path::PathBuf;
use std::process::ExitCode;

use barometer_core::config::DEFAULT_CONFIG_FILE;
use clap::{ArgAction, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "barometer",
    about = "Burnout Barometer operator CLI",
    long_about = "Serve the Slack slash-command endpoint, write configuration files, inspect config, and check readiness.",
    after_help = "Examples:\n  barometer init\n  barometer serve --port 8080\n  barometer doctor --json"
)]
pub struct Cli {
    #[arg(
        short = 'v',
        long = "verbosity",
        action = ArgAction::Count,
        global = true,
        help = "Raise log verbosity (-v debug, -vv trace)"
    )]
    verbosity: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start the HTTP server that receives slash commands")]
    Serve {
        #[arg(long, help = "Port to listen on (default 8080, or server.port from config)")]
        port: Option<u16>,
        #[arg(long, help = "Path to the configuration file")]
        config: Option<PathBuf>,
    },
    #[command(
        about = "Initialize a configuration file",
        long_about = "Create a configuration file from interactive prompts, or from BB_PROJECT_ID, BB_TABLE, BB_SLACK_TOKEN and BB_AREA with --use-env-vars."
    )]
    Init {
        #[arg(long, help = "Read values from BB_* environment variables instead of prompting")]
        use_env_vars: bool,
        #[arg(
            short = 'o',
            long = "output-path",
            default_value = DEFAULT_CONFIG_FILE,
            help = "Output path for the configuration file (.json writes the legacy layout)"
        )]
        output_path: PathBuf,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config {
        #[arg(long, help = "Path to the configuration file")]
        config: Option<PathBuf>,
    },
    #[command(about = "Validate config, storage URL, and locale readiness checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
        #[arg(long, help = "Path to the configuration file")]
        config: Option<PathBuf>,
    },
    #[command(about = "Apply pending schema migrations to Postgres storage")]
    Migrate {
        #[arg(long, help = "Path to the configuration file")]
        config: Option<PathBuf>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Serve { port, config } => commands::serve::run(port, config, cli.verbosity),
        Command::Init { use_env_vars, output_path } => {
            commands::init::run(use_env_vars, &output_path)
        }
        Command::Config { config } => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(config) }
        }
        Command::Doctor { json, config } => commands::doctor::run(json, config),
        Command::Migrate { config } => commands::migrate::run(config),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn verbosity_is_counted_globally() {
        let cli = Cli::try_parse_from(["barometer", "serve", "-vv", "--port", "9000"])
            .expect("parse serve");

        assert_eq!(cli.verbosity, 2);
        assert!(matches!(cli.command, Command::Serve { port: Some(9000), config: None }));
    }

    #[test]
    fn init_defaults_to_toml_output() {
        let cli = Cli::try_parse_from(["barometer", "init", "--use-env-vars"]).expect("parse init");

        match cli.command {
            Command::Init { use_env_vars, output_path } => {
                assert!(use_env_vars);
                assert_eq!(output_path.to_str(), Some("barometer.toml"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn init_accepts_short_output_flag() {
        let cli = Cli::try_parse_from(["barometer", "init", "-o", "config.json"])
            .expect("parse init");
        match cli.command {
            Command::Init { use_env_vars, output_path } => {
                assert!(!use_env_vars);
                assert_eq!(output_path.to_str(), Some("config.json"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
