pub mod bootstrap;
pub mod feed;
pub mod health;
pub mod routes;

use anyhow::Result;
use barometer_core::config::{AppConfig, LoadOptions};
use tracing::{info, Level};

#[derive(Clone, Debug, Default)]
pub struct ServeOptions {
    pub load: LoadOptions,
    /// `-v` count from the command line. Raises the configured log level.
    pub verbosity: u8,
}

pub fn log_level(config: &AppConfig, verbosity: u8) -> Level {
    match verbosity {
        0 => config.logging.level.parse::<Level>().unwrap_or(Level::INFO),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

pub fn init_logging(config: &AppConfig, verbosity: u8) {
    use barometer_core::config::LogFormat::*;

    let log_level = log_level(config, verbosity);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

pub async fn run(options: ServeOptions) -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(options.load)?;
    init_logging(&config, options.verbosity);

    let app = bootstrap::bootstrap_with_config(config)?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        backend = app.pipeline.backend(),
        debug_only = app.config.pipeline.debug_only,
        "barometer server listening"
    );

    axum::serve(listener, routes::router(app.state()))
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "barometer server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "could not listen for shutdown signal"
        );
    }
}
