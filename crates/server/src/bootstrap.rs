use std::sync::Arc;

use barometer_core::config::{AppConfig, ConfigError, LoadOptions};
use barometer_core::errors::StoreConfigError;
use barometer_core::pipeline::{PipelineSettings, RequestPipeline};
use barometer_core::ports::LogStore;
use barometer_db::{open_store_with, BigQueryOptions};
use barometer_slack::CommandContext;
use thiserror::Error;
use tracing::info;

use crate::feed::QuoteFeed;
use crate::health::HealthState;
use crate::routes::AppState;

pub struct Application {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<RequestPipeline>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("storage configuration failed: {0}")]
    Storage(#[source] StoreConfigError),
    #[error("decoration feed client could not be built: {0}")]
    DecorationFeed(#[source] reqwest::Error),
}

impl Application {
    pub fn state(&self) -> AppState {
        AppState {
            pipeline: Arc::clone(&self.pipeline),
            context: CommandContext {
                area: self.config.locale.area.clone(),
                debug_only: self.config.pipeline.debug_only,
            },
            health: HealthState {
                backend: self.pipeline.backend(),
                debug_only: self.config.pipeline.debug_only,
            },
        }
    }
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let store = open_store_with(&config.storage.url, bigquery_options(&config))
        .map_err(BootstrapError::Storage)?;
    bootstrap_with_store(config, Arc::new(store))
}

/// Wires the pipeline around an already opened store.
pub fn bootstrap_with_store(
    config: AppConfig,
    store: Arc<dyn LogStore>,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.storage_selected",
        correlation_id = "bootstrap",
        backend = store.backend(),
        "storage backend selected"
    );

    let settings = PipelineSettings {
        token: config.slack.token.clone(),
        measure_policy: config.pipeline.measure_policy(),
    };
    let mut pipeline = RequestPipeline::new(settings, store);

    if config.decoration.enabled {
        let feed =
            QuoteFeed::from_config(&config.decoration).map_err(BootstrapError::DecorationFeed)?;
        pipeline = pipeline.with_decoration(Arc::new(feed));
        info!(
            event_name = "system.bootstrap.decoration_enabled",
            correlation_id = "bootstrap",
            feed_url = %config.decoration.feed_url,
            "reply decoration enabled"
        );
    }

    Ok(Application { config: Arc::new(config), pipeline: Arc::new(pipeline) })
}

fn bigquery_options(config: &AppConfig) -> BigQueryOptions {
    let mut options = BigQueryOptions::default();
    if let Some(endpoint) = &config.storage.bigquery_endpoint {
        options = options.with_endpoint(endpoint.clone());
    }
    if let Some(token) = &config.storage.bigquery_access_token {
        options = options.with_static_token(token.clone());
    }
    options
}
