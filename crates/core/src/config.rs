use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::record::MeasurePolicy;
use crate::timestamp::is_known_area;

pub const DEFAULT_CONFIG_FILE: &str = "barometer.toml";
pub const DEFAULT_QUOTE_FEED_URL: &str = "https://quotes.rest/qod?category=inspire";

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Cloud project the deployment belongs to. Kept for older config files.
    pub project_id: Option<String>,
    pub storage: StorageConfig,
    pub slack: SlackConfig,
    pub locale: LocaleConfig,
    pub pipeline: PipelineConfig,
    pub decoration: DecorationConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub url: String,
    pub bigquery_access_token: Option<SecretString>,
    pub bigquery_endpoint: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    /// Verification token, already decoded to plaintext.
    pub token: SecretString,
}

#[derive(Clone, Debug)]
pub struct LocaleConfig {
    pub area: String,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub debug_only: bool,
    pub measure_min: Option<i64>,
    pub measure_max: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct DecorationConfig {
    pub enabled: bool,
    pub feed_url: String,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub storage_url: Option<String>,
    pub slack_token: Option<String>,
    pub area: Option<String>,
    pub debug_only: Option<bool>,
    pub server_port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {message}")]
    ParseFile { path: PathBuf, message: String },
    #[error("could not write config file `{path}`: {source}")]
    WriteFile { path: PathBuf, source: std::io::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("slack.token in `{path}` is not valid base64")]
    TokenDecode { path: PathBuf },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            storage: StorageConfig {
                url: String::new(),
                bigquery_access_token: None,
                bigquery_endpoint: None,
            },
            slack: SlackConfig { token: String::new().into() },
            locale: LocaleConfig { area: "UTC".to_string() },
            pipeline: PipelineConfig { debug_only: false, measure_min: None, measure_max: None },
            decoration: DecorationConfig {
                enabled: false,
                feed_url: DEFAULT_QUOTE_FEED_URL.to_string(),
                api_key: None,
                timeout_secs: 3,
            },
            server: ServerConfig { bind_address: "0.0.0.0".to_string(), port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl PipelineConfig {
    pub fn measure_policy(&self) -> MeasurePolicy {
        MeasurePolicy { min: self.measure_min, max: self.measure_max }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch, &path)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch, path: &Path) -> Result<(), ConfigError> {
        if let Some(project_id) = patch.project_id {
            self.project_id = Some(project_id);
        }

        if let Some(storage) = patch.storage {
            if let Some(url) = storage.url {
                self.storage.url = url;
            }
            if let Some(access_token) = storage.bigquery_access_token {
                self.storage.bigquery_access_token = Some(secret_value(access_token));
            }
            if let Some(endpoint) = storage.bigquery_endpoint {
                self.storage.bigquery_endpoint = Some(endpoint);
            }
        }

        if let Some(slack) = patch.slack {
            if let Some(encoded) = slack.token {
                self.slack.token = secret_value(decode_token(&encoded, path)?);
            }
        }

        if let Some(locale) = patch.locale {
            if let Some(area) = locale.area {
                self.locale.area = area;
            }
        }

        if let Some(pipeline) = patch.pipeline {
            if let Some(debug_only) = pipeline.debug_only {
                self.pipeline.debug_only = debug_only;
            }
            if let Some(measure_min) = pipeline.measure_min {
                self.pipeline.measure_min = Some(measure_min);
            }
            if let Some(measure_max) = pipeline.measure_max {
                self.pipeline.measure_max = Some(measure_max);
            }
        }

        if let Some(decoration) = patch.decoration {
            if let Some(enabled) = decoration.enabled {
                self.decoration.enabled = enabled;
            }
            if let Some(feed_url) = decoration.feed_url {
                self.decoration.feed_url = feed_url;
            }
            if let Some(api_key) = decoration.api_key {
                self.decoration.api_key = Some(secret_value(api_key));
            }
            if let Some(timeout_secs) = decoration.timeout_secs {
                self.decoration.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BB_PROJECT_ID") {
            self.project_id = Some(value);
        }

        if let Some(value) = read_env("BB_TABLE") {
            self.storage.url = value;
        }
        if let Some(value) = read_env("BB_BIGQUERY_ACCESS_TOKEN") {
            self.storage.bigquery_access_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("BB_BIGQUERY_ENDPOINT") {
            self.storage.bigquery_endpoint = Some(value);
        }

        if let Some(value) = read_env("BB_SLACK_TOKEN") {
            self.slack.token = secret_value(value);
        }

        if let Some(value) = read_env("BB_AREA") {
            self.locale.area = value;
        }

        if let Some(value) = read_env("BB_DEBUG_ONLY") {
            self.pipeline.debug_only = parse_bool("BB_DEBUG_ONLY", &value)?;
        }
        if let Some(value) = read_env("BB_MEASURE_MIN") {
            self.pipeline.measure_min = Some(parse_i64("BB_MEASURE_MIN", &value)?);
        }
        if let Some(value) = read_env("BB_MEASURE_MAX") {
            self.pipeline.measure_max = Some(parse_i64("BB_MEASURE_MAX", &value)?);
        }

        if let Some(value) = read_env("BB_DECORATION_ENABLED") {
            self.decoration.enabled = parse_bool("BB_DECORATION_ENABLED", &value)?;
        }
        if let Some(value) = read_env("BB_DECORATION_FEED_URL") {
            self.decoration.feed_url = value;
        }
        if let Some(value) = read_env("BB_DECORATION_API_KEY") {
            self.decoration.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("BB_DECORATION_TIMEOUT_SECS") {
            self.decoration.timeout_secs = parse_u64("BB_DECORATION_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BB_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("BB_SERVER_PORT") {
            self.server.port = parse_u16("BB_SERVER_PORT", &value)?;
        }

        if let Some(value) = read_env("BB_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("BB_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(storage_url) = overrides.storage_url {
            self.storage.url = storage_url;
        }
        if let Some(slack_token) = overrides.slack_token {
            self.slack.token = secret_value(slack_token);
        }
        if let Some(area) = overrides.area {
            self.locale.area = area;
        }
        if let Some(debug_only) = overrides.debug_only {
            self.pipeline.debug_only = debug_only;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_storage(&self.storage)?;
        validate_slack(&self.slack)?;
        validate_locale(&self.locale)?;
        validate_pipeline(&self.pipeline)?;
        validate_decoration(&self.decoration)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    /// Writes the config with the Slack token base64-encoded. A `.json` path
    /// gets the flat legacy layout, which only carries project, table, token
    /// and area.
    pub fn write_config(&self, path: &Path) -> Result<(), ConfigError> {
        let is_json = path.extension().is_some_and(|extension| extension == "json");
        let rendered = if is_json {
            serde_json::to_string_pretty(&LegacyJsonConfig::from(self)).map_err(|error| {
                ConfigError::Validation(format!("config could not be rendered: {error}"))
            })?
        } else {
            toml::to_string_pretty(&ConfigFile::from(self)).map_err(|error| {
                ConfigError::Validation(format!("config could not be rendered: {error}"))
            })?
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| ConfigError::WriteFile { path: path.to_path_buf(), source })?;
        }
        fs::write(path, rendered)
            .map_err(|source| ConfigError::WriteFile { path: path.to_path_buf(), source })
    }
}

pub fn encode_token(token: &str) -> String {
    BASE64.encode(token.as_bytes())
}

fn decode_token(encoded: &str, path: &Path) -> Result<String, ConfigError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|_| ConfigError::TokenDecode { path: path.to_path_buf() })?;
    String::from_utf8(bytes).map_err(|_| ConfigError::TokenDecode { path: path.to_path_buf() })
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config/barometer.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    let is_json = path.extension().is_some_and(|extension| extension == "json");
    if is_json {
        return serde_json::from_str::<LegacyJsonConfig>(&interpolated)
            .map(ConfigPatch::from)
            .map_err(|error| ConfigError::ParseFile {
                path: path.to_path_buf(),
                message: error.to_string(),
            });
    }

    toml::from_str::<ConfigPatch>(&interpolated).map_err(|error| ConfigError::ParseFile {
        path: path.to_path_buf(),
        message: error.to_string(),
    })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_storage(storage: &StorageConfig) -> Result<(), ConfigError> {
    if storage.url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "storage.url is required (`bq://project.dataset.table` or `postgres://...`)"
                .to_string(),
        ));
    }

    if let Some(endpoint) = &storage.bigquery_endpoint {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::Validation(
                "storage.bigquery_endpoint must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    if slack.token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "slack.token is required. Get it from https://api.slack.com/apps > Your App > Basic Information > Verification Token".to_string(),
        ));
    }

    Ok(())
}

fn validate_locale(locale: &LocaleConfig) -> Result<(), ConfigError> {
    if !is_known_area(&locale.area) {
        return Err(ConfigError::Validation(format!(
            "locale.area `{}` is not an IANA time zone name (e.g. `Asia/Manila`)",
            locale.area
        )));
    }

    Ok(())
}

fn validate_pipeline(pipeline: &PipelineConfig) -> Result<(), ConfigError> {
    if let (Some(min), Some(max)) = (pipeline.measure_min, pipeline.measure_max) {
        if min > max {
            return Err(ConfigError::Validation(format!(
                "pipeline.measure_min ({min}) must not exceed pipeline.measure_max ({max})"
            )));
        }
    }

    Ok(())
}

fn validate_decoration(decoration: &DecorationConfig) -> Result<(), ConfigError> {
    if !decoration.enabled {
        return Ok(());
    }

    if !decoration.feed_url.starts_with("http://") && !decoration.feed_url.starts_with("https://")
    {
        return Err(ConfigError::Validation(
            "decoration.feed_url must start with http:// or https://".to_string(),
        ));
    }

    if decoration.timeout_secs == 0 || decoration.timeout_secs > 60 {
        return Err(ConfigError::Validation(
            "decoration.timeout_secs must be in range 1..=60".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    project_id: Option<String>,
    storage: Option<StoragePatch>,
    slack: Option<SlackPatch>,
    locale: Option<LocalePatch>,
    pipeline: Option<PipelinePatch>,
    decoration: Option<DecorationPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    url: Option<String>,
    bigquery_access_token: Option<String>,
    bigquery_endpoint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LocalePatch {
    area: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelinePatch {
    debug_only: Option<bool>,
    measure_min: Option<i64>,
    measure_max: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct DecorationPatch {
    enabled: Option<bool>,
    feed_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

/// Flat `config.json` written by the first releases of the barometer CLI.
#[derive(Debug, Deserialize, Serialize)]
struct LegacyJsonConfig {
    #[serde(rename = "PROJECT_ID")]
    project_id: Option<String>,
    #[serde(rename = "BQ_TABLE")]
    table: Option<String>,
    #[serde(rename = "SLACK_TOKEN")]
    token: Option<String>,
    #[serde(rename = "AREA")]
    area: Option<String>,
}

impl From<LegacyJsonConfig> for ConfigPatch {
    fn from(legacy: LegacyJsonConfig) -> Self {
        Self {
            project_id: legacy.project_id,
            storage: Some(StoragePatch { url: legacy.table, ..StoragePatch::default() }),
            slack: Some(SlackPatch { token: legacy.token }),
            locale: Some(LocalePatch { area: legacy.area }),
            ..Self::default()
        }
    }
}

impl From<&AppConfig> for LegacyJsonConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            project_id: config.project_id.clone(),
            table: Some(config.storage.url.clone()),
            token: Some(encode_token(config.slack.token.expose_secret())),
            area: Some(config.locale.area.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    project_id: Option<String>,
    storage: StorageSection,
    slack: SlackSection,
    locale: LocaleSection,
    pipeline: PipelineSection,
    decoration: DecorationSection,
    server: ServerSection,
    logging: LoggingSection,
}

#[derive(Debug, Serialize)]
struct StorageSection {
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    bigquery_access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bigquery_endpoint: Option<String>,
}

#[derive(Debug, Serialize)]
struct SlackSection {
    token: String,
}

#[derive(Debug, Serialize)]
struct LocaleSection {
    area: String,
}

#[derive(Debug, Serialize)]
struct PipelineSection {
    debug_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    measure_min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    measure_max: Option<i64>,
}

#[derive(Debug, Serialize)]
struct DecorationSection {
    enabled: bool,
    feed_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct ServerSection {
    bind_address: String,
    port: u16,
}

#[derive(Debug, Serialize)]
struct LoggingSection {
    level: String,
    format: LogFormat,
}

impl From<&AppConfig> for ConfigFile {
    fn from(config: &AppConfig) -> Self {
        Self {
            project_id: config.project_id.clone(),
            storage: StorageSection {
                url: config.storage.url.clone(),
                bigquery_access_token: config
                    .storage
                    .bigquery_access_token
                    .as_ref()
                    .map(|token| token.expose_secret().to_string()),
                bigquery_endpoint: config.storage.bigquery_endpoint.clone(),
            },
            slack: SlackSection { token: encode_token(config.slack.token.expose_secret()) },
            locale: LocaleSection { area: config.locale.area.clone() },
            pipeline: PipelineSection {
                debug_only: config.pipeline.debug_only,
                measure_min: config.pipeline.measure_min,
                measure_max: config.pipeline.measure_max,
            },
            decoration: DecorationSection {
                enabled: config.decoration.enabled,
                feed_url: config.decoration.feed_url.clone(),
                api_key: config
                    .decoration
                    .api_key
                    .as_ref()
                    .map(|key| key.expose_secret().to_string()),
                timeout_secs: config.decoration.timeout_secs,
            },
            server: ServerSection {
                bind_address: config.server.bind_address.clone(),
                port: config.server.port,
            },
            logging: LoggingSection {
                level: config.logging.level.clone(),
                format: config.logging.format,
            },
        }
    }
}
