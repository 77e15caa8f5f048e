use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use barometer_core::config::{AppConfig, DEFAULT_CONFIG_FILE};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

use crate::commands::load_options;

pub fn run(config_path: Option<PathBuf>) -> String {
    let config = match AppConfig::load(load_options(config_path.clone())) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path(config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec![
        "effective config (source precedence: override > env > file > default):".to_string()
    ];

    lines.push(render_line(
        "project_id",
        config.project_id.as_deref().unwrap_or("<unset>"),
        source("project_id", "BB_PROJECT_ID"),
    ));
    lines.push(render_line("storage.url", &config.storage.url, source("storage.url", "BB_TABLE")));
    lines.push(render_line(
        "storage.bigquery_access_token",
        redact_optional(config.storage.bigquery_access_token.as_ref()),
        source("storage.bigquery_access_token", "BB_BIGQUERY_ACCESS_TOKEN"),
    ));
    lines.push(render_line(
        "storage.bigquery_endpoint",
        config.storage.bigquery_endpoint.as_deref().unwrap_or("<default>"),
        source("storage.bigquery_endpoint", "BB_BIGQUERY_ENDPOINT"),
    ));

    lines.push(render_line(
        "slack.token",
        &redact_token(config.slack.token.expose_secret()),
        source("slack.token", "BB_SLACK_TOKEN"),
    ));
    lines.push(render_line("locale.area", &config.locale.area, source("locale.area", "BB_AREA")));

    lines.push(render_line(
        "pipeline.debug_only",
        &config.pipeline.debug_only.to_string(),
        source("pipeline.debug_only", "BB_DEBUG_ONLY"),
    ));
    lines.push(render_line(
        "pipeline.measure_range",
        &config.pipeline.measure_policy().to_string(),
        match (
            source("pipeline.measure_min", "BB_MEASURE_MIN"),
            source("pipeline.measure_max", "BB_MEASURE_MAX"),
        ) {
            (min, max) if min == max => min,
            (min, max) => format!("{min} / {max}"),
        },
    ));

    lines.push(render_line(
        "decoration.enabled",
        &config.decoration.enabled.to_string(),
        source("decoration.enabled", "BB_DECORATION_ENABLED"),
    ));
    lines.push(render_line(
        "decoration.feed_url",
        &config.decoration.feed_url,
        source("decoration.feed_url", "BB_DECORATION_FEED_URL"),
    ));
    lines.push(render_line(
        "decoration.api_key",
        redact_optional(config.decoration.api_key.as_ref()),
        source("decoration.api_key", "BB_DECORATION_API_KEY"),
    ));
    lines.push(render_line(
        "decoration.timeout_secs",
        &config.decoration.timeout_secs.to_string(),
        source("decoration.timeout_secs", "BB_DECORATION_TIMEOUT_SECS"),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", "BB_SERVER_BIND_ADDRESS"),
    ));
    lines.push(render_line(
        "server.port",
        &config.server.port.to_string(),
        source("server.port", "BB_SERVER_PORT"),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", "BB_LOG_LEVEL"),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", "BB_LOG_FORMAT"),
    ));

    lines.join("\n")
}

fn detect_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then_some(path);
    }

    let root = PathBuf::from(DEFAULT_CONFIG_FILE);
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/barometer.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;

    if path.extension().is_some_and(|extension| extension == "json") {
        return legacy_json_doc(&raw);
    }
    raw.parse::<Value>().ok()
}

/// Maps the flat legacy keys onto the sectioned layout so attribution works
/// for both file formats.
fn legacy_json_doc(raw: &str) -> Option<Value> {
    let legacy: serde_json::Value = serde_json::from_str(raw).ok()?;
    let mut doc = toml::map::Map::new();
    let mut section = |section: &str, key: &str, legacy_key: &str| {
        if let Some(value) = legacy.get(legacy_key).and_then(serde_json::Value::as_str) {
            let mut table = toml::map::Map::new();
            table.insert(key.to_string(), Value::String(value.to_string()));
            doc.insert(section.to_string(), Value::Table(table));
        }
    };
    section("storage", "url", "BQ_TABLE");
    section("slack", "token", "SLACK_TOKEN");
    section("locale", "area", "AREA");

    if let Some(project_id) = legacy.get("PROJECT_ID").and_then(serde_json::Value::as_str) {
        doc.insert("project_id".to_string(), Value::String(project_id.to_string()));
    }
    Some(Value::Table(doc))
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var(env_key).is_ok_and(|value| !value.trim().is_empty()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_optional(secret: Option<&SecretString>) -> &'static str {
    if secret.is_some() {
        "<redacted>"
    } else {
        "<unset>"
    }
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    // Slack verification tokens are 24 characters; keep a short hint only.
    let hint: String = trimmed.chars().take(2).collect();
    if trimmed.chars().count() > 8 {
        return format!("{hint}***");
    }

    "<redacted>".to_string()
}
