use std::path::PathBuf;

use barometer_core::config::AppConfig;
use barometer_core::timestamp::is_known_area;
use barometer_db::{open_store, Store};
use serde::Serialize;

use crate::commands::{load_options, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool, config_path: Option<PathBuf>) -> CommandResult {
    let report = build_report(config_path);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(config_path: Option<PathBuf>) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(load_options(config_path)) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_storage_url(&config));
            checks.push(check_locale_area(&config));
            checks.push(check_decoration(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["storage_url", "locale_area", "decoration_feed"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_storage_url(config: &AppConfig) -> DoctorCheck {
    match open_store(&config.storage.url) {
        Ok(Store::BigQuery(store)) => DoctorCheck {
            name: "storage_url",
            status: CheckStatus::Pass,
            details: format!("bigquery table `{}` (validated on first insert)", store.table()),
        },
        Ok(Store::Postgres(_)) => DoctorCheck {
            name: "storage_url",
            status: CheckStatus::Pass,
            details: "postgres url accepted; run `barometer migrate` to create the logs table"
                .to_string(),
        },
        Err(error) => DoctorCheck {
            name: "storage_url",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_locale_area(config: &AppConfig) -> DoctorCheck {
    if is_known_area(&config.locale.area) {
        DoctorCheck {
            name: "locale_area",
            status: CheckStatus::Pass,
            details: format!("timestamps resolved in `{}`", config.locale.area),
        }
    } else {
        DoctorCheck {
            name: "locale_area",
            status: CheckStatus::Fail,
            details: format!("`{}` is not in the IANA time zone database", config.locale.area),
        }
    }
}

fn check_decoration(config: &AppConfig) -> DoctorCheck {
    if !config.decoration.enabled {
        return DoctorCheck {
            name: "decoration_feed",
            status: CheckStatus::Skipped,
            details: "decoration disabled; replies use the default acknowledgment".to_string(),
        };
    }

    DoctorCheck {
        name: "decoration_feed",
        status: CheckStatus::Pass,
        details: format!(
            "quotes from `{}` with a {}s timeout",
            config.decoration.feed_url, config.decoration.timeout_secs
        ),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
