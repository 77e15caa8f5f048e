use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone, Debug)]
pub struct HealthState {
    pub backend: &'static str,
    pub debug_only: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub storage: HealthCheck,
    pub debug_only: bool,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// Readiness report. Storage is not probed: BigQuery and Postgres
/// connections are only opened per insert.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let storage = if state.debug_only {
        HealthCheck {
            status: "skipped",
            detail: format!("{} configured, writes disabled by debug_only", state.backend),
        }
    } else {
        HealthCheck { status: "configured", detail: format!("{} backend selected", state.backend) }
    };

    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "barometer-server runtime initialized".to_string(),
        },
        storage,
        debug_only: state.debug_only,
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_reports_selected_backend() {
        let (status, Json(payload)) =
            health(State(HealthState { backend: "bigquery", debug_only: false })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.storage.status, "configured");
        assert!(payload.storage.detail.contains("bigquery"));
        assert!(!payload.debug_only);
    }

    #[tokio::test]
    async fn health_marks_storage_skipped_in_debug_mode() {
        let (_, Json(payload)) =
            health(State(HealthState { backend: "postgres", debug_only: true })).await;

        assert_eq!(payload.storage.status, "skipped");
        assert!(payload.debug_only);
    }
}
