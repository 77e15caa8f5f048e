use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use barometer_core::domain::reply::ReplyMessage;
use barometer_core::pipeline::RequestPipeline;
use barometer_slack::{
    CommandContext, ErrorBody, PongBody, SlashCommandPayload, REQUEST_TIMESTAMP_HEADER,
};
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::health::{self, HealthState};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RequestPipeline>,
    pub context: CommandContext,
    pub health: HealthState,
}

type ErrorResponse = (StatusCode, Json<ErrorBody>);

pub fn router(state: AppState) -> Router {
    let health = health::router(state.health.clone());

    Router::new()
        .route("/", get(pong))
        .route("/log", post(log_command))
        .with_state(state)
        .merge(health)
        .layer(TraceLayer::new_for_http())
}

async fn pong() -> Json<PongBody> {
    Json(PongBody::default())
}

async fn log_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Form<SlashCommandPayload>, FormRejection>,
) -> Result<Json<ReplyMessage>, ErrorResponse> {
    let correlation_id = Uuid::new_v4().to_string();

    let Form(payload) = payload.map_err(|rejection| {
        let message = rejection.body_text();
        warn!(
            event_name = "slack.command.form_rejected",
            correlation_id = %correlation_id,
            error = %message,
            "slash command form could not be decoded"
        );
        (StatusCode::BAD_REQUEST, Json(ErrorBody::new(StatusCode::BAD_REQUEST.as_u16(), message)))
    })?;

    let span = info_span!(
        "slash_command",
        correlation_id = %correlation_id,
        user_id = %payload.user_id,
        command = %payload.command
    );
    let request_timestamp =
        headers.get(REQUEST_TIMESTAMP_HEADER).and_then(|value| value.to_str().ok());
    let input = payload.into_request_input(request_timestamp, &state.context);

    match state.pipeline.process(input).instrument(span).await {
        Ok(reply) => {
            info!(
                event_name = "slack.command.acknowledged",
                correlation_id = %correlation_id,
                "slash command acknowledged"
            );
            Ok(Json(reply))
        }
        Err(failure) => {
            let stage = failure.stage();
            let interface = failure.into_interface(correlation_id);
            let status = StatusCode::from_u16(interface.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

            if status.is_server_error() {
                error!(
                    event_name = "slack.command.failed",
                    correlation_id = %interface.correlation_id(),
                    stage = %stage,
                    error = %interface.message(),
                    "slash command failed"
                );
            } else {
                warn!(
                    event_name = "slack.command.rejected",
                    correlation_id = %interface.correlation_id(),
                    stage = %stage,
                    status = status.as_u16(),
                    error = %interface.message(),
                    "slash command rejected"
                );
            }

            Err((status, Json(ErrorBody::from(&interface))))
        }
    }
}
