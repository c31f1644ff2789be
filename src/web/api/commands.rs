use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::acu::Status;
use crate::command::Command;
use crate::controller::SessionStatus;
use crate::envelope::KinematicEnvelope;
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateResponse {
    pub valid: bool,
    pub command: String,
}

#[utoipa::path(
    post,
    path = "/api/commands",
    request_body = Command,
    responses(
        (status = 200, description = "Command started", body = SessionStatus),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "A command is already running", body = ErrorResponse),
        (status = 502, description = "Mount error", body = ErrorResponse)
    ),
    tag = "commands"
)]
pub async fn submit(
    State(state): State<AppState>,
    Json(command): Json<Command>,
) -> ApiResult<Json<SessionStatus>> {
    let mut controller = state.controller.lock().await;
    let status = controller.submit(command).await?;
    Ok(Json(status))
}

#[utoipa::path(
    post,
    path = "/api/commands/validate",
    request_body = Command,
    responses(
        (status = 200, description = "Command is valid", body = ValidateResponse),
        (status = 400, description = "Validation error", body = ErrorResponse)
    ),
    tag = "commands"
)]
pub async fn validate(
    State(state): State<AppState>,
    Json(command): Json<Command>,
) -> ApiResult<Json<ValidateResponse>> {
    let controller = state.controller.lock().await;
    controller.validate(&command)?;
    Ok(Json(ValidateResponse {
        valid: true,
        command: command.kind().to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/commands/stop",
    responses(
        (status = 200, description = "Session stopped", body = SessionStatus),
        (status = 502, description = "Mount error", body = ErrorResponse)
    ),
    tag = "commands"
)]
pub async fn stop(State(state): State<AppState>) -> ApiResult<Json<SessionStatus>> {
    let mut controller = state.controller.lock().await;
    Ok(Json(controller.stop().await?))
}

#[utoipa::path(
    get,
    path = "/api/status",
    responses(
        (status = 200, description = "Current session", body = SessionStatus)
    ),
    tag = "status"
)]
pub async fn status(State(state): State<AppState>) -> ApiResult<Json<SessionStatus>> {
    let controller = state.controller.lock().await;
    Ok(Json(controller.status()))
}

#[utoipa::path(
    get,
    path = "/api/telemetry",
    responses(
        (status = 200, description = "Latest ACU snapshot", body = Status),
        (status = 502, description = "Telemetry unavailable", body = ErrorResponse)
    ),
    tag = "status"
)]
pub async fn telemetry(State(state): State<AppState>) -> ApiResult<Json<Status>> {
    let controller = state.controller.lock().await;
    Ok(Json(controller.telemetry().await?))
}

#[utoipa::path(
    get,
    path = "/api/envelope",
    responses(
        (status = 200, description = "Configured kinematic limits", body = KinematicEnvelope)
    ),
    tag = "status"
)]
pub async fn envelope(State(state): State<AppState>) -> ApiResult<Json<KinematicEnvelope>> {
    let controller = state.controller.lock().await;
    Ok(Json(*controller.envelope()))
}
