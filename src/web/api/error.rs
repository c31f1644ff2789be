use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::controller::ControllerError;

#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Conflict(&'static str),
    Mount(String),
}

impl From<ControllerError> for ApiError {
    fn from(e: ControllerError) -> Self {
        match e {
            ControllerError::AlreadyRunning => ApiError::Conflict("command_running"),
            ControllerError::Command(e) if e.is_rejection() => ApiError::Validation(e.to_string()),
            ControllerError::Command(e) => ApiError::Mount(e.to_string()),
            ControllerError::Telemetry(e) | ControllerError::Mount(e) => {
                ApiError::Mount(e.to_string())
            }
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Mount(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(msg) => ErrorResponse::with_message("validation_failed", &msg),
            ApiError::Conflict(reason) => ErrorResponse::new(reason),
            ApiError::Mount(msg) => ErrorResponse::with_message("mount_error", &msg),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: None,
        }
    }

    pub fn with_message(error: &str, message: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: Some(message.to_string()),
        }
    }
}
