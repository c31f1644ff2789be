use utoipa::OpenApi;

use super::api::commands::ValidateResponse;
use super::api::error::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::commands::submit,
        super::api::commands::validate,
        super::api::commands::stop,
        super::api::commands::status,
        super::api::commands::telemetry,
        super::api::commands::envelope,
    ),
    components(
        schemas(
            ValidateResponse,
            ErrorResponse,
            crate::command::Command,
            crate::command::PointCommand,
            crate::command::AzimuthScanCommand,
            crate::command::TrackCommand,
            crate::command::PathCommand,
            crate::command::Completion,
            crate::controller::SessionStatus,
            crate::controller::SessionState,
            crate::acu::Status,
            crate::acu::AxisStatus,
            crate::acu::ControlMode,
            crate::envelope::KinematicEnvelope,
            crate::envelope::AxisLimits,
        )
    ),
    info(
        title = "ACU Commander API",
        description = "Submit pointing, scan, track and path commands to the antenna control unit",
        version = "0.1.0"
    ),
    tags(
        (name = "commands", description = "Command submission"),
        (name = "status", description = "Session and telemetry status")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/commands",
            "/api/commands/validate",
            "/api/commands/stop",
            "/api/status",
            "/api/telemetry",
            "/api/envelope",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path}");
        }
    }
}
