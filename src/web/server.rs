use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::acu::SimulatedMount;
use crate::config::Config;
use crate::controller::Controller;

use super::api::commands as command_handlers;
use super::api_doc::ApiDoc;
use super::AppState;

pub async fn run_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let bind_addr = config.web.bind.clone();
    let ctx = config.context()?;
    let settings = config.controller_settings()?;
    let mount = SimulatedMount::new(ctx.envelope, config.simulator);
    log::info!(
        "Simulated ACU at ({}, {}), sample interval {}s",
        ctx.site.latitude_deg,
        ctx.site.longitude_deg,
        ctx.sample_interval
    );

    let state = AppState {
        controller: Arc::new(Mutex::new(Controller::new(
            ctx,
            settings,
            mount.clone(),
            mount,
        ))),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/commands", post(command_handlers::submit))
        .route("/api/commands/validate", post(command_handlers::validate))
        .route("/api/commands/stop", post(command_handlers::stop))
        .route("/api/status", get(command_handlers::status))
        .route("/api/telemetry", get(command_handlers::telemetry))
        .route("/api/envelope", get(command_handlers::envelope))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
