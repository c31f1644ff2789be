use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::{CommandContext, CommandError, Completion, Started};
use crate::acu::Mount;

/// Slew to a fixed az/el setpoint and settle there.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct PointCommand {
    pub azimuth: f64,
    pub elevation: f64,
}

impl PointCommand {
    pub fn check(&self, ctx: &CommandContext) -> Result<(), CommandError> {
        ctx.envelope
            .check_az_el(self.azimuth, self.elevation, 0.0, 0.0)?;
        Ok(())
    }

    pub async fn start(&self, mount: Arc<dyn Mount>) -> Result<Started, CommandError> {
        log::info!(
            "Pointing to az={:.4}, el={:.4}",
            self.azimuth,
            self.elevation
        );
        mount.move_to(self.azimuth, self.elevation).await?;
        Ok(Started {
            completion: Completion::preset(),
            upload: None,
        })
    }
}
