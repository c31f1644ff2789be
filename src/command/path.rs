use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::{check_points, start_pattern, CommandContext, CommandError, Started};
use crate::abort::AbortSignal;
use crate::acu::Mount;
use crate::pattern::{CoordinateSystem, PathPattern, MIN_SAMPLE_SPACING_S};

/// Points checked against the envelope before a path is accepted.
const PREFLIGHT_POINTS: usize = 100;

/// Float slack on the spacing rule. Unix times near 1.7e9 only resolve to
/// about 2.4e-7 s.
const SPACING_EPSILON_S: f64 = 1e-6;

/// An explicit trajectory, one `[time, coord1, coord2, vel1, vel2]` row per
/// point with `time` in unix seconds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct PathCommand {
    #[serde(alias = "coordsys", alias = "Coordsys")]
    pub coordinate_system: String,
    #[schema(value_type = Vec<Vec<f64>>)]
    pub points: Vec<[f64; 5]>,
}

impl PathCommand {
    fn coordsys(&self) -> Result<CoordinateSystem, CommandError> {
        CoordinateSystem::parse(&self.coordinate_system)
            .ok_or_else(|| CommandError::CoordinateSystem(self.coordinate_system.clone()))
    }

    pub(super) fn pattern(&self, ctx: &CommandContext) -> Result<PathPattern, CommandError> {
        Ok(PathPattern::new(
            ctx.site,
            self.coordsys()?,
            self.points.clone(),
        ))
    }

    /// Only the first hundred points are checked against the envelope, so
    /// long paths stay cheap to validate.
    pub fn check(&self, ctx: &CommandContext) -> Result<(), CommandError> {
        let pattern = self.pattern(ctx)?;
        if self.points.is_empty() {
            return Err(CommandError::EmptyPath);
        }
        for (i, pair) in self.points.windows(2).enumerate() {
            let gap = pair[1][0] - pair[0][0];
            if !(gap >= MIN_SAMPLE_SPACING_S - SPACING_EPSILON_S) {
                return Err(CommandError::Spacing { index: i + 1 });
            }
        }
        check_points(&pattern, &ctx.envelope, PREFLIGHT_POINTS)
    }

    pub async fn start(
        &self,
        ctx: &CommandContext,
        abort: &AbortSignal,
        mount: Arc<dyn Mount>,
    ) -> Result<Started, CommandError> {
        let pattern = self.pattern(ctx)?;
        start_pattern(abort, mount, Arc::new(pattern)).await
    }
}
