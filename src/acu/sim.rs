use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

use super::{
    AxisStatus, ControlMode, Mount, MountError, Status, TelemetrySource,
    PROGRAM_TRACK_STACK_CAPACITY,
};
use crate::abort::AbortSignal;
use crate::envelope::{AxisLimits, KinematicEnvelope};
use crate::pattern::{offset_seconds, seconds_between, ScanPattern, ScanPoint};

const STACK_FULL_RETRY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub initial_azimuth: f64,
    pub initial_elevation: f64,
    pub fail_moves: bool,
    pub fail_uploads: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            initial_azimuth: 0.0,
            initial_elevation: 90.0,
            fail_moves: false,
            fail_uploads: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct AxisState {
    commanded: f64,
    position: f64,
    velocity: f64,
}

impl AxisState {
    fn at_rest(position: f64) -> Self {
        Self {
            commanded: position,
            position,
            velocity: 0.0,
        }
    }

    /// Move towards `target` at the axis speed limit for `dt` seconds.
    fn slew(&mut self, target: f64, limits: &AxisLimits, dt: f64) {
        self.commanded = target;
        let remaining = target - self.position;
        let step = limits.max_speed * dt;
        if remaining.abs() <= step {
            self.position = target;
            self.velocity = 0.0;
        } else {
            self.position += step.copysign(remaining);
            self.velocity = limits.max_speed.copysign(remaining);
        }
    }

    fn follow(&mut self, position: f64, velocity: f64) {
        self.commanded = position;
        self.position = position;
        self.velocity = velocity;
    }

    fn hold(&mut self) {
        self.commanded = self.position;
        self.velocity = 0.0;
    }

    fn status(&self, mode: ControlMode) -> AxisStatus {
        AxisStatus {
            mode,
            commanded_position: self.commanded,
            current_position: self.position,
            current_velocity: self.velocity,
        }
    }
}

#[derive(Debug)]
struct SimState {
    updated: DateTime<Utc>,
    mode: ControlMode,
    azimuth: AxisState,
    elevation: AxisState,
    stack: VecDeque<ScanPoint>,
}

impl SimState {
    fn advance(&mut self, now: DateTime<Utc>, envelope: &KinematicEnvelope) {
        let dt = seconds_between(self.updated, now);
        if dt <= 0.0 {
            return;
        }
        self.updated = now;

        match self.mode {
            ControlMode::Stop => {
                self.azimuth.hold();
                self.elevation.hold();
            }
            ControlMode::Preset => {
                let (az, el) = (self.azimuth.commanded, self.elevation.commanded);
                self.azimuth.slew(az, &envelope.azimuth, dt);
                self.elevation.slew(el, &envelope.elevation, dt);
            }
            ControlMode::ProgramTrack => self.follow_stack(now, envelope, dt),
        }
    }

    /// The stack keeps the active point plus everything after it; the
    /// final point stays queued once reached.
    fn follow_stack(&mut self, now: DateTime<Utc>, envelope: &KinematicEnvelope, dt: f64) {
        while self.stack.len() >= 2 && self.stack[1].time <= now {
            self.stack.pop_front();
        }

        let (Some(first), next) = (self.stack.front().copied(), self.stack.get(1).copied()) else {
            self.azimuth.hold();
            self.elevation.hold();
            return;
        };

        if now < first.time {
            self.azimuth.slew(first.azimuth, &envelope.azimuth, dt);
            self.elevation.slew(first.elevation, &envelope.elevation, dt);
            return;
        }

        match next {
            Some(next) => {
                let span = seconds_between(first.time, next.time);
                let f = if span > 0.0 {
                    seconds_between(first.time, now) / span
                } else {
                    1.0
                };
                self.azimuth.follow(
                    lerp(first.azimuth, next.azimuth, f),
                    lerp(first.azimuth_velocity, next.azimuth_velocity, f),
                );
                self.elevation.follow(
                    lerp(first.elevation, next.elevation, f),
                    lerp(first.elevation_velocity, next.elevation_velocity, f),
                );
            }
            None => {
                self.azimuth.follow(first.azimuth, 0.0);
                self.elevation.follow(first.elevation, 0.0);
            }
        }
    }

    fn free_stack_slots(&self) -> u32 {
        PROGRAM_TRACK_STACK_CAPACITY.saturating_sub(self.stack.len() as u32)
    }
}

fn lerp(a: f64, b: f64, f: f64) -> f64 {
    a + (b - a) * f
}

/// In-process stand-in for the ACU. Slews at the envelope speed limits,
/// follows the program-track stack by time, and runs on tokio time so
/// tests can drive it with a paused clock.
pub struct SimulatedMount {
    envelope: KinematicEnvelope,
    config: SimulatorConfig,
    origin: (DateTime<Utc>, Instant),
    state: StdMutex<SimState>,
}

impl SimulatedMount {
    pub fn new(envelope: KinematicEnvelope, config: SimulatorConfig) -> Arc<Self> {
        let origin = (Utc::now(), Instant::now());
        Arc::new(Self {
            envelope,
            config,
            origin,
            state: StdMutex::new(SimState {
                updated: origin.0,
                mode: ControlMode::Stop,
                azimuth: AxisState::at_rest(config.initial_azimuth),
                elevation: AxisState::at_rest(config.initial_elevation),
                stack: VecDeque::new(),
            }),
        })
    }

    /// Simulated wall clock.
    pub fn now(&self) -> DateTime<Utc> {
        offset_seconds(self.origin.0, self.origin.1.elapsed().as_secs_f64())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SimState) -> R) -> R {
        let now = self.now();
        let mut state = self.state.lock().unwrap();
        state.advance(now, &self.envelope);
        f(&mut state)
    }
}

#[async_trait]
impl Mount for SimulatedMount {
    async fn move_to(&self, azimuth: f64, elevation: f64) -> Result<(), MountError> {
        if self.config.fail_moves {
            return Err(MountError::Rejected {
                operation: "preset move",
                reason: "simulated fault".into(),
            });
        }
        if !self.envelope.azimuth.contains(azimuth) || !self.envelope.elevation.contains(elevation)
        {
            return Err(MountError::Rejected {
                operation: "preset move",
                reason: format!("setpoint ({}, {}) outside soft limits", azimuth, elevation),
            });
        }

        self.with_state(|state| {
            state.mode = ControlMode::Preset;
            state.azimuth.commanded = azimuth;
            state.elevation.commanded = elevation;
            state.stack.clear();
        });
        log::debug!("sim: preset move to ({}, {})", azimuth, elevation);
        Ok(())
    }

    async fn upload_pattern(
        &self,
        abort: AbortSignal,
        pattern: Arc<dyn ScanPattern>,
    ) -> Result<(), MountError> {
        if self.config.fail_uploads {
            return Err(MountError::Rejected {
                operation: "program track upload",
                reason: "simulated fault".into(),
            });
        }

        // A new upload replaces whatever table was loaded before.
        self.with_state(|state| state.stack.clear());

        let mut cursor = pattern.cursor();
        let mut sent = 0;
        while !pattern.is_done(&cursor) {
            let point = pattern.advance(&mut cursor)?;
            loop {
                if let Some(reason) = abort.reason() {
                    return Err(MountError::Aborted { sent, reason });
                }
                let pushed = self.with_state(|state| {
                    if state.free_stack_slots() > 0 {
                        state.stack.push_back(point);
                        true
                    } else {
                        false
                    }
                });
                if pushed {
                    break;
                }
                tokio::select! {
                    _ = sleep(STACK_FULL_RETRY) => {}
                    reason = abort.aborted() => return Err(MountError::Aborted { sent, reason }),
                }
            }
            sent += 1;
        }

        log::debug!("sim: uploaded {} points ({})", sent, pattern.describe());
        Ok(())
    }

    async fn set_mode(&self, mode: ControlMode) -> Result<(), MountError> {
        self.with_state(|state| {
            state.mode = mode;
            if mode != ControlMode::ProgramTrack {
                state.azimuth.hold();
                state.elevation.hold();
            }
            if mode == ControlMode::Stop {
                state.stack.clear();
            }
        });
        log::debug!("sim: mode {}", mode);
        Ok(())
    }
}

#[async_trait]
impl TelemetrySource for SimulatedMount {
    async fn status(&self) -> Result<Status, MountError> {
        Ok(self.with_state(|state| Status {
            timestamp: state.updated,
            azimuth: state.azimuth.status(state.mode),
            elevation: state.elevation.status(state.mode),
            free_stack_slots: state.free_stack_slots(),
        }))
    }
}
