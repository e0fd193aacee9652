//! Joystick auto-calibration.
//!
//! An 8 second guided run that learns, per axis, where the stick
//! rests and how far it travels:
//!
//! - **Resting** (first 4 s): the operator leaves the stick alone;
//!   every tick widens the rest band toward the observed extremes and
//!   recomputes its midpoint.
//! - **Circling** (next 4 s): the operator sweeps the stick through
//!   its full range; every tick widens the travel extremes.
//! - On completion fixed margins are applied (rest band grows by 50
//!   raw units each way, travel shrinks by 75 each way) and the result
//!   replaces the active calibration atomically. Until then the last
//!   good calibration stands.
//!
//! A run is not restartable mid-flight: start events while a run is
//! active are ignored.

use tracing::{debug, info, warn};

/// Total run length.
pub const CALIBRATION_RUN_MS: u64 = 8000;
/// Length of the resting phase at the start of the run.
pub const REST_PHASE_MS: u64 = 4000;
/// Headroom added outside the learned rest band.
pub const REST_MARGIN: i32 = 50;
/// Headroom subtracted inside the learned travel extremes.
pub const TRAVEL_MARGIN: i32 = 75;

/// Joystick axes, raw ADC units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Learned mapping for one axis.
///
/// Once committed, `rest_lower <= rest_mid <= rest_upper` and
/// `travel_min <= travel_max` hold for any run that sampled at least
/// one tick per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize)]
pub struct AxisCalibration {
    pub rest_upper: i32,
    pub rest_lower: i32,
    pub rest_mid: i32,
    pub travel_max: i32,
    pub travel_min: i32,
}

impl AxisCalibration {
    /// Factory values for the X axis, measured on the reference
    /// hardware.
    pub fn factory_x() -> Self {
        Self { rest_upper: 1840, rest_lower: 1760, rest_mid: 1800, travel_max: 3510, travel_min: 190 }
    }

    /// Factory values for the Y axis.
    pub fn factory_y() -> Self {
        Self { rest_upper: 1860, rest_lower: 1780, rest_mid: 1820, travel_max: 3500, travel_min: 180 }
    }
}

/// Calibration for both joystick axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize)]
pub struct JoystickCalibration {
    pub x: AxisCalibration,
    pub y: AxisCalibration,
}

impl Default for JoystickCalibration {
    fn default() -> Self {
        Self { x: AxisCalibration::factory_x(), y: AxisCalibration::factory_y() }
    }
}

/// Phase of an auto-calibration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    Idle,
    Resting,
    Circling,
}

/// Working extrema for one axis during a run.
#[derive(Debug, Clone, Copy)]
struct AxisRun {
    rest_upper: i32,
    rest_lower: i32,
    rest_mid: i32,
    travel_max: i32,
    travel_min: i32,
}

impl AxisRun {
    /// Sentinel extrema; any real sample replaces them.
    fn reset() -> Self {
        Self {
            rest_upper: i32::MIN,
            rest_lower: i32::MAX,
            rest_mid: 0,
            travel_max: i32::MIN,
            travel_min: i32::MAX,
        }
    }

    fn observe_rest(&mut self, sample: i32) {
        self.rest_upper = self.rest_upper.max(sample);
        self.rest_lower = self.rest_lower.min(sample);
        self.rest_mid = (self.rest_upper + self.rest_lower) / 2;
    }

    fn observe_travel(&mut self, sample: i32) {
        self.travel_max = self.travel_max.max(sample);
        self.travel_min = self.travel_min.min(sample);
    }

    /// Apply the fixed margins and freeze. Saturating arithmetic keeps
    /// a movement-free run (extrema still at their sentinels) finite;
    /// such a result is degenerate but well-formed, see the module
    /// docs of [`crate::orchestrator`].
    fn commit(self) -> AxisCalibration {
        AxisCalibration {
            rest_upper: self.rest_upper.saturating_add(REST_MARGIN),
            rest_lower: self.rest_lower.saturating_sub(REST_MARGIN),
            rest_mid: self.rest_mid,
            travel_max: self.travel_max.saturating_sub(TRAVEL_MARGIN),
            travel_min: self.travel_min.saturating_add(TRAVEL_MARGIN),
        }
    }
}

/// Multi-phase auto-calibration state machine.
#[derive(Debug)]
pub struct JoystickCalibrator {
    phase: CalibrationPhase,
    run_started_at: u64,
    x: AxisRun,
    y: AxisRun,
}

impl JoystickCalibrator {
    pub fn new() -> Self {
        Self {
            phase: CalibrationPhase::Idle,
            run_started_at: 0,
            x: AxisRun::reset(),
            y: AxisRun::reset(),
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase != CalibrationPhase::Idle
    }

    /// Begin a run. Returns `false` (and leaves the run untouched)
    /// when one is already in flight.
    pub fn start(&mut self, now_millis: u64) -> bool {
        if self.is_running() {
            warn!(phase = ?self.phase, "calibration start ignored, run already active");
            return false;
        }
        self.x = AxisRun::reset();
        self.y = AxisRun::reset();
        self.run_started_at = now_millis;
        self.phase = CalibrationPhase::Resting;
        info!(started_at = now_millis, "calibration run started");
        true
    }

    /// Abort an in-flight run without committing anything. The last
    /// good calibration stays in effect. Inert when idle.
    pub fn cancel(&mut self) {
        if self.is_running() {
            info!(phase = ?self.phase, "calibration run cancelled");
            self.phase = CalibrationPhase::Idle;
        }
    }

    /// Feed this tick's axis samples. Returns the committed
    /// calibration on the tick that completes the run, `None`
    /// otherwise.
    pub fn tick(&mut self, x: i32, y: i32, now_millis: u64) -> Option<JoystickCalibration> {
        if self.phase == CalibrationPhase::Idle {
            return None;
        }

        let elapsed = now_millis.saturating_sub(self.run_started_at);

        if elapsed >= CALIBRATION_RUN_MS {
            let result = JoystickCalibration { x: self.x.commit(), y: self.y.commit() };
            self.phase = CalibrationPhase::Idle;
            info!(?result, "calibration run complete");
            return Some(result);
        }

        if elapsed >= REST_PHASE_MS {
            if self.phase == CalibrationPhase::Resting {
                self.phase = CalibrationPhase::Circling;
                info!("calibration entering circling phase");
            }
            self.x.observe_travel(x);
            self.y.observe_travel(y);
        } else {
            self.x.observe_rest(x);
            self.y.observe_rest(y);
            debug!(x, y, "rest sample");
        }

        None
    }
}

impl Default for JoystickCalibrator {
    fn default() -> Self {
        Self::new()
    }
}
