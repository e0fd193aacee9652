//! PID feedback controller.
//!
//! ```text
//! output = Kp * e + Kd * de/dt + Ki * ∫e dt
//! ```
//!
//! Two behaviors here are deliberate and load-bearing:
//!
//! - **Rollback anti-windup**: an integral update whose magnitude
//!   would exceed [`INTEGRAL_LIMIT`] is discarded entirely, leaving
//!   the accumulator at its previous value for that tick. This is not
//!   the same as clamping to the bound and must stay that way; the
//!   deployed controllers were tuned against it.
//! - **dt floor**: a zero or backward clock step substitutes
//!   [`MIN_DT_SECS`] so the derivative term can never divide by zero
//!   or flip sign on a clock tie.

use crate::config::PidGains;
use tracing::warn;

/// Integral accumulator bound (error·seconds).
pub const INTEGRAL_LIMIT: f32 = 100.0;

/// Substitute time step when the clock reports a non-positive delta.
pub const MIN_DT_SECS: f32 = 1e-3;

/// One PID axis. Construct once per regulated quantity, call
/// [`Pid::compute`] once per control tick.
#[derive(Debug, Clone)]
pub struct Pid {
    kp: f32,
    kd: f32,
    ki: f32,
    integral: f32,
    last_error: f32,
    last_sample_time: u64,
}

impl Pid {
    pub fn new(gains: PidGains, now_millis: u64) -> Self {
        Self {
            kp: gains.kp,
            kd: gains.kd,
            ki: gains.ki,
            integral: 0.0,
            last_error: 0.0,
            last_sample_time: now_millis,
        }
    }

    /// Current integral accumulator, for monitoring.
    pub fn integral(&self) -> f32 {
        self.integral
    }

    /// Run one control step against the latest measurement.
    ///
    /// Mutates `last_error`, `last_sample_time` and, unless the update
    /// is rolled back, `integral`. Always returns a finite value.
    pub fn compute(&mut self, input: f32, target: f32, now_millis: u64) -> f32 {
        let error = target - input;

        let raw_dt = (now_millis as i64 - self.last_sample_time as i64) as f32 / 1000.0;
        self.last_sample_time = now_millis;
        let dt = if raw_dt <= 0.0 {
            warn!(raw_dt, "non-positive dt in PID step, substituting minimum");
            MIN_DT_SECS
        } else {
            raw_dt
        };

        let derivative = (error - self.last_error) / dt;
        self.last_error = error;

        // Rollback anti-windup: drop the whole update when it would
        // leave the bound, keep the prior accumulator.
        let candidate = self.integral + error * dt;
        if candidate.abs() <= INTEGRAL_LIMIT {
            self.integral = candidate;
        }

        self.kp * error + self.kd * derivative + self.ki * self.integral
    }

    /// Clear accumulated state, keeping the gains.
    pub fn reset(&mut self, now_millis: u64) {
        self.integral = 0.0;
        self.last_error = 0.0;
        self.last_sample_time = now_millis;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gains(kp: f32, kd: f32, ki: f32) -> PidGains {
        PidGains { kp, kd, ki }
    }

    #[test]
    fn test_proportional_step() {
        let mut pid = Pid::new(gains(1.0, 0.0, 0.0), 0);
        // input 0, target 10, dt = 1.0 s
        let output = pid.compute(0.0, 10.0, 1000);
        assert!((output - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_integral_accumulates_error_dt() {
        let mut pid = Pid::new(gains(0.0, 0.0, 1.0), 0);
        pid.compute(0.0, 5.0, 1000); // +5.0
        let output = pid.compute(0.0, 5.0, 2000); // +5.0 -> 10.0
        assert!((pid.integral() - 10.0).abs() < 1e-6);
        assert!((output - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_integral_rollback_keeps_prior_value() {
        let mut pid = Pid::new(gains(0.0, 0.0, 1.0), 0);
        pid.compute(0.0, 60.0, 1000); // integral = 60
        assert!((pid.integral() - 60.0).abs() < 1e-6);

        // candidate would be 120 > 100: the update is discarded, not
        // clamped to 100.
        pid.compute(0.0, 60.0, 2000);
        assert!((pid.integral() - 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_integral_rollback_negative_bound() {
        let mut pid = Pid::new(gains(0.0, 0.0, 1.0), 0);
        pid.compute(60.0, 0.0, 1000); // integral = -60
        pid.compute(60.0, 0.0, 2000); // candidate -120, rolled back
        assert!((pid.integral() + 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_derivative_from_error_delta() {
        let mut pid = Pid::new(gains(0.0, 1.0, 0.0), 0);
        // first step: error 4, last_error 0, dt 0.5 -> 8.0
        let output = pid.compute(0.0, 4.0, 500);
        assert!((output - 8.0).abs() < 1e-6);
        // unchanged error -> zero derivative
        let output = pid.compute(0.0, 4.0, 1000);
        assert!(output.abs() < 1e-6);
    }

    #[test]
    fn test_zero_dt_is_guarded() {
        let mut pid = Pid::new(gains(0.0, 1.0, 0.0), 1000);
        // same timestamp twice: dt floor applies, output stays finite
        let output = pid.compute(0.0, 4.0, 1000);
        assert!(output.is_finite());
        assert!((output - 4.0 / MIN_DT_SECS).abs() < 1e-3);
    }

    #[test]
    fn test_backward_clock_is_guarded() {
        let mut pid = Pid::new(gains(1.0, 1.0, 1.0), 5000);
        let output = pid.compute(0.0, 1.0, 4000);
        assert!(output.is_finite());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut pid = Pid::new(gains(1.0, 1.0, 1.0), 0);
        pid.compute(0.0, 10.0, 1000);
        assert!(pid.integral() != 0.0);
        pid.reset(2000);
        assert_eq!(pid.integral(), 0.0);
    }
}
