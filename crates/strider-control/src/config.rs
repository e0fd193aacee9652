//! Control core configuration.
//!
//! Loading and persistence belong to the host application; the core
//! only consumes a validated [`ControlConfig`] value. Every field has
//! a factory default so a partial config file deserializes cleanly.

use crate::error::ControlError;
use serde::Deserialize;

/// PID gains for one regulated axis.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PidGains {
    pub kp: f32,
    pub kd: f32,
    pub ki: f32,
}

impl Default for PidGains {
    fn default() -> Self {
        Self { kp: 1.0, kd: 0.0, ki: 0.0 }
    }
}

/// Allowed range for one adjustable joint, in degrees.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AngleLimits {
    pub min_deg: f32,
    pub max_deg: f32,
}

impl Default for AngleLimits {
    fn default() -> Self {
        Self { min_deg: 0.0, max_deg: 90.0 }
    }
}

/// Static configuration for the control core.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Hold duration at or above which a release classifies as a long
    /// press.
    pub long_press_ms: u64,

    /// Distance from a travel extreme (raw ADC units) at which the Y
    /// axis triggers actuator motion.
    pub trigger_margin: i32,

    /// CAN id of the actuator driver board.
    pub actuator_id: u8,

    /// CAN ids of the left/right drive motor controllers.
    pub left_motor_id: u8,
    pub right_motor_id: u8,

    /// RPM commanded at full joystick deflection.
    pub max_rpm: f32,

    /// Estimated joint travel per control tick while an actuator is
    /// driven, in degrees. Used to advance the tracked angle between
    /// feedback updates.
    pub angle_step_deg: f32,

    /// Speed-loop gains.
    pub drive_pid: PidGains,

    pub backrest_limits: AngleLimits,
    pub footrest_limits: AngleLimits,
    pub seat_limits: AngleLimits,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            long_press_ms: 600,
            trigger_margin: 400,
            actuator_id: 99,
            left_motor_id: 1,
            right_motor_id: 2,
            max_rpm: 3000.0,
            angle_step_deg: 0.5,
            drive_pid: PidGains::default(),
            backrest_limits: AngleLimits::default(),
            footrest_limits: AngleLimits::default(),
            seat_limits: AngleLimits::default(),
        }
    }
}

impl ControlConfig {
    /// Reject configurations the tick loop cannot operate on.
    pub fn validate(&self) -> Result<(), ControlError> {
        if self.long_press_ms == 0 {
            return Err(ControlError::InvalidConfig("long_press_ms must be > 0".into()));
        }
        if self.trigger_margin < 0 {
            return Err(ControlError::InvalidConfig("trigger_margin must be >= 0".into()));
        }
        if self.max_rpm <= 0.0 || !self.max_rpm.is_finite() {
            return Err(ControlError::InvalidConfig("max_rpm must be positive".into()));
        }
        for (name, limits) in [
            ("backrest_limits", self.backrest_limits),
            ("footrest_limits", self.footrest_limits),
            ("seat_limits", self.seat_limits),
        ] {
            if limits.min_deg > limits.max_deg {
                return Err(ControlError::InvalidConfig(format!("{name}: min_deg > max_deg")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ControlConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.long_press_ms, 600);
        assert_eq!(config.trigger_margin, 400);
        assert_eq!(config.actuator_id, 99);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ControlConfig = toml::from_str(
            r#"
            long_press_ms = 450
            [drive_pid]
            kp = 2.5
            "#,
        )
        .unwrap();

        assert_eq!(config.long_press_ms, 450);
        assert_eq!(config.drive_pid.kp, 2.5);
        // untouched fields keep factory defaults
        assert_eq!(config.trigger_margin, 400);
        assert_eq!(config.max_rpm, 3000.0);
    }

    #[test]
    fn test_validate_rejects_inverted_limits() {
        let config = ControlConfig {
            backrest_limits: AngleLimits { min_deg: 45.0, max_deg: 10.0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let config = ControlConfig { long_press_ms: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }
}
