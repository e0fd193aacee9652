//! Exposed control state: joint angles, operating mode and the
//! read-only snapshot handed to the UI collaborator.

use crate::calibration::JoystickCalibration;
use crate::config::AngleLimits;
use arc_swap::ArcSwap;
use std::sync::Arc;
use strider_protocol::Joint;

/// Tracked angle of one adjustable joint, degrees.
///
/// `current` is clamped into `[min_bound, max_bound]` after every
/// update; out-of-range inputs are corrected, never rejected.
#[derive(Debug, Clone, Copy)]
pub struct JointAngle {
    current: f32,
    min_bound: f32,
    max_bound: f32,
}

impl JointAngle {
    pub fn new(limits: AngleLimits) -> Self {
        Self { current: limits.min_deg, min_bound: limits.min_deg, max_bound: limits.max_deg }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    /// Replace the tracked angle, clamped into bounds.
    pub fn set(&mut self, degrees: f32) {
        self.current = degrees.clamp(self.min_bound, self.max_bound);
    }

    /// Advance the tracked angle by a delta, clamped into bounds.
    pub fn advance(&mut self, delta: f32) {
        self.set(self.current + delta);
    }

    /// Position within the allowed range as 0-100.
    pub fn percent(&self) -> f32 {
        let span = self.max_bound - self.min_bound;
        if span <= 0.0 {
            return 0.0;
        }
        (self.current - self.min_bound) / span * 100.0
    }
}

/// Top-level operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(serde::Serialize)]
pub enum DriveMode {
    /// Normal driving on wheels.
    #[default]
    Drive,
    /// Stair / kerb climbing.
    Climb,
}

impl DriveMode {
    pub fn toggled(self) -> Self {
        match self {
            DriveMode::Drive => DriveMode::Climb,
            DriveMode::Climb => DriveMode::Drive,
        }
    }
}

/// Entries of the configuration menu that feed the control core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(serde::Serialize)]
pub enum MenuSelection {
    #[default]
    Calibration,
    Footrest,
    Backrest,
    Seat,
}

impl MenuSelection {
    const ORDER: [MenuSelection; 4] =
        [Self::Calibration, Self::Footrest, Self::Backrest, Self::Seat];

    pub fn next(self) -> Self {
        let i = Self::ORDER.iter().position(|s| *s == self).unwrap_or(0);
        Self::ORDER[(i + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        let i = Self::ORDER.iter().position(|s| *s == self).unwrap_or(0);
        Self::ORDER[(i + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    /// The joint this menu entry adjusts, if any.
    pub fn joint(self) -> Option<Joint> {
        match self {
            Self::Calibration => None,
            Self::Footrest => Some(Joint::Footrest),
            Self::Backrest => Some(Joint::Backrest),
            Self::Seat => Some(Joint::Seat),
        }
    }
}

/// One joint as seen by the UI.
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Serialize)]
pub struct JointView {
    pub degrees: f32,
    pub percent: f32,
}

impl From<&JointAngle> for JointView {
    fn from(angle: &JointAngle) -> Self {
        Self { degrees: angle.current(), percent: angle.percent() }
    }
}

/// Immutable view of the control state, published once per tick.
///
/// The UI collaborator only ever sees this type; it never holds a
/// live reference into the orchestrator.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Serialize)]
pub struct ControlSnapshot {
    pub mode: DriveMode,
    pub config_menu_open: bool,
    pub selection: MenuSelection,
    pub calibrating: bool,
    pub calibration: JoystickCalibration,
    pub backrest: JointView,
    pub footrest: JointView,
    pub seat: JointView,
    /// Latest measured drive speed, electrical RPM.
    pub speed_rpm: f32,
    /// Monotonic tick counter, lets the UI detect missed updates.
    pub tick: u64,
}

impl Default for ControlSnapshot {
    fn default() -> Self {
        let zero = JointView { degrees: 0.0, percent: 0.0 };
        Self {
            mode: DriveMode::Drive,
            config_menu_open: false,
            selection: MenuSelection::Calibration,
            calibrating: false,
            calibration: JoystickCalibration::default(),
            backrest: zero,
            footrest: zero,
            seat: zero,
            speed_rpm: 0.0,
            tick: 0,
        }
    }
}

/// Wait-free snapshot cell shared with the UI thread.
///
/// The orchestrator stores a fresh `Arc<ControlSnapshot>` once per
/// tick; readers load without locking.
#[derive(Debug, Clone)]
pub struct SharedSnapshot {
    inner: Arc<ArcSwap<ControlSnapshot>>,
}

impl SharedSnapshot {
    pub fn new() -> Self {
        Self { inner: Arc::new(ArcSwap::from_pointee(ControlSnapshot::default())) }
    }

    pub fn publish(&self, snapshot: ControlSnapshot) {
        self.inner.store(Arc::new(snapshot));
    }

    pub fn load(&self) -> Arc<ControlSnapshot> {
        self.inner.load_full()
    }
}

impl Default for SharedSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn limits(min: f32, max: f32) -> AngleLimits {
        AngleLimits { min_deg: min, max_deg: max }
    }

    #[test]
    fn test_joint_angle_clamps_both_ends() {
        let mut angle = JointAngle::new(limits(0.0, 90.0));
        angle.set(120.0);
        assert_eq!(angle.current(), 90.0);
        angle.set(-15.0);
        assert_eq!(angle.current(), 0.0);
    }

    #[test]
    fn test_joint_angle_percent() {
        let mut angle = JointAngle::new(limits(0.0, 90.0));
        angle.set(45.0);
        assert!((angle.percent() - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_advance_accumulates_and_clamps() {
        let mut angle = JointAngle::new(limits(0.0, 10.0));
        for _ in 0..100 {
            angle.advance(0.5);
        }
        assert_eq!(angle.current(), 10.0);
    }

    #[test]
    fn test_menu_cycle_is_closed() {
        let mut s = MenuSelection::Calibration;
        for _ in 0..MenuSelection::ORDER.len() {
            s = s.next();
        }
        assert_eq!(s, MenuSelection::Calibration);
        assert_eq!(MenuSelection::Calibration.prev(), MenuSelection::Seat);
    }

    #[test]
    fn test_mode_toggle() {
        assert_eq!(DriveMode::Drive.toggled(), DriveMode::Climb);
        assert_eq!(DriveMode::Climb.toggled(), DriveMode::Drive);
    }

    #[test]
    fn test_shared_snapshot_publish_load() {
        let shared = SharedSnapshot::new();
        let reader = shared.clone();

        let mut snapshot = ControlSnapshot::default();
        snapshot.tick = 7;
        shared.publish(snapshot.clone());

        assert_eq!(reader.load().tick, 7);
        assert_eq!(*reader.load(), snapshot);
    }

    proptest! {
        /// The clamp invariant holds for any update, including NaN-free
        /// out-of-range inputs.
        #[test]
        fn prop_joint_angle_always_in_bounds(
            min in -180.0f32..0.0,
            span in 0.0f32..360.0,
            updates in proptest::collection::vec(-1.0e4f32..1.0e4, 1..32),
        ) {
            let max = min + span;
            let mut angle = JointAngle::new(limits(min, max));
            for u in updates {
                angle.set(u);
                prop_assert!(angle.current() >= min);
                prop_assert!(angle.current() <= max);
            }
        }
    }
}
