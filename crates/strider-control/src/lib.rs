//! # Strider Control
//!
//! Real-time control core for the Strider mobility platform: turns
//! raw operator input (two-axis joystick, four momentary buttons)
//! into bus commands for the drive motor controllers and the seat
//! actuator driver.
//!
//! ## Architecture
//!
//! ```text
//! InputSource ──┐
//!               ▼
//!        Orchestrator::tick()        (single-threaded, fixed period)
//!    sample → classify → calibrate / map → regulate → emit
//!               │                                       │
//!        SharedSnapshot (UI)                   FrameTransport (bus)
//! ```
//!
//! The core is hardware-free: clock, input and bus access are injected
//! capabilities ([`Clock`], [`InputSource`], [`FrameTransport`]), so
//! the whole control path runs under test against a virtual clock.
//!
//! ## Modules
//!
//! - `pid`: feedback controller with rollback anti-windup
//! - `button`: press/release edge classification
//! - `calibration`: joystick auto-calibration state machine
//! - `orchestrator`: per-tick composition and frame emission
//! - `state`: joint angles, modes, published snapshots
//! - `config`: static configuration with factory defaults

pub mod button;
pub mod calibration;
pub mod clock;
pub mod config;
pub mod error;
pub mod io;
pub mod orchestrator;
pub mod pid;
pub mod state;

pub use button::{ButtonClassifier, PressKind};
pub use calibration::{
    Axis, AxisCalibration, CalibrationPhase, JoystickCalibration, JoystickCalibrator,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AngleLimits, ControlConfig, PidGains};
pub use error::{ControlError, TransportError};
pub use io::{Button, FrameTransport, InputSource};
pub use orchestrator::Orchestrator;
pub use pid::Pid;
pub use state::{ControlSnapshot, DriveMode, JointAngle, JointView, MenuSelection, SharedSnapshot};
