//! Motor controller command encoding and status decoding.
//!
//! The drive motors run the VESC firmware family and accept commands
//! over CAN as documented in the upstream `comm_can` protocol: the
//! command kind is packed into bits 8..16 of the extended identifier,
//! the controller id into bits 0..8, and the payload is a single
//! big-endian i32 holding the command value in fixed-point, scaled per
//! command kind.

use crate::{BusFrame, ProtocolError, bytes_to_i16_be, bytes_to_i32_be, i32_to_bytes_be};
use num_enum::TryFromPrimitive;

/// Motor command kinds, values fixed by the external controller
/// firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum MotorCommandKind {
    /// Duty cycle setpoint (fraction of full modulation).
    SetDuty = 0,
    /// Motor current setpoint (amps).
    SetCurrent = 1,
    /// Braking current setpoint (amps).
    SetCurrentBrake = 2,
    /// Electrical RPM setpoint.
    SetRpm = 3,
    /// Position setpoint (degrees).
    SetPos = 4,
    /// Current setpoint relative to the configured maximum.
    SetCurrentRel = 10,
    /// Braking current relative to the configured maximum.
    SetCurrentBrakeRel = 11,
    /// Handbrake current setpoint (amps).
    SetCurrentHandbrake = 12,
    /// Handbrake current relative to the configured maximum.
    SetCurrentHandbrakeRel = 13,
}

impl MotorCommandKind {
    /// Fixed-point scale factor for this command kind.
    pub fn scale(self) -> u32 {
        scale_for_raw(self as u8)
    }
}

/// Fixed-point scale factor for a raw command-kind code.
///
/// Codes outside the published table scale to 0, which encodes a
/// zero-valued payload regardless of the requested value. The
/// historical firmware shipped with this fallback and the external
/// controllers tolerate it as a no-op, so it is kept as documented
/// behavior rather than rejected here.
pub fn scale_for_raw(kind: u8) -> u32 {
    match kind {
        // duty cycle and all *-relative commands
        0 | 10 | 11 | 13 => 100_000,
        // absolute current commands
        1 | 2 | 12 => 1_000,
        // position
        4 => 1_000_000,
        // rpm
        3 => 1,
        _ => 0,
    }
}

/// A command addressed to one motor controller.
///
/// Immutable value type; `to_frame` is the only wire representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorCommand {
    pub device_id: u8,
    pub kind: MotorCommandKind,
    pub value: f32,
}

impl MotorCommand {
    pub fn new(device_id: u8, kind: MotorCommandKind, value: f32) -> Self {
        Self { device_id, kind, value }
    }

    /// Encode into a bus frame: extended identifier
    /// `device_id | kind << 8`, 4 payload bytes holding the scaled
    /// value as a big-endian i32.
    pub fn to_frame(&self) -> BusFrame {
        encode_motor_command_raw(self.device_id, self.kind as u8, self.value)
    }
}

/// Encode a motor command from a raw kind code.
///
/// This path exists for pass-through of kinds the crate does not model
/// (configuration tooling, newer firmware). Unlisted codes produce a
/// zero payload per [`scale_for_raw`].
pub fn encode_motor_command_raw(device_id: u8, kind: u8, value: f32) -> BusFrame {
    let scale = scale_for_raw(kind);
    let raw = (value * scale as f32).round() as i32;

    let id = device_id as u32 | ((kind as u32) << 8);
    BusFrame::new_extended(id, &i32_to_bytes_be(raw))
}

/// Periodic status broadcast by a motor controller.
///
/// Layout per the controller firmware: bytes 0..4 electrical RPM
/// (i32), bytes 4..6 motor current in deci-amps (i16), bytes 6..8 duty
/// cycle in thousandths (i16), all big-endian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorStatus {
    /// Source controller id (low byte of the identifier).
    pub device_id: u8,
    /// Electrical RPM.
    pub erpm: i32,
    /// Motor current in amps.
    pub current_amps: f32,
    /// Duty cycle as a fraction of full modulation.
    pub duty: f32,
}

impl TryFrom<&BusFrame> for MotorStatus {
    type Error = ProtocolError;

    fn try_from(frame: &BusFrame) -> Result<Self, Self::Error> {
        if frame.len != 8 {
            return Err(ProtocolError::InvalidLength { expected: 8, actual: frame.len as usize });
        }
        let d = &frame.data;
        Ok(Self {
            device_id: (frame.id & 0xFF) as u8,
            erpm: bytes_to_i32_be([d[0], d[1], d[2], d[3]]),
            current_amps: bytes_to_i16_be([d[4], d[5]]) as f32 / 10.0,
            duty: bytes_to_i16_be([d[6], d[7]]) as f32 / 1000.0,
        })
    }
}
