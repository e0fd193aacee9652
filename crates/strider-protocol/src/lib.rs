//! # Strider Protocol
//!
//! CAN bus wire format shared with the external motor controllers
//! (VESC firmware family) and the linear actuator driver board.
//!
//! ## Modules
//!
//! - `motor`: motor command encoding and status frame decoding
//! - `actuator`: actuator command encoding (4-bit action mask)
//!
//! ## Byte order
//!
//! All multi-byte payload fields are Motorola (MSB-first, big-endian),
//! matching the VESC CAN documentation. Conversion helpers live at the
//! crate root.

pub mod actuator;
pub mod motor;

pub use actuator::*;
pub use motor::*;

use thiserror::Error;

/// A single CAN 2.0 frame exchanged with the motor and actuator
/// controllers.
///
/// `BusFrame` is the seam between the protocol layer and whatever
/// transport drives the physical bus. Frames are immutable once
/// constructed; the producer hands ownership to the transport and
/// never sees the frame again.
///
/// - **Copy**: zero-cost to move through channels at tick rate
/// - **fixed 8-byte buffer**: no heap allocation on the control path
/// - **29-bit identifiers**: every command the platform emits uses the
///   extended frame format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BusFrame {
    /// CAN identifier (11-bit standard or 29-bit extended).
    pub id: u32,

    /// Frame payload (fixed 8 bytes, unused tail is zero).
    pub data: [u8; 8],

    /// Valid payload length (0-8).
    pub len: u8,

    /// Extended (29-bit) identifier flag.
    pub is_extended: bool,
}

impl BusFrame {
    /// Build a standard (11-bit id) frame.
    pub fn new_standard(id: u16, data: &[u8]) -> Self {
        Self::new(id as u32, data, false)
    }

    /// Build an extended (29-bit id) frame.
    pub fn new_extended(id: u32, data: &[u8]) -> Self {
        Self::new(id, data, true)
    }

    fn new(id: u32, data: &[u8], is_extended: bool) -> Self {
        let mut fixed = [0u8; 8];
        let len = data.len().min(8);
        fixed[..len].copy_from_slice(&data[..len]);

        Self { id, data: fixed, len: len as u8, is_extended }
    }

    /// Payload slice containing only the valid bytes.
    pub fn data_slice(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// CAN identifier.
    pub fn id(&self) -> u32 {
        self.id
    }
}

/// Protocol-level decode errors.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid CAN ID: 0x{id:X}")]
    InvalidCanId { id: u32 },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: &'static str, value: u8 },
}

/// Big-endian i32 from 4 payload bytes.
pub fn bytes_to_i32_be(bytes: [u8; 4]) -> i32 {
    i32::from_be_bytes(bytes)
}

/// Big-endian i16 from 2 payload bytes.
pub fn bytes_to_i16_be(bytes: [u8; 2]) -> i16 {
    i16::from_be_bytes(bytes)
}

/// i32 to 4 big-endian payload bytes.
pub fn i32_to_bytes_be(value: i32) -> [u8; 4] {
    value.to_be_bytes()
}

/// i16 to 2 big-endian payload bytes.
pub fn i16_to_bytes_be(value: i16) -> [u8; 2] {
    value.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_construction() {
        let frame = BusFrame::new_extended(0x305, &[1, 2, 3, 4]);
        assert_eq!(frame.id(), 0x305);
        assert_eq!(frame.len, 4);
        assert!(frame.is_extended);
        assert_eq!(frame.data_slice(), &[1, 2, 3, 4]);
        assert_eq!(frame.data[4..], [0, 0, 0, 0]);
    }

    #[test]
    fn test_frame_truncates_oversized_payload() {
        let frame = BusFrame::new_standard(0x10, &[0xFF; 12]);
        assert_eq!(frame.len, 8);
        assert_eq!(frame.data_slice().len(), 8);
    }

    #[test]
    fn test_bytes_to_i32_be() {
        assert_eq!(bytes_to_i32_be([0x12, 0x34, 0x56, 0x78]), 0x12345678);
        assert_eq!(bytes_to_i32_be([0xFF, 0xFF, 0xFF, 0xFF]), -1);
    }

    #[test]
    fn test_i32_roundtrip_be() {
        for v in [0i32, 1500, -1500, i32::MAX, i32::MIN] {
            assert_eq!(bytes_to_i32_be(i32_to_bytes_be(v)), v);
        }
    }

    #[test]
    fn test_i16_roundtrip_be() {
        for v in [0i16, 250, -250, i16::MAX, i16::MIN] {
            assert_eq!(bytes_to_i16_be(i16_to_bytes_be(v)), v);
        }
    }
}
