//! Linear actuator command encoding.
//!
//! The actuator driver board listens on a single identifier and takes
//! a 2-byte payload whose first byte is a 4-bit action mask. The bit
//! layout is a protocol contract with the driver firmware:
//!
//! ```text
//! bit 3  backrest extend
//! bit 2  backrest retract
//! bit 1  footrest extend
//! bit 0  footrest retract
//! 0b0000 stop everything
//! ```

use crate::BusFrame;

/// Adjustable joints of the seat assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Joint {
    Footrest,
    Backrest,
    /// The seat shares the footrest channel on the driver board.
    Seat,
}

impl Joint {
    /// Which mask group this joint drives.
    pub fn is_backrest(self) -> bool {
        matches!(self, Joint::Backrest)
    }
}

/// Commanded actuator motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorAction {
    Extend,
    Retract,
    Stop,
}

/// A command addressed to the actuator driver board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorCommand {
    pub actuator_id: u8,
    pub joint: Joint,
    pub action: ActuatorAction,
}

impl ActuatorCommand {
    pub fn new(actuator_id: u8, joint: Joint, action: ActuatorAction) -> Self {
        Self { actuator_id, joint, action }
    }

    /// The 4-bit action mask for payload byte 0.
    pub fn action_mask(&self) -> u8 {
        match (self.joint.is_backrest(), self.action) {
            (true, ActuatorAction::Extend) => 0b1000,
            (true, ActuatorAction::Retract) => 0b0100,
            (false, ActuatorAction::Extend) => 0b0010,
            (false, ActuatorAction::Retract) => 0b0001,
            (_, ActuatorAction::Stop) => 0b0000,
        }
    }

    /// Encode into a bus frame: identifier is the actuator id, 2
    /// payload bytes, byte 0 carries the mask and byte 1 is reserved.
    pub fn to_frame(&self) -> BusFrame {
        BusFrame::new_extended(self.actuator_id as u32, &[self.action_mask(), 0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backrest_extend_mask() {
        let frame = ActuatorCommand::new(99, Joint::Backrest, ActuatorAction::Extend).to_frame();
        assert_eq!(frame.id(), 99);
        assert_eq!(frame.len, 2);
        assert_eq!(frame.data[0], 0b1000);
    }

    #[test]
    fn test_backrest_retract_mask() {
        let cmd = ActuatorCommand::new(99, Joint::Backrest, ActuatorAction::Retract);
        assert_eq!(cmd.action_mask(), 0b0100);
    }

    #[test]
    fn test_footrest_masks() {
        assert_eq!(
            ActuatorCommand::new(99, Joint::Footrest, ActuatorAction::Extend).action_mask(),
            0b0010
        );
        assert_eq!(
            ActuatorCommand::new(99, Joint::Footrest, ActuatorAction::Retract).action_mask(),
            0b0001
        );
    }

    #[test]
    fn test_seat_uses_footrest_mask_group() {
        assert_eq!(
            ActuatorCommand::new(99, Joint::Seat, ActuatorAction::Extend).action_mask(),
            0b0010
        );
    }

    #[test]
    fn test_stop_is_zero_for_every_joint() {
        for joint in [Joint::Footrest, Joint::Backrest, Joint::Seat] {
            assert_eq!(ActuatorCommand::new(99, joint, ActuatorAction::Stop).action_mask(), 0);
        }
    }

    #[test]
    fn test_frame_shape() {
        let frame = ActuatorCommand::new(42, Joint::Footrest, ActuatorAction::Retract).to_frame();
        assert!(frame.is_extended);
        assert_eq!(frame.data_slice(), &[0b0001, 0]);
    }
}
