//! Capability traits for the hardware collaborators.
//!
//! The core never touches pins, ADCs or the bus controller. It
//! consumes these traits and stays testable against scripted
//! implementations; the host application wires in the real drivers.

use crate::error::TransportError;
pub use crate::calibration::Axis;
use strider_protocol::BusFrame;

/// The four momentary buttons on the armrest panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Mode / confirm.
    Mode,
    /// Select / cancel.
    Select,
    /// Menu up.
    Up,
    /// Menu down.
    Down,
}

impl Button {
    pub const ALL: [Button; 4] = [Button::Mode, Button::Select, Button::Up, Button::Down];
}

/// De-glitched operator input, sampled once per tick.
pub trait InputSource {
    /// Raw joystick reading in ADC units.
    fn read_axis(&mut self, axis: Axis) -> i32;

    /// Debounced level of one button.
    fn read_button(&mut self, button: Button) -> bool;
}

/// Outbound bus frames. Transmission is fire-and-forget from the
/// core's point of view; implementations must not block the tick.
pub trait FrameTransport {
    fn transmit(&mut self, frame: BusFrame) -> Result<(), TransportError>;
}
