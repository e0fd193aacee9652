//! Control orchestrator: the once-per-tick composition of sampling,
//! classification, calibration, regulation and frame emission.
//!
//! Within a tick the order is fixed and load-bearing: the feedback
//! inbox drains first, then the joystick and buttons are sampled,
//! buttons are classified, calibration or actuator mapping consumes
//! the same joystick sample, frames go out, and finally a snapshot is
//! published. Calibration and actuator mapping must both see the same
//! tick's sample.
//!
//! The orchestrator is the single writer of all core state. External
//! contexts (a bus receive callback, another thread) feed it only
//! through the bounded feedback channel, which is drained at the top
//! of the next tick, and observe it only through the published
//! snapshot.
//!
//! A calibration run that ends without joystick movement commits a
//! degenerate calibration: the extrema never left their sentinels, so
//! the margins saturate and the result, while finite and well-formed,
//! maps every reading to `Stop`. The operator recovers by running
//! calibration again.

use crate::button::{ButtonClassifier, PressKind};
use crate::calibration::{Axis, JoystickCalibration, JoystickCalibrator};
use crate::clock::Clock;
use crate::config::ControlConfig;
use crate::error::ControlError;
use crate::io::{Button, FrameTransport, InputSource};
use crate::pid::Pid;
use crate::state::{ControlSnapshot, DriveMode, JointAngle, JointView, MenuSelection, SharedSnapshot};
use crossbeam_channel::{Receiver, Sender, bounded};
use strider_protocol::{
    ActuatorAction, ActuatorCommand, BusFrame, Joint, MotorCommand, MotorCommandKind, MotorStatus,
};
use tracing::{info, trace, warn};

/// Capacity of the next-tick feedback inbox.
const FEEDBACK_INBOX_CAPACITY: usize = 64;

/// Owns every piece of mutable control state and runs the tick loop
/// body. See the module docs for the ordering contract.
pub struct Orchestrator<C, I, T> {
    clock: C,
    input: I,
    transport: T,
    config: ControlConfig,

    buttons: [ButtonClassifier; 4],
    calibrator: JoystickCalibrator,
    calibration: JoystickCalibration,

    backrest: JointAngle,
    footrest: JointAngle,
    seat: JointAngle,

    drive_pid: Pid,
    left_rpm: Option<f32>,
    right_rpm: Option<f32>,

    mode: DriveMode,
    config_menu_open: bool,
    selection: MenuSelection,

    snapshot: SharedSnapshot,
    feedback_tx: Sender<BusFrame>,
    feedback_rx: Receiver<BusFrame>,
    tick_count: u64,
}

impl<C: Clock, I: InputSource, T: FrameTransport> Orchestrator<C, I, T> {
    pub fn new(clock: C, input: I, transport: T, config: ControlConfig) -> Result<Self, ControlError> {
        config.validate()?;

        let now = clock.now_millis();
        let (feedback_tx, feedback_rx) = bounded(FEEDBACK_INBOX_CAPACITY);
        let buttons = std::array::from_fn(|_| ButtonClassifier::new(config.long_press_ms));

        Ok(Self {
            buttons,
            calibrator: JoystickCalibrator::new(),
            calibration: JoystickCalibration::default(),
            backrest: JointAngle::new(config.backrest_limits),
            footrest: JointAngle::new(config.footrest_limits),
            seat: JointAngle::new(config.seat_limits),
            drive_pid: Pid::new(config.drive_pid, now),
            left_rpm: None,
            right_rpm: None,
            mode: DriveMode::Drive,
            config_menu_open: false,
            selection: MenuSelection::Calibration,
            snapshot: SharedSnapshot::new(),
            feedback_tx,
            feedback_rx,
            tick_count: 0,
            clock,
            input,
            transport,
            config,
        })
    }

    /// Handle for UI-side snapshot reads.
    pub fn snapshot(&self) -> SharedSnapshot {
        self.snapshot.clone()
    }

    /// Sender half of the feedback inbox, for the bus receive context.
    /// Frames land in the next tick.
    pub fn feedback_sender(&self) -> Sender<BusFrame> {
        self.feedback_tx.clone()
    }

    /// The calibration currently in effect.
    pub fn calibration(&self) -> &JoystickCalibration {
        &self.calibration
    }

    /// Run one control tick.
    pub fn tick(&mut self) {
        let now = self.clock.now_millis();
        self.drain_feedback();

        // one joystick sample per tick, consumed by both calibration
        // and actuator mapping
        let x = self.input.read_axis(Axis::X);
        let y = self.input.read_axis(Axis::Y);

        let mut events = [None; 4];
        for (i, button) in Button::ALL.iter().enumerate() {
            let level = self.input.read_button(*button);
            events[i] = self.buttons[i].update(level, now);
        }
        self.handle_buttons(events, now);

        if self.calibrator.is_running() {
            if let Some(result) = self.calibrator.tick(x, y, now) {
                self.calibration = result;
            }
        } else if self.config_menu_open {
            if let Some(joint) = self.selection.joint() {
                self.adjust_joint(joint, y);
            }
        } else {
            self.drive(y, now);
        }

        self.tick_count += 1;
        self.publish();
    }

    fn drain_feedback(&mut self) {
        for frame in self.feedback_rx.try_iter() {
            match MotorStatus::try_from(&frame) {
                Ok(status) if status.device_id == self.config.left_motor_id => {
                    self.left_rpm = Some(status.erpm as f32);
                }
                Ok(status) if status.device_id == self.config.right_motor_id => {
                    self.right_rpm = Some(status.erpm as f32);
                }
                Ok(status) => {
                    trace!(device_id = status.device_id, "status from unmanaged device");
                }
                Err(_) => {
                    trace!(id = frame.id(), "ignoring non-status frame");
                }
            }
        }
    }

    fn handle_buttons(&mut self, events: [Option<PressKind>; 4], now: u64) {
        let [mode_event, select_event, up_event, down_event] = events;

        match mode_event {
            Some(PressKind::Long) => {
                self.config_menu_open = !self.config_menu_open;
                info!(open = self.config_menu_open, "config menu toggled");
            }
            Some(PressKind::Short) => {
                if self.config_menu_open {
                    if self.selection == MenuSelection::Calibration {
                        self.calibrator.start(now);
                    }
                } else {
                    self.mode = self.mode.toggled();
                    // the speed loop restarts clean in the new mode
                    self.drive_pid.reset(now);
                    info!(mode = ?self.mode, "drive mode toggled");
                }
            }
            None => {}
        }

        if select_event == Some(PressKind::Long) {
            self.calibrator.cancel();
        }

        // menu navigation is locked while a run is in flight
        if self.config_menu_open && !self.calibrator.is_running() {
            if up_event == Some(PressKind::Short) {
                self.selection = self.selection.prev();
            }
            if down_event == Some(PressKind::Short) {
                self.selection = self.selection.next();
            }
        }
    }

    /// Map the Y axis against the calibrated travel window and drive
    /// the selected joint's actuator.
    fn adjust_joint(&mut self, joint: Joint, y: i32) {
        let cal = self.calibration.y;
        let margin = self.config.trigger_margin;

        let action = if y > cal.travel_max - margin {
            ActuatorAction::Extend
        } else if y < cal.travel_min + margin {
            ActuatorAction::Retract
        } else {
            ActuatorAction::Stop
        };

        let step = match action {
            ActuatorAction::Extend => self.config.angle_step_deg,
            ActuatorAction::Retract => -self.config.angle_step_deg,
            ActuatorAction::Stop => 0.0,
        };
        self.joint_angle_mut(joint).advance(step);

        let frame = ActuatorCommand::new(self.config.actuator_id, joint, action).to_frame();
        self.send(frame);
    }

    /// Speed regulation: joystick deflection sets the rpm target, the
    /// PID tracks it against measured rpm, both drive motors get the
    /// same setpoint.
    fn drive(&mut self, y: i32, now: u64) {
        let target = self.rpm_target(y);
        let output = self.drive_pid.compute(self.measured_rpm(), target, now);

        for device_id in [self.config.left_motor_id, self.config.right_motor_id] {
            let frame = MotorCommand::new(device_id, MotorCommandKind::SetRpm, output).to_frame();
            self.send(frame);
        }
    }

    /// Y-axis reading to rpm target: zero inside the rest band, then
    /// proportional up to `max_rpm` at the calibrated travel extreme.
    fn rpm_target(&self, y: i32) -> f32 {
        let cal = self.calibration.y;

        if y > cal.rest_upper {
            let span = (cal.travel_max - cal.rest_upper).max(1) as f32;
            let fraction = ((y - cal.rest_upper) as f32 / span).clamp(0.0, 1.0);
            fraction * self.config.max_rpm
        } else if y < cal.rest_lower {
            let span = (cal.rest_lower - cal.travel_min).max(1) as f32;
            let fraction = ((cal.rest_lower - y) as f32 / span).clamp(0.0, 1.0);
            -fraction * self.config.max_rpm
        } else {
            0.0
        }
    }

    fn measured_rpm(&self) -> f32 {
        match (self.left_rpm, self.right_rpm) {
            (Some(l), Some(r)) => (l + r) / 2.0,
            (Some(v), None) | (None, Some(v)) => v,
            (None, None) => 0.0,
        }
    }

    fn joint_angle_mut(&mut self, joint: Joint) -> &mut JointAngle {
        match joint {
            Joint::Backrest => &mut self.backrest,
            Joint::Footrest => &mut self.footrest,
            Joint::Seat => &mut self.seat,
        }
    }

    /// Fire-and-forget transmit. Failures are logged and dropped; the
    /// core guarantees a correctly encoded frame, delivery is the
    /// transport's problem.
    fn send(&mut self, frame: BusFrame) {
        if let Err(e) = self.transport.transmit(frame) {
            warn!(error = %e, id = frame.id(), "frame transmit failed, dropping");
        }
    }

    fn publish(&mut self) {
        self.snapshot.publish(ControlSnapshot {
            mode: self.mode,
            config_menu_open: self.config_menu_open,
            selection: self.selection,
            calibrating: self.calibrator.is_running(),
            calibration: self.calibration,
            backrest: JointView::from(&self.backrest),
            footrest: JointView::from(&self.footrest),
            seat: JointView::from(&self.seat),
            speed_rpm: self.measured_rpm(),
            tick: self.tick_count,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::TransportError;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Scripted operator input shared between the test and the
    /// orchestrator.
    #[derive(Default)]
    struct InputState {
        x: i32,
        y: i32,
        buttons: [bool; 4],
    }

    #[derive(Clone, Default)]
    struct SharedInput(Rc<RefCell<InputState>>);

    impl SharedInput {
        fn set_y(&self, y: i32) {
            self.0.borrow_mut().y = y;
        }

        fn set_button(&self, button: Button, level: bool) {
            let i = Button::ALL.iter().position(|b| *b == button).unwrap();
            self.0.borrow_mut().buttons[i] = level;
        }
    }

    impl InputSource for SharedInput {
        fn read_axis(&mut self, axis: Axis) -> i32 {
            let s = self.0.borrow();
            match axis {
                Axis::X => s.x,
                Axis::Y => s.y,
            }
        }

        fn read_button(&mut self, button: Button) -> bool {
            let i = Button::ALL.iter().position(|b| *b == button).unwrap();
            self.0.borrow().buttons[i]
        }
    }

    #[derive(Clone, Default)]
    struct RecordingTransport {
        frames: Rc<RefCell<Vec<BusFrame>>>,
        fail: Rc<RefCell<bool>>,
    }

    impl RecordingTransport {
        fn frames(&self) -> Vec<BusFrame> {
            self.frames.borrow().clone()
        }

        fn clear(&self) {
            self.frames.borrow_mut().clear();
        }
    }

    impl FrameTransport for RecordingTransport {
        fn transmit(&mut self, frame: BusFrame) -> Result<(), TransportError> {
            if *self.fail.borrow() {
                return Err(TransportError::QueueFull);
            }
            self.frames.borrow_mut().push(frame);
            Ok(())
        }
    }

    struct Harness {
        clock: Rc<ManualClock>,
        input: SharedInput,
        transport: RecordingTransport,
        orchestrator: Orchestrator<Rc<ManualClock>, SharedInput, RecordingTransport>,
    }

    fn harness(config: ControlConfig) -> Harness {
        let clock = Rc::new(ManualClock::new(0));
        let input = SharedInput::default();
        let transport = RecordingTransport::default();
        let orchestrator =
            Orchestrator::new(clock.clone(), input.clone(), transport.clone(), config).unwrap();
        Harness { clock, input, transport, orchestrator }
    }

    /// Press and release a button across ticks; `hold_ms` decides the
    /// classification.
    fn press(h: &mut Harness, button: Button, hold_ms: u64) {
        h.input.set_button(button, true);
        h.clock.advance(20);
        h.orchestrator.tick();
        h.clock.advance(hold_ms);
        h.input.set_button(button, false);
        h.orchestrator.tick();
    }

    fn open_menu(h: &mut Harness) {
        press(h, Button::Mode, 700);
        assert!(h.orchestrator.snapshot().load().config_menu_open);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = ControlConfig { long_press_ms: 0, ..Default::default() };
        let clock = Rc::new(ManualClock::new(0));
        assert!(
            Orchestrator::new(clock, SharedInput::default(), RecordingTransport::default(), config)
                .is_err()
        );
    }

    #[test]
    fn test_drive_tick_emits_rpm_frames_for_both_motors() {
        let mut h = harness(ControlConfig::default());
        // centered stick: target 0, no feedback yet, pid output 0
        h.input.set_y(1820);
        h.clock.advance(20);
        h.orchestrator.tick();

        let frames = h.transport.frames();
        assert_eq!(frames.len(), 2);
        // SetRpm = kind 3
        assert_eq!(frames[0].id(), 1 | (3 << 8));
        assert_eq!(frames[1].id(), 2 | (3 << 8));
        assert_eq!(frames[0].data, [0; 8]);
    }

    #[test]
    fn test_full_deflection_commands_max_rpm() {
        // pure P with unity gain and no feedback: output == target
        let config = ControlConfig {
            drive_pid: crate::config::PidGains { kp: 1.0, kd: 0.0, ki: 0.0 },
            ..Default::default()
        };
        let max_rpm = config.max_rpm;
        let mut h = harness(config);

        h.input.set_y(3500); // factory travel_max
        h.clock.advance(20);
        h.orchestrator.tick();

        let frames = h.transport.frames();
        let raw = i32::from_be_bytes([frames[0].data[0], frames[0].data[1], frames[0].data[2], frames[0].data[3]]);
        assert_eq!(raw, max_rpm.round() as i32);
    }

    #[test]
    fn test_feedback_drains_into_next_tick() {
        let config = ControlConfig {
            drive_pid: crate::config::PidGains { kp: 1.0, kd: 0.0, ki: 0.0 },
            ..Default::default()
        };
        let mut h = harness(config);
        let sender = h.orchestrator.feedback_sender();

        // both drive motors report 1000 erpm
        for device in [1u8, 2] {
            let mut data = [0u8; 8];
            data[..4].copy_from_slice(&1000i32.to_be_bytes());
            sender.send(BusFrame::new_extended(0x900 | device as u32, &data)).unwrap();
        }

        h.input.set_y(1820); // target 0
        h.clock.advance(20);
        h.orchestrator.tick();

        // error = 0 - 1000, P-only output = -1000
        let frames = h.transport.frames();
        let raw = i32::from_be_bytes([frames[0].data[0], frames[0].data[1], frames[0].data[2], frames[0].data[3]]);
        assert_eq!(raw, -1000);
        assert_eq!(h.orchestrator.snapshot().load().speed_rpm, 1000.0);
    }

    #[test]
    fn test_menu_joint_adjustment_extends_and_clamps() {
        let mut h = harness(ControlConfig::default());
        open_menu(&mut h);

        // navigate Calibration -> Footrest -> Backrest
        press(&mut h, Button::Down, 50);
        press(&mut h, Button::Down, 50);
        assert_eq!(h.orchestrator.snapshot().load().selection, MenuSelection::Backrest);
        h.transport.clear();

        // factory y travel_max 3500, margin 400: 3200 triggers extend
        h.input.set_y(3200);
        h.clock.advance(20);
        h.orchestrator.tick();

        let frames = h.transport.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].id(), 99);
        assert_eq!(frames[0].data[0], 0b1000);

        let before = h.orchestrator.snapshot().load().backrest.degrees;
        assert!(before > 0.0);

        // hold extend long enough to saturate at max_deg
        for _ in 0..400 {
            h.clock.advance(20);
            h.orchestrator.tick();
        }
        let snapshot = h.orchestrator.snapshot().load();
        assert_eq!(snapshot.backrest.degrees, 90.0);
        assert_eq!(snapshot.backrest.percent, 100.0);
    }

    #[test]
    fn test_menu_stop_band_emits_stop() {
        let mut h = harness(ControlConfig::default());
        open_menu(&mut h);
        press(&mut h, Button::Down, 50); // Footrest
        h.transport.clear();

        h.input.set_y(1820); // rest
        h.clock.advance(20);
        h.orchestrator.tick();

        let frames = h.transport.frames();
        assert_eq!(frames[0].data[0], 0b0000);
    }

    #[test]
    fn test_calibration_run_via_buttons() {
        let mut h = harness(ControlConfig::default());
        open_menu(&mut h);

        // selection starts at Calibration; short Mode press starts the run
        h.input.set_y(1800);
        press(&mut h, Button::Mode, 50);
        assert!(h.orchestrator.snapshot().load().calibrating);

        // no actuator or motor frames while calibrating
        h.transport.clear();

        // rest phase, then sweep during circling
        while h.clock.now_millis() < 12_000 {
            h.clock.advance(20);
            let t = h.clock.now_millis();
            if (5000..9000).contains(&t) {
                h.input.set_y(if (t / 100) % 2 == 0 { 300 } else { 3600 });
            } else {
                h.input.set_y(1800);
            }
            h.orchestrator.tick();
        }

        let snapshot = h.orchestrator.snapshot().load();
        assert!(!snapshot.calibrating);
        assert_eq!(snapshot.calibration.y.rest_mid, 1800);
        assert_eq!(snapshot.calibration.y.travel_max, 3600 - 75);
        assert_eq!(snapshot.calibration.y.travel_min, 300 + 75);
        assert!(h.transport.frames().is_empty());
    }

    #[test]
    fn test_select_long_cancels_run_and_keeps_last_calibration() {
        let mut h = harness(ControlConfig::default());
        let before = *h.orchestrator.calibration();
        open_menu(&mut h);
        press(&mut h, Button::Mode, 50);
        assert!(h.orchestrator.snapshot().load().calibrating);

        press(&mut h, Button::Select, 700);
        assert!(!h.orchestrator.snapshot().load().calibrating);
        assert_eq!(*h.orchestrator.calibration(), before);
    }

    #[test]
    fn test_mode_toggle_outside_menu() {
        let mut h = harness(ControlConfig::default());
        h.input.set_y(1820);
        assert_eq!(h.orchestrator.snapshot().load().mode, DriveMode::Drive);
        press(&mut h, Button::Mode, 50);
        assert_eq!(h.orchestrator.snapshot().load().mode, DriveMode::Climb);
        press(&mut h, Button::Mode, 50);
        assert_eq!(h.orchestrator.snapshot().load().mode, DriveMode::Drive);
    }

    #[test]
    fn test_transmit_failure_does_not_abort_tick() {
        let mut h = harness(ControlConfig::default());
        *h.transport.fail.borrow_mut() = true;

        h.input.set_y(1820);
        h.clock.advance(20);
        h.orchestrator.tick();

        // tick completed and published despite the failed transmits
        assert_eq!(h.orchestrator.snapshot().load().tick, 1);
    }

    #[test]
    fn test_snapshot_tick_counter_advances() {
        let mut h = harness(ControlConfig::default());
        h.input.set_y(1820);
        for expected in 1..=5u64 {
            h.clock.advance(20);
            h.orchestrator.tick();
            assert_eq!(h.orchestrator.snapshot().load().tick, expected);
        }
    }
}
