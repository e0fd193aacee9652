//! # Strider CLI
//!
//! Bench tooling for the control core. No hardware is touched here:
//! `simulate` runs the orchestrator against a scripted joystick and a
//! first-order motor model, `encode` prints the wire encoding of a
//! single command for protocol debugging.
//!
//! ```bash
//! # closed-loop simulation, 50 Hz ticks, snapshot once per second
//! strider-cli simulate --seconds 20
//!
//! # inspect a frame
//! strider-cli encode motor --device 5 --kind rpm --value 1500
//! strider-cli encode actuator --id 99 --joint backrest --action extend
//! ```

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use strider_control::{
    Axis, Button, ControlConfig, FrameTransport, InputSource, Orchestrator, SystemClock,
    TransportError,
};
use strider_protocol::{
    ActuatorAction, ActuatorCommand, BusFrame, Joint, MotorCommand, MotorCommandKind,
};

#[derive(Parser, Debug)]
#[command(name = "strider-cli")]
#[command(about = "Bench tooling for the Strider control core", long_about = None)]
#[command(version)]
struct Cli {
    /// Optional TOML control configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the control loop against a scripted joystick and a motor model.
    Simulate {
        /// Wall-clock duration of the run.
        #[arg(long, default_value_t = 12)]
        seconds: u64,

        /// Control tick rate.
        #[arg(long, default_value_t = 50)]
        tick_hz: u64,
    },

    /// Print the wire encoding of a single command.
    #[command(subcommand)]
    Encode(EncodeCommand),
}

#[derive(Subcommand, Debug)]
enum EncodeCommand {
    /// Motor controller command.
    Motor {
        #[arg(long)]
        device: u8,
        #[arg(long, value_enum)]
        kind: KindArg,
        #[arg(long)]
        value: f32,
    },
    /// Actuator driver command.
    Actuator {
        #[arg(long)]
        id: u8,
        #[arg(long, value_enum)]
        joint: JointArg,
        #[arg(long, value_enum)]
        action: ActionArg,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Duty,
    Current,
    CurrentBrake,
    Rpm,
    Pos,
    CurrentRel,
    CurrentBrakeRel,
    CurrentHandbrake,
    CurrentHandbrakeRel,
}

impl From<KindArg> for MotorCommandKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Duty => Self::SetDuty,
            KindArg::Current => Self::SetCurrent,
            KindArg::CurrentBrake => Self::SetCurrentBrake,
            KindArg::Rpm => Self::SetRpm,
            KindArg::Pos => Self::SetPos,
            KindArg::CurrentRel => Self::SetCurrentRel,
            KindArg::CurrentBrakeRel => Self::SetCurrentBrakeRel,
            KindArg::CurrentHandbrake => Self::SetCurrentHandbrake,
            KindArg::CurrentHandbrakeRel => Self::SetCurrentHandbrakeRel,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum JointArg {
    Footrest,
    Backrest,
    Seat,
}

impl From<JointArg> for Joint {
    fn from(joint: JointArg) -> Self {
        match joint {
            JointArg::Footrest => Self::Footrest,
            JointArg::Backrest => Self::Backrest,
            JointArg::Seat => Self::Seat,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ActionArg {
    Extend,
    Retract,
    Stop,
}

impl From<ActionArg> for ActuatorAction {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::Extend => Self::Extend,
            ActionArg::Retract => Self::Retract,
            ActionArg::Stop => Self::Stop,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate { seconds, tick_hz } => simulate(config, seconds, tick_hz),
        Commands::Encode(cmd) => {
            print_frame(&match cmd {
                EncodeCommand::Motor { device, kind, value } => {
                    MotorCommand::new(device, kind.into(), value).to_frame()
                }
                EncodeCommand::Actuator { id, joint, action } => {
                    ActuatorCommand::new(id, joint.into(), action.into()).to_frame()
                }
            });
            Ok(())
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<ControlConfig> {
    let Some(path) = path else {
        return Ok(ControlConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: ControlConfig =
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

fn print_frame(frame: &BusFrame) {
    let hex: Vec<String> = frame.data_slice().iter().map(|b| format!("{b:02X}")).collect();
    println!(
        "id=0x{:08X} ({}) len={} data=[{}]",
        frame.id(),
        if frame.is_extended { "ext" } else { "std" },
        frame.len,
        hex.join(" ")
    );
}

/// Joystick script: rest, forward ramp, reverse ramp, rest, on a
/// repeating cycle. Buttons stay up; the simulation exercises the
/// drive path.
struct ScriptedStick {
    started: Instant,
}

impl ScriptedStick {
    fn new() -> Self {
        Self { started: Instant::now() }
    }
}

impl InputSource for ScriptedStick {
    fn read_axis(&mut self, axis: Axis) -> i32 {
        if axis == Axis::X {
            return 1800;
        }
        let t = self.started.elapsed().as_millis() as u64 % 12_000;
        match t {
            0..=2999 => 1820,
            3000..=5999 => 1860 + ((t - 3000) as i32 * (3500 - 1860) / 3000),
            6000..=8999 => 1780 - ((t - 6000) as i32 * (1780 - 180) / 3000),
            _ => 1820,
        }
    }

    fn read_button(&mut self, _button: Button) -> bool {
        false
    }
}

/// Captures the latest rpm setpoint per motor so the model can chase it.
#[derive(Clone, Default)]
struct ModelBus {
    setpoints: Rc<RefCell<[f32; 2]>>,
}

impl FrameTransport for ModelBus {
    fn transmit(&mut self, frame: BusFrame) -> Result<(), TransportError> {
        debug!(id = frame.id(), data = ?frame.data_slice(), "tx");
        let device = (frame.id() & 0xFF) as u8;
        let kind = ((frame.id() >> 8) & 0xFF) as u8;
        if kind == MotorCommandKind::SetRpm as u8 && (1..=2).contains(&device) {
            let raw = i32::from_be_bytes([frame.data[0], frame.data[1], frame.data[2], frame.data[3]]);
            self.setpoints.borrow_mut()[(device - 1) as usize] = raw as f32;
        }
        Ok(())
    }
}

fn simulate(config: ControlConfig, seconds: u64, tick_hz: u64) -> Result<()> {
    anyhow::ensure!(tick_hz > 0, "tick_hz must be > 0");

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .context("installing ctrl-c handler")?;
    }

    let bus = ModelBus::default();
    let mut core = Orchestrator::new(SystemClock::new(), ScriptedStick::new(), bus.clone(), config)
        .context("building orchestrator")?;
    let snapshot = core.snapshot();
    let feedback = core.feedback_sender();

    let tick = Duration::from_micros(1_000_000 / tick_hz);
    let deadline = Instant::now() + Duration::from_secs(seconds);
    let mut motor_rpm = [0.0f32; 2];
    let mut last_report = Instant::now();

    info!(seconds, tick_hz, "simulation started");
    while Instant::now() < deadline && !stop.load(Ordering::SeqCst) {
        core.tick();

        // first-order motor model chasing the commanded setpoint,
        // reported back through the feedback inbox
        let setpoints = *bus.setpoints.borrow();
        for (i, rpm) in motor_rpm.iter_mut().enumerate() {
            *rpm += (setpoints[i] - *rpm) * 0.1;
            let mut data = [0u8; 8];
            data[..4].copy_from_slice(&(*rpm as i32).to_be_bytes());
            let id = 0x900 | (i as u32 + 1);
            // inbox full just means the core is behind; drop the sample
            let _ = feedback.try_send(BusFrame::new_extended(id, &data));
        }

        if last_report.elapsed() >= Duration::from_secs(1) {
            last_report = Instant::now();
            let view = snapshot.load();
            info!(
                tick = view.tick,
                speed_rpm = view.speed_rpm,
                mode = ?view.mode,
                "snapshot: {}",
                serde_json::to_string(&*view).unwrap_or_default()
            );
        }

        spin_sleep::sleep(tick);
    }

    info!("simulation finished");
    Ok(())
}
