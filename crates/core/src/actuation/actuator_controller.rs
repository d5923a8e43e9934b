//! Arm sequencing over a line-oriented transport.
//!
//! Without a transport the controller runs in simulation mode: the same
//! step sequence is logged and recorded but nothing is written and no
//! settle delays are taken.
use std::fmt;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::color::domain::color_label::ColorLabel;
use crate::routing::bin_router::{BinRegistry, SortDecision};
use crate::shared::config::ArmConfig;
use crate::shared::connection_state::ConnectionState;
use crate::shared::error::SortingError;

use super::domain::arm_command::ArmCommand;
use super::domain::arm_transport::ArmTransport;
use super::domain::gripper_state::GripperState;
use super::infrastructure::serial_arm_transport::SerialArmTransport;

/// The arm is a single physical resource; every user goes through this.
pub type SharedActuator = Arc<Mutex<ActuatorController>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArmTiming {
    /// Wait after each move for the arm to physically arrive.
    pub settle: Duration,
    /// Wait after closing or opening the gripper.
    pub grip_hold: Duration,
}

impl ArmTiming {
    pub fn instant() -> Self {
        Self {
            settle: Duration::ZERO,
            grip_hold: Duration::ZERO,
        }
    }
}

impl Default for ArmTiming {
    fn default() -> Self {
        ArmConfig::default().timing()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArmGeometry {
    pub hover_z: i32,
    pub grasp_z: i32,
}

impl Default for ArmGeometry {
    fn default() -> Self {
        ArmConfig::default().geometry()
    }
}

impl ArmConfig {
    pub fn timing(&self) -> ArmTiming {
        ArmTiming {
            settle: Duration::from_millis(self.settle_ms),
            grip_hold: Duration::from_millis(self.grip_hold_ms),
        }
    }

    pub fn geometry(&self) -> ArmGeometry {
        ArmGeometry {
            hover_z: self.hover_z,
            grasp_z: self.grasp_z,
        }
    }
}

/// One step of the pick-and-deposit choreography.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActuationStep {
    MoveAbovePick,
    DescendToPick,
    CloseGripper,
    HoldGrip,
    AscendFromPick,
    ResolveBin,
    MoveAboveBin,
    DescendToBin,
    OpenGripper,
    HoldRelease,
    AscendFromBin,
}

impl fmt::Display for ActuationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ActuationStep::MoveAbovePick => "move above pick point",
            ActuationStep::DescendToPick => "descend to pick point",
            ActuationStep::CloseGripper => "close gripper",
            ActuationStep::HoldGrip => "hold grip",
            ActuationStep::AscendFromPick => "ascend from pick point",
            ActuationStep::ResolveBin => "resolve bin",
            ActuationStep::MoveAboveBin => "move above bin",
            ActuationStep::DescendToBin => "descend to bin",
            ActuationStep::OpenGripper => "open gripper",
            ActuationStep::HoldRelease => "hold release",
            ActuationStep::AscendFromBin => "ascend from bin",
        };
        f.write_str(text)
    }
}

pub struct ActuatorController {
    transport: Option<Box<dyn ArmTransport>>,
    state: ConnectionState,
    gripper: GripperState,
    registry: BinRegistry,
    timing: ArmTiming,
    geometry: ArmGeometry,
    last_sequence: Vec<ActuationStep>,
    last_commands: Vec<ArmCommand>,
}

impl ActuatorController {
    pub fn connect(
        transport: Box<dyn ArmTransport>,
        registry: BinRegistry,
        timing: ArmTiming,
        geometry: ArmGeometry,
    ) -> Self {
        let mut controller = Self::simulated(registry, timing, geometry);
        controller.transport = Some(transport);
        controller.state = ConnectionState::Connected;
        controller
    }

    pub fn simulated(registry: BinRegistry, timing: ArmTiming, geometry: ArmGeometry) -> Self {
        Self {
            transport: None,
            state: ConnectionState::Disconnected,
            gripper: GripperState::Open,
            registry,
            timing,
            geometry,
            last_sequence: Vec::new(),
            last_commands: Vec::new(),
        }
    }

    /// Opens the configured serial port, or falls back to simulation mode.
    pub fn open_serial(config: &ArmConfig, registry: BinRegistry) -> Self {
        if config.simulate {
            log::info!("Arm simulation forced by configuration");
            return Self::simulated(registry, config.timing(), config.geometry());
        }
        match SerialArmTransport::open(&config.port, config.baud_rate) {
            Ok(transport) => Self::connect(
                Box::new(transport),
                registry,
                config.timing(),
                config.geometry(),
            ),
            Err(e) => {
                log::warn!(
                    "Arm not connected on {} ({}), running in simulation mode",
                    config.port,
                    e
                );
                Self::simulated(registry, config.timing(), config.geometry())
            }
        }
    }

    pub fn shared(self) -> SharedActuator {
        Arc::new(Mutex::new(self))
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    pub fn gripper(&self) -> GripperState {
        self.gripper
    }

    /// Steps taken by the most recent pick-and-deposit, in order.
    pub fn last_sequence(&self) -> &[ActuationStep] {
        &self.last_sequence
    }

    /// Commands issued (or simulated) by the most recent operation.
    pub fn last_commands(&self) -> &[ArmCommand] {
        &self.last_commands
    }

    /// Moves to an absolute position and waits for the arm to settle.
    pub fn move_to(&mut self, x: i32, y: i32, z: i32) -> Result<(), SortingError> {
        self.last_commands.clear();
        self.issue("move", ArmCommand::Move { x, y, z })
            .map_err(|reason| self.fail("move", reason))
    }

    /// Picks the object at `(x, y)` and drops it into the bin routed for
    /// `(class_label, color)`.
    ///
    /// On a mid-sequence fault the gripper is commanded open on a best
    /// effort basis and the last confirmed gripper state is reported.
    pub fn pick_and_deposit(
        &mut self,
        x: i32,
        y: i32,
        class_label: &str,
        color: ColorLabel,
    ) -> Result<SortDecision, SortingError> {
        self.last_sequence.clear();
        self.last_commands.clear();
        let hover = self.geometry.hover_z;
        let grasp = self.geometry.grasp_z;

        let pick = [
            (ActuationStep::MoveAbovePick, Some(ArmCommand::Move { x, y, z: hover })),
            (ActuationStep::DescendToPick, Some(ArmCommand::Move { x, y, z: grasp })),
            (ActuationStep::CloseGripper, Some(ArmCommand::Grip { close: true })),
            (ActuationStep::HoldGrip, None),
            (ActuationStep::AscendFromPick, Some(ArmCommand::Move { x, y, z: hover })),
        ];
        for (step, command) in pick {
            self.run_step(step, command)?;
        }

        self.last_sequence.push(ActuationStep::ResolveBin);
        let decision = SortDecision::resolve(&self.registry, class_label, color);
        let (bx, by) = (decision.bin.x, decision.bin.y);
        self.log_step(
            ActuationStep::ResolveBin,
            &format!("{class_label}_{color} -> {}", decision.bin),
        );

        let deposit = [
            (ActuationStep::MoveAboveBin, Some(ArmCommand::Move { x: bx, y: by, z: hover })),
            (ActuationStep::DescendToBin, Some(ArmCommand::Move { x: bx, y: by, z: grasp })),
            (ActuationStep::OpenGripper, Some(ArmCommand::Grip { close: false })),
            (ActuationStep::HoldRelease, None),
            (ActuationStep::AscendFromBin, Some(ArmCommand::Move { x: bx, y: by, z: hover })),
        ];
        for (step, command) in deposit {
            self.run_step(step, command)?;
        }

        Ok(decision)
    }

    /// Closes the transport. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
            log::info!("Arm connection closed");
        }
        self.state = ConnectionState::Disconnected;
    }

    fn run_step(
        &mut self,
        step: ActuationStep,
        command: Option<ArmCommand>,
    ) -> Result<(), SortingError> {
        self.last_sequence.push(step);
        match command {
            Some(command) => {
                self.issue(&step.to_string(), command)
                    .map_err(|reason| self.fail(&step.to_string(), reason))
            }
            None => {
                self.log_step(step, &format!("{:?}", self.timing.grip_hold));
                self.pause(self.timing.grip_hold);
                Ok(())
            }
        }
    }

    /// Writes one command and waits for it to take effect. The gripper
    /// state only changes once the write succeeded. In simulation mode the
    /// command line is logged instead.
    fn issue(&mut self, label: &str, command: ArmCommand) -> Result<(), String> {
        self.last_commands.push(command);
        if self.state.is_connected() {
            log::debug!("Arm {label}: {command}");
        } else {
            log::info!("[simulated] Arm {label}: {command}");
        }
        if let Some(transport) = self.transport.as_mut() {
            transport
                .send_line(&command.to_line())
                .map_err(|e| format!("{label}: {e}"))?;
        }
        match command {
            ArmCommand::Move { .. } => self.pause(self.timing.settle),
            ArmCommand::Grip { close } => {
                self.gripper = if close {
                    GripperState::Closed
                } else {
                    GripperState::Open
                };
            }
        }
        Ok(())
    }

    fn fail(&mut self, step: &str, reason: String) -> SortingError {
        log::error!("Actuation failed during {step}: {reason}");
        if self.gripper == GripperState::Closed {
            if let Some(transport) = self.transport.as_mut() {
                match transport.send_line(&ArmCommand::Grip { close: false }.to_line()) {
                    Ok(()) => self.gripper = GripperState::Open,
                    Err(e) => log::error!("Could not release gripper after fault: {e}"),
                }
            }
        }
        SortingError::FailedActuation {
            step: step.to_string(),
            reason,
            gripper: self.gripper,
        }
    }

    fn pause(&self, duration: Duration) {
        if self.state.is_connected() && !duration.is_zero() {
            thread::sleep(duration);
        }
    }

    fn log_step(&self, step: ActuationStep, detail: &str) {
        if self.state.is_connected() {
            log::debug!("Arm {step}: {detail}");
        } else {
            log::info!("[simulated] Arm {step}: {detail}");
        }
    }
}

impl Drop for ActuatorController {
    fn drop(&mut self) {
        self.close();
    }
}
