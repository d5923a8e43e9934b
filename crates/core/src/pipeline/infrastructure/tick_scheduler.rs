//! Fixed-rate driver for the sorting loop.
//!
//! Operator commands and ticks are multiplexed on one thread, so a command
//! is never applied while a tick is in flight.
use std::time::Duration;

use crossbeam_channel::{select, tick, Receiver};

use crate::pipeline::control_command::ControlCommand;
use crate::pipeline::sorting_orchestrator::SortingOrchestrator;
use crate::shared::constants::DEFAULT_TICK_INTERVAL_MS;

pub struct TickScheduler {
    interval: Duration,
}

impl TickScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs until `Shutdown` arrives or every command sender is dropped.
    /// Returns the number of ticks executed.
    pub fn run(
        &self,
        orchestrator: &mut SortingOrchestrator,
        commands: Receiver<ControlCommand>,
    ) -> usize {
        let ticker = tick(self.interval);
        let mut ticks = 0;
        log::info!("Tick scheduler running every {:?}", self.interval);

        loop {
            select! {
                recv(commands) -> msg => match msg {
                    Ok(ControlCommand::Shutdown) | Err(_) => break,
                    Ok(command) => apply(orchestrator, command),
                },
                recv(ticker) -> _ => {
                    orchestrator.tick();
                    ticks += 1;
                }
            }
        }

        orchestrator.shutdown();
        log::info!("Tick scheduler stopped after {ticks} ticks");
        ticks
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_TICK_INTERVAL_MS))
    }
}

fn apply(orchestrator: &mut SortingOrchestrator, command: ControlCommand) {
    let result = match command {
        ControlCommand::Start => orchestrator.start(),
        ControlCommand::Stop => orchestrator.stop(),
        ControlCommand::SelectCamera(position) => orchestrator
            .select_camera(position)
            .map(|state| log::info!("Camera {position} selected ({state})")),
        ControlCommand::Jog { x, y, z } => orchestrator.jog(x, y, z),
        ControlCommand::CaptureLabel(label) => orchestrator.capture_label(&label),
        ControlCommand::Status(reply) => {
            // A vanished requester is not an error for the loop.
            let _ = reply.send(orchestrator.status());
            Ok(())
        }
        ControlCommand::Cameras(reply) => {
            let _ = reply.send(orchestrator.cameras());
            Ok(())
        }
        ControlCommand::Shutdown => {
            orchestrator.shutdown();
            Ok(())
        }
    };
    if let Err(e) = result {
        log::warn!("{e}");
    }
}
