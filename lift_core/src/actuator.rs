//! Motor driver wrapper: the only place raw actuation outputs are written.
use crate::hw_error::map_hw_error;
use crate::shared::Flag;
use lift_traits::{Actuator, BoxError, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveState {
    #[default]
    Stopped,
    Driving(Direction),
}

pub struct ActuatorDriver<A: Actuator> {
    hw: A,
    state: DriveState,
    full_duty: u16,
    lockout: Flag,
}

impl<A: Actuator> ActuatorDriver<A> {
    /// `lockout` is the power monitor's lock bit; while it is raised the
    /// driver refuses to wake the motor.
    pub fn new(hw: A, full_duty: u16, lockout: Flag) -> Self {
        Self {
            hw,
            state: DriveState::Stopped,
            full_duty,
            lockout,
        }
    }

    /// Wake the driver and run at full duty in `dir`. Returns `false` when the
    /// motor was left stopped (lockout or a write failure).
    pub fn drive(&mut self, dir: Direction) -> bool {
        if self.lockout.get() {
            tracing::warn!(?dir, "drive refused: battery lockout");
            self.stop();
            return false;
        }
        self.state = DriveState::Driving(dir);
        match self.wake(dir) {
            Ok(()) => {
                tracing::debug!(?dir, "actuator driving");
                true
            }
            Err(e) => {
                tracing::warn!(error = %map_hw_error(&*e), ?dir, "actuator write failed; stopping");
                self.stop();
                false
            }
        }
    }

    fn wake(&mut self, dir: Direction) -> Result<(), BoxError> {
        self.hw.set_sleep(false)?;
        self.hw.set_direction(dir)?;
        self.hw.set_duty_cycle(self.full_duty)
    }

    /// Zero duty and put the driver to sleep. Best effort: failures are logged.
    pub fn stop(&mut self) {
        self.state = DriveState::Stopped;
        if let Err(e) = self.hw.set_duty_cycle(0) {
            tracing::warn!(error = %map_hw_error(&*e), "actuator duty write failed");
        }
        if let Err(e) = self.hw.set_sleep(true) {
            tracing::warn!(error = %map_hw_error(&*e), "actuator sleep write failed");
        }
    }

    pub fn state(&self) -> DriveState {
        self.state
    }

    /// Latched direction, `None` while stopped.
    pub fn direction(&self) -> Option<Direction> {
        match self.state {
            DriveState::Driving(d) => Some(d),
            DriveState::Stopped => None,
        }
    }

    pub fn into_inner(self) -> A {
        self.hw
    }
}
