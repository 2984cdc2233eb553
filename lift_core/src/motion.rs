//! Motion controller: the single owner of the actuator.
//!
//! One control cycle (`step`) runs, in order:
//! 1. the battery lockout check (stops the motor while the lock bit is set),
//! 2. the limit interlock for the current direction of travel (skipped while
//!    calibrating),
//! 3. at most one queued `MotorCommand`.
//!
//! `GotoPosition`, `SavePosition` and `Calibrate` run to completion inside
//! the cycle that dequeued them; no other command is taken meanwhile.
//! Every blocking loop also ends on lockout and on the travel watchdog.
use crate::bus::{DisplayMsg, MotorCommand, Queue};
use crate::config::MotionCfg;
use crate::height::{HeightSource, Published};
use crate::limits::{LimitPhase, LimitSensor};
use crate::actuator::ActuatorDriver;
use crate::presets::PresetId;
use crate::settings::Settings;
use crate::shared::{Bounds, Flag, SharedState};
use lift_traits::clock::Clock;
use lift_traits::{Actuator, Direction, DisplaySink, LimitSwitches};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionState {
    #[default]
    Idle,
    Moving(Direction),
    Calibrating,
}

/// Why a blocking travel loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelEnd {
    /// Within the arrival tolerance of the target.
    Arrived,
    /// Limit in the direction of travel.
    Limit,
    /// A timed drive ran its full duration.
    Elapsed,
    /// Battery lockout engaged.
    Locked,
    /// `max_travel_ms` exceeded.
    Watchdog,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BootOutcome {
    /// Valid bounds were found in storage.
    Restored(Bounds),
    /// No usable bounds; the first-boot calibration produced these.
    Calibrated(Bounds),
    /// First-boot calibration did not produce usable bounds.
    Uncalibrated,
}

pub struct MotionController<A: Actuator, L: LimitSwitches, C: Clock> {
    actuator: ActuatorDriver<A>,
    limits: LimitSensor<L>,
    shared: SharedState,
    settings: Settings,
    commands: Queue<MotorCommand>,
    display: Queue<DisplayMsg>,
    cfg: MotionCfg,
    clock: C,
    state: MotionState,
}

impl<A: Actuator, L: LimitSwitches, C: Clock> MotionController<A, L, C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        actuator: ActuatorDriver<A>,
        limits: LimitSensor<L>,
        shared: SharedState,
        settings: Settings,
        commands: Queue<MotorCommand>,
        display: Queue<DisplayMsg>,
        cfg: MotionCfg,
        clock: C,
    ) -> Self {
        Self {
            actuator,
            limits,
            shared,
            settings,
            commands,
            display,
            cfg,
            clock,
            state: MotionState::Idle,
        }
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn limits(&self) -> &LimitSensor<L> {
        &self.limits
    }

    pub fn actuator(&self) -> &ActuatorDriver<A> {
        &self.actuator
    }

    fn poll(&self) -> Duration {
        Duration::from_millis(self.cfg.poll_ms)
    }

    /// Load bounds from storage; calibrate from scratch when none are usable.
    ///
    /// Runs before the other activities start: `source` must be the height
    /// sampler itself and `panel` the panel driven directly, since nobody is
    /// flushing the display queue yet.
    pub fn boot(&mut self, source: &mut dyn HeightSource, panel: &mut dyn DisplaySink) -> BootOutcome {
        let lc = self.limits.cfg();
        if let Some(b) = self.settings.load_bounds(lc.hard_floor_mm, lc.hard_ceiling_mm) {
            self.shared.bounds.store(b);
            tracing::info!(bottom = b.bottom_mm, top = b.top_mm, "bounds restored");
            return BootOutcome::Restored(b);
        }
        tracing::info!("first boot: calibrating");
        match self.calibrate(source, Some(panel)) {
            Some(b) => BootOutcome::Calibrated(b),
            None => BootOutcome::Uncalibrated,
        }
    }

    /// One control cycle with the height produced by the sampler thread.
    pub fn step(&mut self) {
        self.step_with(&mut Published);
    }

    /// One control cycle; `source` is ticked on every poll.
    pub fn step_with(&mut self, source: &mut dyn HeightSource) {
        source.tick();

        if self.shared.lockout.get() && self.actuator.direction().is_some() {
            tracing::warn!("battery lockout: forcing stop");
            self.stop();
        }

        if self.state != MotionState::Calibrating
            && let Some(dir) = self.actuator.direction()
            && self.limits.hit(dir)
        {
            tracing::info!(?dir, height_mm = self.shared.height.get(), "interlock: limit reached");
            self.stop();
        }

        match self.commands.try_recv() {
            Some(cmd) => self.handle(cmd, source),
            None => self.clock.sleep(self.poll()),
        }
    }

    /// Run cycles until `shutdown` is raised, then leave the motor stopped.
    pub fn run(mut self, shutdown: &Flag) {
        while !shutdown.get() {
            self.step();
        }
        self.stop();
        tracing::debug!("motion controller exiting");
    }

    pub fn handle(&mut self, cmd: MotorCommand, source: &mut dyn HeightSource) {
        tracing::info!(?cmd, "motor command");
        match cmd {
            MotorCommand::Forward => self.jog(Direction::Forward),
            MotorCommand::Backward => self.jog(Direction::Backward),
            MotorCommand::Stop => self.stop(),
            MotorCommand::GotoPosition(target) => {
                self.show_page(None, lift_ui::pages::moving(self.shared.theme.get()));
                let end = self.goto(target, source);
                tracing::info!(target, ?end, height_mm = self.shared.height.get(), "goto finished");
                self.show_page(None, self.shared.idle_page());
            }
            MotorCommand::SavePosition(id) => self.save_position(id),
            MotorCommand::Calibrate => {
                self.calibrate(source, None);
            }
        }
    }

    fn jog(&mut self, dir: Direction) {
        if self.limits.hit(dir) {
            tracing::info!(?dir, "already at limit; stopping instead");
            self.stop();
            return;
        }
        if self.actuator.drive(dir) {
            self.state = MotionState::Moving(dir);
        } else {
            self.state = MotionState::Idle;
        }
    }

    fn stop(&mut self) {
        self.actuator.stop();
        if self.state != MotionState::Calibrating {
            self.state = MotionState::Idle;
        }
    }

    fn save_position(&mut self, id: PresetId) {
        let h = self.shared.height.get();
        self.settings.save_preset(id, h);
        tracing::info!(preset = %id, height_mm = h, "preset saved");
        self.show_page(None, lift_ui::pages::preset_saved(self.shared.theme.get()));
        self.display.post(DisplayMsg::Beep);
        self.clock.sleep(Duration::from_millis(self.cfg.save_dwell_ms));
        self.show_page(None, self.shared.idle_page());
    }

    fn show_page(&mut self, direct: Option<&mut (dyn DisplaySink + '_)>, page: u16) {
        match direct {
            Some(panel) => {
                if let Err(e) = panel.set_page(page) {
                    tracing::warn!(page, error = %crate::hw_error::map_hw_error(&*e), "panel write failed");
                }
            }
            None => {
                self.display.post(DisplayMsg::SetPage(page));
            }
        }
    }

    /// Drive in `dir` until `done` holds, the limit in that direction is hit,
    /// the lockout engages, `budget_ms` elapses (returns `Elapsed`) or the
    /// watchdog fires. The motor is stopped on every exit.
    fn travel(
        &mut self,
        dir: Direction,
        source: &mut dyn HeightSource,
        budget_ms: Option<u64>,
        done: &dyn Fn(f32) -> bool,
    ) -> TravelEnd {
        if !self.actuator.drive(dir) {
            self.stop();
            return TravelEnd::Locked;
        }
        if self.state != MotionState::Calibrating {
            self.state = MotionState::Moving(dir);
        }
        let start = self.clock.now();
        let end = loop {
            source.tick();
            if self.shared.lockout.get() {
                break TravelEnd::Locked;
            }
            if self.limits.hit(dir) {
                break TravelEnd::Limit;
            }
            if done(self.shared.height.get()) {
                break TravelEnd::Arrived;
            }
            let elapsed = self.clock.ms_since(start);
            if let Some(budget) = budget_ms
                && elapsed >= budget
            {
                break TravelEnd::Elapsed;
            }
            if elapsed >= self.cfg.max_travel_ms {
                tracing::warn!(?dir, elapsed_ms = elapsed, "travel watchdog fired");
                break TravelEnd::Watchdog;
            }
            self.clock.sleep(self.poll());
        };
        self.stop();
        end
    }

    /// Move to `target` mm; the direction is chosen once from the current height.
    ///
    /// Arrival is reaching the target within the tolerance or passing it,
    /// since consecutive heights can step over the tolerance window.
    pub fn goto(&mut self, target: f32, source: &mut dyn HeightSource) -> TravelEnd {
        let h = self.shared.height.get();
        let tol = self.cfg.arrive_tolerance_mm;
        if (h - target).abs() < tol {
            return TravelEnd::Arrived;
        }
        let dir = if target > h {
            Direction::Forward
        } else {
            Direction::Backward
        };
        self.travel(dir, source, None, &|h| match dir {
            Direction::Forward => h >= target - tol,
            Direction::Backward => h <= target + tol,
        })
    }

    /// Full calibration run. `panel` is `Some` only on the first-boot path.
    /// Returns the new bounds, or `None` if the run was cut short or the
    /// measured pair is unusable (the previous bounds stay in effect).
    pub fn calibrate(
        &mut self,
        source: &mut dyn HeightSource,
        mut panel: Option<&mut dyn DisplaySink>,
    ) -> Option<Bounds> {
        let first_boot = panel.is_some();
        let theme = self.shared.theme.get();
        self.state = MotionState::Calibrating;
        self.limits.set_phase(if first_boot {
            LimitPhase::FirstBoot
        } else {
            LimitPhase::Calibrating
        });
        self.show_page(panel.as_deref_mut(), lift_ui::pages::calibrating(theme));

        let result = self.calibration_passes(source, first_boot);

        self.limits.set_phase(LimitPhase::Normal);
        self.state = MotionState::Idle;
        self.show_page(panel.as_deref_mut(), self.shared.idle_page());
        result
    }

    fn calibration_passes(&mut self, source: &mut dyn HeightSource, first_boot: bool) -> Option<Bounds> {
        let settle = Duration::from_millis(self.cfg.settle_ms);

        // bottom
        let end = self.travel(Direction::Backward, source, None, &|_| false);
        if end != TravelEnd::Limit {
            tracing::warn!(?end, "calibration aborted on the way down");
            return None;
        }
        self.clock.sleep(settle);
        if first_boot {
            source.refresh();
        }
        let bottom = self.shared.height.get();
        tracing::info!(bottom_mm = bottom, "bottom measured");

        // top
        let end = self.travel(Direction::Forward, source, None, &|_| false);
        if end != TravelEnd::Limit {
            tracing::warn!(?end, "calibration aborted on the way up");
            return None;
        }
        self.clock.sleep(settle);
        if first_boot {
            for _ in 0..self.cfg.converge_samples {
                source.refresh();
            }
        }
        let top = self.shared.height.get();
        tracing::info!(top_mm = top, "top measured");

        // nothing is persisted until both ends are in and the pair is usable
        let lc = self.limits.cfg();
        let Some(bounds) = Bounds::new(bottom, top).filter(|b| b.within(lc.hard_floor_mm, lc.hard_ceiling_mm))
        else {
            tracing::warn!(bottom, top, "calibration produced unusable bounds");
            return None;
        };
        self.settings.save_bottom(bounds.bottom_mm);
        self.settings.save_top(bounds.top_mm);
        self.shared.bounds.store(bounds);

        let end = if first_boot {
            // no trusted position feedback yet: timed descent to a resting point
            self.travel(Direction::Backward, source, Some(self.cfg.park_ms), &|_| false)
        } else {
            self.goto(bounds.center_mm(), source)
        };
        tracing::info!(?end, center_mm = bounds.center_mm(), "calibration complete");
        Some(bounds)
    }
}
