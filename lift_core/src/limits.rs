//! End-of-travel detection.
//!
//! Hardware switches always count. The soft checks against the calibrated
//! bounds are suspended while calibrating, because the bounds are what is
//! being measured; the hard floor is also suspended during the first-boot
//! run, where no height has been trusted yet.
use crate::config::LimitCfg;
use crate::shared::{Bounds, BoundsCell, HeightReader};
use lift_traits::{Direction, LimitSwitches};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitPhase {
    #[default]
    Normal,
    Calibrating,
    /// Calibration run at boot because no valid bounds were stored.
    FirstBoot,
}

impl LimitPhase {
    pub fn calibrating(self) -> bool {
        !matches!(self, LimitPhase::Normal)
    }
}

/// Pure bottom check, see [`LimitSensor::hit_bottom`].
pub fn bottom_reached(
    switch: bool,
    height_mm: f32,
    bounds: Option<Bounds>,
    phase: LimitPhase,
    cfg: &LimitCfg,
) -> bool {
    if switch {
        return true;
    }
    if !phase.calibrating()
        && let Some(b) = bounds
        && height_mm <= b.bottom_mm + cfg.bottom_tolerance_mm
    {
        return true;
    }
    phase != LimitPhase::FirstBoot && height_mm <= cfg.hard_floor_mm
}

/// Pure top check, see [`LimitSensor::hit_top`].
pub fn top_reached(
    switch: bool,
    height_mm: f32,
    bounds: Option<Bounds>,
    phase: LimitPhase,
    cfg: &LimitCfg,
) -> bool {
    if switch {
        return true;
    }
    if !phase.calibrating()
        && let Some(b) = bounds
        && height_mm >= b.top_mm - cfg.top_tolerance_mm
    {
        return true;
    }
    height_mm >= cfg.hard_ceiling_mm
}

pub struct LimitSensor<L: LimitSwitches> {
    switches: L,
    height: HeightReader,
    bounds: BoundsCell,
    cfg: LimitCfg,
    phase: LimitPhase,
}

impl<L: LimitSwitches> LimitSensor<L> {
    pub fn new(switches: L, height: HeightReader, bounds: BoundsCell, cfg: LimitCfg) -> Self {
        Self {
            switches,
            height,
            bounds,
            cfg,
            phase: LimitPhase::Normal,
        }
    }

    pub fn set_phase(&mut self, phase: LimitPhase) {
        self.phase = phase;
    }

    pub fn phase(&self) -> LimitPhase {
        self.phase
    }

    pub fn hit_bottom(&self) -> bool {
        bottom_reached(
            self.switches.bottom(),
            self.height.get(),
            self.bounds.load(),
            self.phase,
            &self.cfg,
        )
    }

    pub fn hit_top(&self) -> bool {
        top_reached(
            self.switches.top(),
            self.height.get(),
            self.bounds.load(),
            self.phase,
            &self.cfg,
        )
    }

    /// Limit in the direction of travel.
    pub fn hit(&self, dir: Direction) -> bool {
        match dir {
            Direction::Forward => self.hit_top(),
            Direction::Backward => self.hit_bottom(),
        }
    }

    pub fn bottom_switch(&self) -> bool {
        self.switches.bottom()
    }

    pub fn cfg(&self) -> &LimitCfg {
        &self.cfg
    }
}
