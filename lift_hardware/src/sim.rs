//! Simulated rig.
//!
//! One shared physical model (platform height, drive direction, duty and
//! driver sleep) backs the simulated sensor, actuator and switches. The model
//! is integrated lazily from the supplied clock whenever any handle touches
//! it, so it runs equally well against real time and a `TestClock`.
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use lift_config::SimCfg;
use lift_traits::clock::Clock;
use lift_traits::{
    Actuator, BatteryLink, BoxError, Direction, DisplaySink, HostSink, LimitSwitches, PackReading,
    RangeSensor, TempReading,
};

use crate::error::HwError;

/// Switches assert within this distance of a mechanical stop (mm).
pub const SWITCH_BAND_MM: f32 = 0.05;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Distance sensor response, `mm = gain * volts^exponent - offset`.
#[derive(Debug, Clone, Copy)]
pub struct SensorCurve {
    pub gain: f32,
    pub exponent: f32,
    pub offset: f32,
    pub adc_full_scale: u16,
    pub adc_ref_v: f32,
}

impl Default for SensorCurve {
    fn default() -> Self {
        Self {
            gain: 12.08,
            exponent: -1.058,
            offset: 0.20,
            adc_full_scale: 4095,
            adc_ref_v: 3.3,
        }
    }
}

impl SensorCurve {
    /// Raw conversion the ADC would report at `mm`.
    pub fn raw_for(&self, mm: f32) -> u16 {
        let ratio = ((mm + self.offset) / self.gain).max(f32::MIN_POSITIVE);
        let volts = ratio.powf(self.exponent.recip());
        let full = f32::from(self.adc_full_scale);
        (volts / self.adc_ref_v * full).round().clamp(0.0, full) as u16
    }
}

#[derive(Debug)]
struct Physics {
    height_mm: f32,
    direction: Direction,
    duty: u16,
    asleep: bool,
    last: Instant,
    noise: u64,
    sensor_faults: u32,
}

/// Shared simulated mechanism. Clones share the same state.
#[derive(Debug, Clone)]
pub struct SimRig<C: Clock> {
    state: Arc<Mutex<Physics>>,
    cfg: SimCfg,
    full_duty: u16,
    curve: SensorCurve,
    clock: C,
}

impl<C: Clock + Clone> SimRig<C> {
    pub fn new(cfg: SimCfg, full_duty: u16, clock: C) -> Self {
        let start = cfg.start_mm.clamp(cfg.bottom_stop_mm, cfg.top_stop_mm);
        let physics = Physics {
            height_mm: start,
            direction: Direction::Forward,
            duty: 0,
            asleep: true,
            last: clock.now(),
            noise: 0x2545_f491_4f6c_dd1d,
            sensor_faults: 0,
        };
        Self {
            state: Arc::new(Mutex::new(physics)),
            cfg,
            full_duty: full_duty.max(1),
            curve: SensorCurve::default(),
            clock,
        }
    }

    pub fn with_curve(mut self, curve: SensorCurve) -> Self {
        self.curve = curve;
        self
    }

    fn integrate(&self, p: &mut Physics) {
        let now = self.clock.now();
        let dt = now.saturating_duration_since(p.last).as_secs_f32();
        p.last = now;
        if p.asleep || p.duty == 0 {
            return;
        }
        let speed = self.cfg.speed_mm_s * f32::from(p.duty.min(self.full_duty)) / f32::from(self.full_duty);
        let delta = match p.direction {
            Direction::Forward => speed * dt,
            Direction::Backward => -speed * dt,
        };
        p.height_mm = (p.height_mm + delta).clamp(self.cfg.bottom_stop_mm, self.cfg.top_stop_mm);
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut Physics) -> R) -> R {
        let mut p = lock(&self.state);
        self.integrate(&mut p);
        f(&mut p)
    }

    /// True platform height (no sensor noise).
    pub fn height_mm(&self) -> f32 {
        self.with_state(|p| p.height_mm)
    }

    pub fn set_height_mm(&self, mm: f32) {
        let (lo, hi) = (self.cfg.bottom_stop_mm, self.cfg.top_stop_mm);
        self.with_state(|p| p.height_mm = mm.clamp(lo, hi));
    }

    /// Driver awake with a non-zero duty.
    pub fn is_driving(&self) -> bool {
        self.with_state(|p| !p.asleep && p.duty > 0)
    }

    /// Make the next `n` sensor conversions fail.
    pub fn inject_sensor_faults(&self, n: u32) {
        self.with_state(|p| p.sensor_faults = n);
    }

    pub fn cfg(&self) -> &SimCfg {
        &self.cfg
    }

    pub fn sensor(&self) -> SimSensor<C> {
        SimSensor(self.clone())
    }

    pub fn actuator(&self) -> SimActuator<C> {
        SimActuator(self.clone())
    }

    pub fn switches(&self) -> SimSwitches<C> {
        SimSwitches(self.clone())
    }
}

/// xorshift64; uniform in [-0.5, 0.5).
fn next_noise(state: &mut u64) -> f32 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    (x >> 40) as f32 / (1u64 << 24) as f32 - 0.5
}

pub struct SimSensor<C: Clock>(SimRig<C>);

impl<C: Clock + Clone> RangeSensor for SimSensor<C> {
    fn read_raw(&mut self) -> Result<u16, BoxError> {
        let noise_mm = self.0.cfg.noise_mm;
        let reading = self.0.with_state(|p| {
            if p.sensor_faults > 0 {
                p.sensor_faults -= 1;
                return None;
            }
            Some(p.height_mm + next_noise(&mut p.noise) * noise_mm)
        });
        match reading {
            Some(mm) => Ok(self.0.curve.raw_for(mm)),
            None => Err(Box::new(HwError::Sim("adc conversion failed".into()))),
        }
    }
}

pub struct SimActuator<C: Clock>(SimRig<C>);

impl<C: Clock + Clone> Actuator for SimActuator<C> {
    fn set_direction(&mut self, dir: Direction) -> Result<(), BoxError> {
        self.0.with_state(|p| p.direction = dir);
        Ok(())
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), BoxError> {
        self.0.with_state(|p| p.duty = duty);
        Ok(())
    }

    fn set_sleep(&mut self, asleep: bool) -> Result<(), BoxError> {
        self.0.with_state(|p| p.asleep = asleep);
        Ok(())
    }
}

pub struct SimSwitches<C: Clock>(SimRig<C>);

impl<C: Clock + Clone> LimitSwitches for SimSwitches<C> {
    fn top(&self) -> bool {
        self.0.height_mm() >= self.0.cfg.top_stop_mm - SWITCH_BAND_MM
    }

    fn bottom(&self) -> bool {
        self.0.height_mm() <= self.0.cfg.bottom_stop_mm + SWITCH_BAND_MM
    }
}

/// Battery monitor with a settable state of charge. `None` simulates a
/// rejected poll.
#[derive(Debug, Clone)]
pub struct SimBattery {
    soc: Arc<Mutex<Option<f32>>>,
    charging: Arc<AtomicBool>,
}

impl SimBattery {
    pub fn new(soc: f32) -> Self {
        Self {
            soc: Arc::new(Mutex::new(Some(soc))),
            charging: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_soc(&self, soc: f32) {
        *lock(&self.soc) = Some(soc.clamp(0.0, 100.0));
    }

    pub fn set_invalid(&self) {
        *lock(&self.soc) = None;
    }

    pub fn set_charging(&self, v: bool) {
        self.charging.store(v, Ordering::Relaxed);
    }
}

impl BatteryLink for SimBattery {
    fn pack(&mut self) -> Result<Option<PackReading>, BoxError> {
        let charging = self.charging.load(Ordering::Relaxed);
        Ok(lock(&self.soc).map(|soc| PackReading {
            voltage: 22.0 + 0.06 * soc,
            current: if charging { 3.0 } else { -1.2 },
            soc,
        }))
    }

    fn temperature(&mut self) -> Result<Option<TempReading>, BoxError> {
        Ok(lock(&self.soc).map(|_| TempReading {
            min: 23,
            max: 27,
            avg: 25.0,
        }))
    }
}

/// Last state written to the simulated panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelState {
    pub page: Option<u16>,
    pub texts: BTreeMap<u16, String>,
    pub vps: BTreeMap<u16, u16>,
    pub pages_shown: Vec<u16>,
    pub beeps: u32,
}

/// Panel that keeps what it was told and traces every write.
#[derive(Debug, Clone, Default)]
pub struct SimPanel(Arc<Mutex<PanelState>>);

impl SimPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PanelState {
        lock(&self.0).clone()
    }
}

impl DisplaySink for SimPanel {
    fn set_page(&mut self, page: u16) -> Result<(), BoxError> {
        tracing::debug!(page, "panel page");
        let mut s = lock(&self.0);
        s.page = Some(page);
        s.pages_shown.push(page);
        Ok(())
    }

    fn set_text(&mut self, addr: u16, text: &str) -> Result<(), BoxError> {
        tracing::trace!(addr = format_args!("{addr:#06x}"), text, "panel text");
        lock(&self.0).texts.insert(addr, text.to_string());
        Ok(())
    }

    fn set_vp(&mut self, addr: u16, value: u16) -> Result<(), BoxError> {
        tracing::trace!(addr = format_args!("{addr:#06x}"), value, "panel vp");
        lock(&self.0).vps.insert(addr, value);
        Ok(())
    }

    fn beep(&mut self) -> Result<(), BoxError> {
        tracing::debug!("panel beep");
        lock(&self.0).beeps += 1;
        Ok(())
    }
}

/// Host sink that only traces and counts what would go over the wire.
#[derive(Debug, Clone, Default)]
pub struct TraceHost {
    frames: Arc<AtomicU64>,
}

impl TraceHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl HostSink for TraceHost {
    fn send_text(&mut self, text: &str) -> Result<(), BoxError> {
        tracing::debug!(text = text.trim_end(), "host <- text");
        self.frames.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn send_pack(&mut self, reading: Option<PackReading>) -> Result<(), BoxError> {
        tracing::debug!(?reading, "host <- pack");
        self.frames.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn send_temperature(&mut self, reading: Option<TempReading>) -> Result<(), BoxError> {
        tracing::debug!(?reading, "host <- temperature");
        self.frames.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lift_traits::clock::test_clock::TestClock;
    use rstest::rstest;
    use std::time::Duration;

    fn rig() -> (SimRig<TestClock>, TestClock) {
        let clock = TestClock::new();
        let cfg = SimCfg {
            noise_mm: 0.0,
            ..SimCfg::default()
        };
        (SimRig::new(cfg, 1023, clock.clone()), clock)
    }

    #[rstest]
    #[case(4.0)]
    #[case(10.0)]
    #[case(17.5)]
    fn curve_inverts_the_sensor_response(#[case] mm: f32) {
        let c = SensorCurve::default();
        let raw = c.raw_for(mm);
        let volts = f32::from(raw) / f32::from(c.adc_full_scale) * c.adc_ref_v;
        let back = c.gain * volts.powf(c.exponent) - c.offset;
        assert!((back - mm).abs() < 0.05, "{mm} -> {raw} -> {back}");
    }

    #[test]
    fn drives_at_configured_speed_and_stops_at_the_stop() {
        let (rig, clock) = rig();
        let mut act = rig.actuator();
        act.set_direction(Direction::Forward).unwrap();
        act.set_sleep(false).unwrap();
        act.set_duty_cycle(1023).unwrap();
        clock.advance(Duration::from_secs(1));
        assert!((rig.height_mm() - 12.0).abs() < 1e-3);

        clock.advance(Duration::from_secs(10));
        assert!((rig.height_mm() - 17.5).abs() < 1e-3);
        assert!(rig.switches().top());
        assert!(!rig.switches().bottom());
    }

    #[test]
    fn asleep_driver_does_not_move() {
        let (rig, clock) = rig();
        let mut act = rig.actuator();
        act.set_duty_cycle(1023).unwrap();
        clock.advance(Duration::from_secs(2));
        assert!((rig.height_mm() - 10.0).abs() < 1e-6);
        assert!(!rig.is_driving());
    }

    #[test]
    fn injected_faults_fail_reads_then_recover() {
        let (rig, _clock) = rig();
        let mut s = rig.sensor();
        rig.inject_sensor_faults(2);
        assert!(s.read_raw().is_err());
        assert!(s.read_raw().is_err());
        assert_eq!(s.read_raw().unwrap(), SensorCurve::default().raw_for(10.0));
    }

    #[test]
    fn invalid_battery_reports_none() {
        let mut b = SimBattery::new(50.0);
        assert_eq!(b.pack().unwrap().map(|r| r.soc), Some(50.0));
        b.set_invalid();
        assert_eq!(b.pack().unwrap(), None);
        assert_eq!(b.temperature().unwrap(), None);
    }
}
