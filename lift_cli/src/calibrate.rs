//! `calibrate`: one full calibration run outside the threaded runner.
//!
//! Without the `hardware` feature (or without `[pins]`) the simulated rig
//! runs on a manually advanced clock, so the run takes no wall time.
use lift_config::Config;
use lift_core::{
    ActuatorDriver, Bounds, EventBus, HeightSampler, LiftCfg, LiftError, LimitSensor, MotionController,
    Settings, SharedState,
};
use lift_hardware::SimRig;
use lift_traits::clock::test_clock::TestClock;
use lift_traits::{Actuator, Clock, LimitSwitches, RangeSensor};
use serde_json::json;

use crate::store::StoreHandle;

pub fn run(cfg: &Config, store: &StoreHandle, json: bool) -> eyre::Result<()> {
    let lift_cfg = LiftCfg::from(cfg);
    let settings = Settings::new(store.kv());

    let (backend, bounds) = measure(cfg, &lift_cfg, settings)?;
    let Some(bounds) = bounds else {
        return Err(LiftError::State("calibration did not produce usable bounds".into()).into());
    };
    tracing::info!(backend, bottom = bounds.bottom_mm, top = bounds.top_mm, "calibrated");

    if json {
        println!(
            "{}",
            json!({
                "backend": backend,
                "bottom_mm": bounds.bottom_mm,
                "top_mm": bounds.top_mm,
                "center_mm": bounds.center_mm(),
                "store": store.describe(),
            })
        );
    } else {
        println!("backend: {backend}");
        println!("bottom: {:.3} mm", bounds.bottom_mm);
        println!("top: {:.3} mm", bounds.top_mm);
        println!("saved to: {}", store.describe());
    }
    Ok(())
}

#[cfg(feature = "hardware")]
fn measure(cfg: &Config, lift_cfg: &LiftCfg, settings: Settings) -> eyre::Result<(&'static str, Option<Bounds>)> {
    use lift_hardware::rpi::{Mcp3208, ProximitySwitches, PwmActuator};
    use lift_traits::MonotonicClock;

    let Some(pins) = cfg.pins.as_ref() else {
        return Ok(("sim", simulated(cfg, lift_cfg, settings)));
    };
    let sensor = Mcp3208::new(pins.adc_channel)?;
    let actuator = PwmActuator::new(pins, lift_cfg.motion.full_duty)?;
    let switches = ProximitySwitches::new(pins)?;
    Ok((
        "hardware",
        calibrate_with(sensor, actuator, switches, MonotonicClock::new(), lift_cfg, settings),
    ))
}

#[cfg(not(feature = "hardware"))]
fn measure(cfg: &Config, lift_cfg: &LiftCfg, settings: Settings) -> eyre::Result<(&'static str, Option<Bounds>)> {
    if cfg.pins.is_some() {
        tracing::warn!("[pins] ignored: built without the `hardware` feature");
    }
    Ok(("sim", simulated(cfg, lift_cfg, settings)))
}

fn simulated(cfg: &Config, lift_cfg: &LiftCfg, settings: Settings) -> Option<Bounds> {
    let clock = TestClock::new();
    let rig = SimRig::new(cfg.sim.clone(), lift_cfg.motion.full_duty, clock.clone());
    calibrate_with(rig.sensor(), rig.actuator(), rig.switches(), clock, lift_cfg, settings)
}

fn calibrate_with<S, A, L, C>(
    sensor: S,
    actuator: A,
    switches: L,
    clock: C,
    cfg: &LiftCfg,
    settings: Settings,
) -> Option<Bounds>
where
    S: RangeSensor,
    A: Actuator,
    L: LimitSwitches,
    C: Clock + Clone,
{
    let (shared, writer) = SharedState::new(settings.theme());
    let bus = EventBus::new(cfg.bus_capacity);
    let mut sampler = HeightSampler::new(sensor, cfg.estimator.clone(), writer, clock.clone());
    let limits = LimitSensor::new(switches, shared.height.clone(), shared.bounds.clone(), cfg.limits.clone());
    let driver = ActuatorDriver::new(actuator, cfg.motion.full_duty, shared.lockout.clone());
    let mut ctl = MotionController::new(
        driver,
        limits,
        shared,
        settings,
        bus.motor.clone(),
        bus.display.clone(),
        cfg.motion.clone(),
        clock,
    );
    sampler.sample_batch();
    ctl.calibrate(&mut sampler, None)
}
