//! `self-check` and `health`.
use lift_config::Config;
use lift_core::config::EstimatorCfg;
use lift_core::{HeightSampler, LiftError, Settings, SharedState};
use lift_hardware::SimRig;
use lift_traits::clock::test_clock::TestClock;
use lift_ui::Theme;
use serde_json::json;

use crate::store::StoreHandle;

const PROBE_BATCHES: usize = 5;
/// Largest accepted gap between the probed and the true rig height (mm).
const PROBE_TOLERANCE_MM: f32 = 1.0;

pub fn self_check(cfg: &Config, store: &StoreHandle, json: bool) -> eyre::Result<()> {
    let probed = probe_sim_sensor(cfg)?;
    let settings = Settings::new(store.kv());
    // a read failure is logged by Settings and shows up as "no theme stored"
    let theme = settings.theme();
    let hw = hardware_probe(cfg)?;

    if json {
        println!(
            "{}",
            json!({
                "status": "ok",
                "config": "valid",
                "store": store.describe(),
                "sensor_path_mm": probed,
                "hardware": hw,
                "theme": theme_name(theme),
            })
        );
    } else {
        println!("config: valid");
        println!("store: {}", store.describe());
        println!("sensor path: {probed:.1} mm (simulated)");
        if let Some(raw) = hw {
            println!("hardware ADC: raw {raw}");
        }
        println!("self-check ok");
    }
    Ok(())
}

/// Sample the simulated rig at rest and check the estimator lands on it.
fn probe_sim_sensor(cfg: &Config) -> eyre::Result<f32> {
    let clock = TestClock::new();
    let rig = SimRig::new(cfg.sim.clone(), cfg.motion.full_duty, clock.clone());
    let (_shared, writer) = SharedState::new(Theme::default());
    let mut sampler = HeightSampler::new(rig.sensor(), EstimatorCfg::from(&cfg.sampling), writer, clock);

    let mut last = None;
    for _ in 0..PROBE_BATCHES {
        last = sampler.sample_batch().or(last);
    }
    let Some(h) = last else {
        return Err(LiftError::HardwareFault("no valid sensor reading".into()).into());
    };
    let truth = rig.height_mm();
    if (h - truth).abs() > PROBE_TOLERANCE_MM {
        return Err(LiftError::HardwareFault(format!(
            "estimated {h:.2} mm but the rig is at {truth:.2} mm; check [sampling] curve values"
        ))
        .into());
    }
    Ok(h)
}

#[cfg(feature = "hardware")]
fn hardware_probe(cfg: &Config) -> eyre::Result<Option<u16>> {
    use lift_traits::RangeSensor;

    let Some(pins) = cfg.pins.as_ref() else {
        return Ok(None);
    };
    let mut adc = lift_hardware::rpi::Mcp3208::new(pins.adc_channel)?;
    let raw = adc
        .read_raw()
        .map_err(|e| LiftError::Hardware(format!("ADC read: {e}")))?;
    Ok(Some(raw))
}

#[cfg(not(feature = "hardware"))]
#[allow(clippy::unnecessary_wraps)]
fn hardware_probe(_cfg: &Config) -> eyre::Result<Option<u16>> {
    Ok(None)
}

pub fn health(cfg: &Config, store: &StoreHandle, json: bool) -> eyre::Result<()> {
    let settings = Settings::new(store.kv());
    let bounds = settings.load_bounds(cfg.limits.hard_floor_mm, cfg.limits.hard_ceiling_mm);
    let theme = settings.theme();
    let device_name = settings
        .device_name()
        .unwrap_or_else(|| cfg.host.default_device_name.clone());
    let status = if bounds.is_some() { "ok" } else { "uncalibrated" };

    if json {
        println!(
            "{}",
            json!({
                "status": status,
                "bottom_mm": bounds.map(|b| b.bottom_mm),
                "top_mm": bounds.map(|b| b.top_mm),
                "theme": theme_name(theme),
                "device_name": device_name,
                "store": store.describe(),
                "stored_keys": store.keys(),
                "sampling": {
                    "batch_size": cfg.sampling.batch_size,
                    "period_ms": cfg.sampling.period_ms,
                },
                "bus_capacity": cfg.bus.capacity,
            })
        );
    } else {
        println!("status: {status}");
        match bounds {
            Some(b) => println!("bounds: {:.2} .. {:.2} mm", b.bottom_mm, b.top_mm),
            None => println!("bounds: none (run `lift calibrate`)"),
        }
        println!("theme: {}", theme_name(theme));
        println!("device name: {device_name}");
        println!("store: {} ({} keys)", store.describe(), store.keys().len());
    }
    Ok(())
}

fn theme_name(theme: Theme) -> &'static str {
    match theme {
        Theme::Primary => "primary",
        Theme::Alternate => "alternate",
    }
}
