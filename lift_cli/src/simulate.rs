//! `simulate`: the threaded controller on the simulated rig, in real time.
use std::fs;
use std::path::Path;
use std::time::Duration;

use eyre::WrapErr;
use lift_config::{Config, Scenario, ScenarioAction, load_scenario};
use lift_core::{BootOutcome, ButtonEvent, HostEvent, LiftCfg, LiftHandle, LiftSystem, Flag};
use lift_hardware::{SimBattery, SimPanel, SimRig, TraceHost};
use lift_traits::{Clock, MonotonicClock};
use serde_json::json;

use crate::store::StoreHandle;

const TICK: Duration = Duration::from_millis(10);

pub struct SimulateArgs<'a> {
    pub duration_ms: u64,
    pub scenario: Option<&'a Path>,
    pub soc: f32,
    pub json: bool,
}

pub fn run(cfg: &Config, store: &StoreHandle, args: &SimulateArgs<'_>) -> eyre::Result<()> {
    let scenario = match args.scenario {
        Some(path) => {
            let text = fs::read_to_string(path)
                .wrap_err_with(|| format!("read scenario {}", path.display()))?;
            load_scenario(&text)?
        }
        None => Scenario::default(),
    };

    let lift_cfg = LiftCfg::from(cfg);
    let clock = MonotonicClock::new();
    let rig = SimRig::new(cfg.sim.clone(), lift_cfg.motion.full_duty, clock);
    let panel = SimPanel::new();
    let battery = SimBattery::new(args.soc);
    let host = TraceHost::new();

    let stop = Flag::new();
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.set(true)).wrap_err("install Ctrl-C handler")?;
    }

    tracing::info!(duration_ms = args.duration_ms, steps = scenario.steps.len(), "simulation starting");
    let handle = LiftSystem::builder()
        .with_sensor(rig.sensor())
        .with_actuator(rig.actuator())
        .with_switches(rig.switches())
        .with_battery(battery.clone())
        .with_display(panel.clone())
        .with_host(host.clone())
        .with_store(store.kv())
        .with_config(lift_cfg)
        .try_build()?
        .start()?;

    let epoch = clock.now();
    let mut steps = scenario.steps.into_iter().peekable();
    let mut applied = 0usize;
    loop {
        let t = clock.ms_since(epoch);
        if stop.get() || t >= args.duration_ms {
            break;
        }
        while let Some(step) = steps.next_if(|s| s.at_ms <= t) {
            apply(&handle, &battery, step.action);
            applied += 1;
        }
        clock.sleep(TICK.min(Duration::from_millis(args.duration_ms - t)));
    }
    let interrupted = stop.get();

    let shared = handle.shared().clone();
    let boot = handle.boot_outcome();
    let dropped = handle.bus().dropped_total();
    handle.shutdown();

    let bounds = shared.bounds.load();
    let screen = panel.snapshot();
    let summary = json!({
        "boot": boot_name(boot),
        "bottom_mm": bounds.map(|b| b.bottom_mm),
        "top_mm": bounds.map(|b| b.top_mm),
        "height_mm": shared.height.get(),
        "rig_height_mm": rig.height_mm(),
        "locked_out": shared.lockout.get(),
        "host_connected": shared.host_connected.get(),
        "page": screen.page,
        "pages_shown": screen.pages_shown.len(),
        "host_frames": host.frames(),
        "steps_applied": applied,
        "dropped": dropped,
        "interrupted": interrupted,
    });

    if args.json {
        println!("{summary}");
    } else {
        println!("boot: {}", boot_name(boot));
        match bounds {
            Some(b) => println!("bounds: {:.2} .. {:.2} mm", b.bottom_mm, b.top_mm),
            None => println!("bounds: none"),
        }
        println!("height: {:.2} mm (rig {:.2} mm)", shared.height.get(), rig.height_mm());
        println!(
            "page: {}  host connected: {}  locked out: {}",
            screen.page.map_or_else(|| "-".to_string(), |p| p.to_string()),
            shared.host_connected.get(),
            shared.lockout.get()
        );
        println!("scenario steps applied: {applied}  dropped messages: {dropped}");
        println!("simulation complete");
    }
    Ok(())
}

fn apply(handle: &LiftHandle, battery: &SimBattery, action: ScenarioAction) {
    tracing::debug!(?action, "scenario step");
    match action {
        ScenarioAction::Button { vp, code, value } => match ButtonEvent::from_vp_code(vp, code, value) {
            Some(ev) => handle.press(ev),
            None => tracing::warn!(vp, code, "unknown panel code in scenario"),
        },
        ScenarioAction::Soc { soc } => battery.set_soc(soc),
        ScenarioAction::HostMetrics { values } => handle.host_event(HostEvent::Metrics(values)),
        ScenarioAction::HostName { name } => handle.host_event(HostEvent::DeviceName(name)),
        ScenarioAction::HostText { text } => handle.host_event(HostEvent::Text(text)),
    }
}

pub fn boot_name(boot: BootOutcome) -> &'static str {
    match boot {
        BootOutcome::Restored(_) => "restored",
        BootOutcome::Calibrated(_) => "calibrated",
        BootOutcome::Uncalibrated => "uncalibrated",
    }
}
