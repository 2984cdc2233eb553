//! Boot and calibration against the simulated rig, on a manual clock.
use std::sync::Arc;

use lift_config::SimCfg;
use lift_core::config::{EstimatorCfg, LimitCfg, MotionCfg};
use lift_core::mocks::{MemoryStore, RecordingDisplay};
use lift_core::{
    ActuatorDriver, BootOutcome, EventBus, HeightSampler, LimitSensor, MotionController, MotionState,
    MotorCommand, Settings, SharedState,
};
use lift_hardware::SimRig;
use lift_hardware::sim::{SimActuator, SimSensor, SimSwitches};
use lift_traits::KvStore;
use lift_traits::clock::test_clock::TestClock;
use lift_ui::Theme;

type Controller = MotionController<SimActuator<TestClock>, SimSwitches<TestClock>, TestClock>;

struct Bench {
    rig: SimRig<TestClock>,
    sampler: HeightSampler<SimSensor<TestClock>, TestClock>,
    ctl: Controller,
    shared: SharedState,
    store: Arc<MemoryStore>,
}

fn bench(store: Arc<MemoryStore>) -> Bench {
    let clock = TestClock::new();
    let rig = SimRig::new(SimCfg::default(), 1023, clock.clone());
    let (shared, writer) = SharedState::new(Theme::Primary);
    let bus = EventBus::default();
    let sampler = HeightSampler::new(rig.sensor(), EstimatorCfg::default(), writer, clock.clone());
    let ctl = MotionController::new(
        ActuatorDriver::new(rig.actuator(), 1023, shared.lockout.clone()),
        LimitSensor::new(rig.switches(), shared.height.clone(), shared.bounds.clone(), LimitCfg::default()),
        shared.clone(),
        Settings::new(store.clone()),
        bus.motor.clone(),
        bus.display.clone(),
        MotionCfg::default(),
        clock,
    );
    Bench {
        rig,
        sampler,
        ctl,
        shared,
        store,
    }
}

#[test]
fn first_boot_calibrates_persists_and_parks_low() {
    let mut b = bench(Arc::new(MemoryStore::new()));
    let mut panel = RecordingDisplay::new();

    let outcome = b.ctl.boot(&mut b.sampler, &mut panel);

    let BootOutcome::Calibrated(bounds) = outcome else {
        panic!("expected a calibration, got {outcome:?}");
    };
    assert!(bounds.bottom_mm < bounds.top_mm);
    assert!((3.9..5.5).contains(&bounds.bottom_mm), "bottom {}", bounds.bottom_mm);
    assert!((17.0..17.7).contains(&bounds.top_mm), "top {}", bounds.top_mm);

    assert_eq!(b.store.load_float("limit_bottom").unwrap(), Some(bounds.bottom_mm));
    assert_eq!(b.store.load_float("limit_top").unwrap(), Some(bounds.top_mm));
    assert_eq!(b.shared.bounds.load(), Some(bounds));

    assert!(b.rig.height_mm() < 4.2, "parked at {}", b.rig.height_mm());
    assert!(!b.rig.is_driving());
    assert_eq!(panel.pages(), vec![15, 21]);
    assert_eq!(b.ctl.state(), MotionState::Idle);
}

#[test]
fn stored_bounds_skip_calibration() {
    let store = Arc::new(MemoryStore::new());
    store.save_float("limit_bottom", 4.1).unwrap();
    store.save_float("limit_top", 17.4).unwrap();
    let mut b = bench(store);
    let mut panel = RecordingDisplay::new();

    let outcome = b.ctl.boot(&mut b.sampler, &mut panel);

    assert!(matches!(outcome, BootOutcome::Restored(_)));
    assert!(panel.pages().is_empty());
    assert!((b.rig.height_mm() - 10.0).abs() < 1e-6);
}

#[test]
fn out_of_range_bounds_trigger_first_boot_calibration() {
    let store = Arc::new(MemoryStore::new());
    store.save_float("limit_bottom", 1.0).unwrap();
    store.save_float("limit_top", 17.4).unwrap();
    let mut b = bench(store);
    let mut panel = RecordingDisplay::new();

    assert!(matches!(b.ctl.boot(&mut b.sampler, &mut panel), BootOutcome::Calibrated(_)));
}

#[test]
fn recalibration_ends_near_the_center() {
    let mut b = bench(Arc::new(MemoryStore::new()));
    let mut panel = RecordingDisplay::new();
    b.ctl.boot(&mut b.sampler, &mut panel);

    b.ctl.handle(MotorCommand::Calibrate, &mut b.sampler);

    let bounds = b.shared.bounds.load().unwrap();
    let center = bounds.center_mm();
    assert!((b.rig.height_mm() - center).abs() < 2.0, "{} vs {center}", b.rig.height_mm());
    assert_eq!(b.ctl.state(), MotionState::Idle);
    assert!(!b.rig.is_driving());
}
