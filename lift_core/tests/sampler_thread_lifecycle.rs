//! Sampler thread start-up, publishing and clean shutdown.
use std::time::{Duration, Instant};

use lift_core::config::EstimatorCfg;
use lift_core::mocks::ScriptedSensor;
use lift_core::{HeightSampler, SharedState};
use lift_traits::clock::MonotonicClock;
use lift_ui::Theme;

fn fast_cfg() -> EstimatorCfg {
    EstimatorCfg {
        batch_size: 5,
        inter_sample_ms: 1,
        period_ms: 10,
        ..EstimatorCfg::default()
    }
}

#[test]
fn sampler_publishes_and_exits_on_drop() {
    let (shared, writer) = SharedState::new(Theme::Primary);
    let sampler = HeightSampler::new(ScriptedSensor::constant(1500), fast_cfg(), writer, MonotonicClock::new());
    let running = sampler.spawn();

    let deadline = Instant::now() + Duration::from_secs(2);
    while shared.height.get() == 0.0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!((shared.height.get() - 9.7).abs() < 1e-3, "height {}", shared.height.get());
    assert!(running.stalled_for_now() < 1_000);

    drop(running);
}

#[test]
fn failing_sensor_keeps_height_and_reports_stall() {
    let (shared, writer) = SharedState::new(Theme::Primary);
    let sampler = HeightSampler::new(ScriptedSensor::new([None]), fast_cfg(), writer, MonotonicClock::new());
    let running = sampler.spawn();
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(shared.height.get(), 0.0);
    assert!(running.stalled_for_now() >= 50);
}

#[test]
fn repeated_spawn_and_drop_does_not_hang() {
    for _ in 0..10 {
        let (_shared, writer) = SharedState::new(Theme::Primary);
        let sampler = HeightSampler::new(ScriptedSensor::constant(2000), fast_cfg(), writer, MonotonicClock::new());
        let running = sampler.spawn();
        std::thread::sleep(Duration::from_millis(5));
        drop(running);
    }
}
