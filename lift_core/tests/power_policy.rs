use lift_core::config::PowerCfg;
use lift_core::{Flag, PowerSafetyMonitor, SocVerdict};
use rstest::rstest;

use SocVerdict::{Alert, Lockout, Steady, Unlocked};

fn run(socs: &[f32]) -> Vec<SocVerdict> {
    let mut m = PowerSafetyMonitor::new(PowerCfg::default(), Flag::new());
    socs.iter().map(|&s| m.observe(s)).collect()
}

#[rstest]
#[case::first_reading_never_alerts(&[25.0, 60.0], &[Steady, Steady])]
#[case::first_alert_below_thirty(&[50.0, 31.0, 29.5], &[Steady, Steady, Alert])]
#[case::steps_of_five_below_the_last_alert(
    &[40.0, 29.5, 27.0, 24.9, 20.0, 19.9, 14.0],
    &[Steady, Alert, Steady, Alert, Steady, Steady, Alert],
)]
#[case::quiet_band_above_lockout(&[40.0, 29.0, 24.0, 14.0, 9.0, 4.0], &[Steady, Alert, Alert, Alert, Steady, Steady])]
#[case::lockout_fires_once(&[10.0, 2.5, 2.0, 1.0], &[Steady, Lockout, Steady, Steady])]
#[case::recovery_unlocks_then_relocks(&[10.0, 2.5, 3.0, 2.9], &[Steady, Lockout, Unlocked, Lockout])]
#[case::charging_is_silent(&[20.0, 21.0, 25.0, 29.0], &[Steady, Steady, Steady, Steady])]
fn soc_sequences(#[case] socs: &[f32], #[case] expected: &[SocVerdict]) {
    assert_eq!(run(socs), expected);
}

#[test]
fn lock_bit_tracks_the_monitor() {
    let flag = Flag::new();
    let mut m = PowerSafetyMonitor::new(PowerCfg::default(), flag.clone());
    m.observe(2.0);
    assert!(flag.get());
    assert_eq!(m.poll_ms(), PowerCfg::default().fast_poll_ms);
    m.observe(12.0);
    assert!(!flag.get());
    assert_eq!(m.last_alert(), Some(10.0));
    assert_eq!(m.poll_ms(), PowerCfg::default().slow_poll_ms);
}
