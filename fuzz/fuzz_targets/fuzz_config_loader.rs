#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = lift_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // a validated config must convert without surprises
            let lift = lift_core::LiftCfg::from(&cfg);
            assert!(lift.bus_capacity >= 1);
            assert!(lift.estimator.batch_size >= 1);
        }
    }
});
