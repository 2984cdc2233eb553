#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(sc) = lift_config::load_scenario(data) {
        assert!(sc.steps.windows(2).all(|w| w[0].at_ms <= w[1].at_ms));
    }
});
