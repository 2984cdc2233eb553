#![no_main]
use libfuzzer_sys::fuzz_target;
use lift_core::HeightEstimator;
use lift_core::config::EstimatorCfg;

fuzz_target!(|batches: Vec<Vec<u16>>| {
    let mut est = HeightEstimator::new(EstimatorCfg::default());
    let mut last = None;
    for raws in &batches {
        match est.push_batch(raws) {
            Some(mm) => {
                assert!(mm.is_finite(), "{mm} from {raws:?}");
                last = Some(mm);
            }
            // an all-invalid batch keeps the previous output
            None => assert_eq!(est.smoothed().is_some(), last.is_some()),
        }
    }
});
