use lift_core::config::{EstimatorCfg, LimitCfg};
use lift_core::limits::{LimitPhase, bottom_reached, top_reached};
use lift_core::{Bounds, HeightEstimator, PositionStep};
use proptest::prelude::*;

prop_compose! {
    fn bounds_strategy()(bottom in 3.0f32..8.0, span in 5.0f32..12.0) -> Bounds {
        Bounds::new(bottom, bottom + span).unwrap()
    }
}

proptest! {
    #[test]
    fn committed_index_moves_at_most_one_step(
        b in bounds_strategy(),
        res in 2u8..30,
        heights in prop::collection::vec(0.0f32..25.0, 1..200),
    ) {
        let mut step = PositionStep::new(res);
        let mut prev: Option<u8> = None;
        for h in heights {
            let idx = step.update(h, b);
            prop_assert!((1..=res).contains(&idx));
            if let Some(p) = prev {
                prop_assert!(idx.abs_diff(p) <= 1, "{p} -> {idx} at {h}");
            }
            prev = Some(idx);
        }
    }

    #[test]
    fn heights_inside_the_band_keep_the_index(
        b in bounds_strategy(),
        res in 2u8..30,
        start in 0.0f32..1.0,
        wiggle in prop::collection::vec(0.01f32..0.99, 1..100),
    ) {
        let mut step = PositionStep::new(res);
        let h0 = b.bottom_mm + start * b.span_mm();
        let idx = step.update(h0, b);
        let (low, high) = step.band(idx, b);
        for w in wiggle {
            let h = low + w * (high - low);
            prop_assert_eq!(step.update(h, b), idx);
        }
    }

    #[test]
    fn one_outlier_never_moves_the_median(
        value in 3.0f32..20.0,
        outlier in -100.0f32..100.0,
        n in 3usize..25,
        at in 0usize..25,
    ) {
        let mut v = vec![value; n];
        v[at % n] = outlier;
        prop_assert_eq!(HeightEstimator::median(&mut v), Some(value));
    }

    #[test]
    fn a_spike_in_a_raw_batch_keeps_the_clean_median(
        raws in prop::collection::btree_set(200u16..4000, 11),
        high in any::<bool>(),
        spike_high in 4000u16..=4095,
        spike_low in 125u16..200,
        pick in 0usize..5,
    ) {
        let clean: Vec<u16> = raws.into_iter().collect();
        let mut spiked = clean.clone();
        // replace a reading on the same side of the median as the spike
        if high {
            spiked[6 + pick] = spike_high;
        } else {
            spiked[pick] = spike_low;
        }

        let expected = HeightEstimator::new(EstimatorCfg::default()).push_batch(&clean);
        let got = HeightEstimator::new(EstimatorCfg::default()).push_batch(&spiked);
        prop_assert!(expected.is_some());
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn a_spike_anywhere_stays_between_the_clean_neighbours(
        raws in prop::collection::btree_set(200u16..4000, 11),
        spike in prop_oneof![125u16..200, 4000u16..=4095],
        at in 0usize..11,
    ) {
        let est = HeightEstimator::new(EstimatorCfg::default());
        let mut mm: Vec<f32> = raws.iter().map(|&r| est.raw_to_mm(r).unwrap()).collect();
        mm.sort_by(f32::total_cmp);

        let mut spiked: Vec<u16> = raws.into_iter().collect();
        spiked[at] = spike;
        let got = HeightEstimator::new(EstimatorCfg::default()).push_batch(&spiked).unwrap();
        prop_assert!(got >= lift_core::util::round_tenth(mm[4]) - 1e-4, "{got} below {}", mm[4]);
        prop_assert!(got <= lift_core::util::round_tenth(mm[6]) + 1e-4, "{got} above {}", mm[6]);
    }

    #[test]
    fn smoother_follows_the_recurrence(medians in prop::collection::vec(3.0f32..20.0, 1..50)) {
        let cfg = EstimatorCfg::default();
        let retain = cfg.retain;
        let mut est = HeightEstimator::new(cfg);
        let mut expected: Option<f32> = None;
        for m in medians {
            let out = est.smooth(m);
            let next = match expected {
                None => m,
                Some(p) => retain * p + (1.0 - retain) * m,
            };
            expected = Some(next);
            let state = est.smoothed().unwrap();
            prop_assert!((state - next).abs() < 1e-4);
            prop_assert!((out - next).abs() <= 0.05 + 1e-4);
        }
    }

    #[test]
    fn switches_always_stop_travel(h in 0.0f32..25.0, b in bounds_strategy()) {
        let cfg = LimitCfg::default();
        for phase in [LimitPhase::Normal, LimitPhase::Calibrating, LimitPhase::FirstBoot] {
            prop_assert!(bottom_reached(true, h, Some(b), phase, &cfg));
            prop_assert!(top_reached(true, h, Some(b), phase, &cfg));
        }
    }

    #[test]
    fn soft_bounds_apply_outside_calibration(h in 0.0f32..25.0, b in bounds_strategy()) {
        let cfg = LimitCfg::default();
        let bottom = bottom_reached(false, h, Some(b), LimitPhase::Normal, &cfg);
        let top = top_reached(false, h, Some(b), LimitPhase::Normal, &cfg);
        prop_assert_eq!(bottom, h <= b.bottom_mm + cfg.bottom_tolerance_mm || h <= cfg.hard_floor_mm);
        prop_assert_eq!(top, h >= b.top_mm - cfg.top_tolerance_mm || h >= cfg.hard_ceiling_mm);
    }
}
