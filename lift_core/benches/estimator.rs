use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use lift_core::HeightEstimator;
use lift_core::config::EstimatorCfg;

// Raw ADC batches around a slowly moving height, with spikes.
fn synth_batches(n: usize, batch: usize, seed: u32) -> Vec<Vec<u16>> {
    let mut state = seed.max(1);
    let mut next = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        x
    };
    (0..n)
        .map(|i| {
            let base = 1500.0 + 600.0 * (i as f32 / 400.0).sin();
            (0..batch)
                .map(|_| {
                    let r = next();
                    let jitter = (r % 21) as f32 - 10.0;
                    if r % 97 == 0 { 4095 } else { (base + jitter) as u16 }
                })
                .collect()
        })
        .collect()
}

pub fn bench_push_batch(c: &mut Criterion) {
    let mut g = c.benchmark_group("height_estimator");
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p lift_core --bench estimator
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    for &batch in &[5usize, 11, 31] {
        let batches = synth_batches(2_000, batch, 0xC0FFEE);
        g.bench_function(format!("push_batch_{batch}"), |b| {
            b.iter_batched(
                || HeightEstimator::new(EstimatorCfg { batch_size: batch, ..EstimatorCfg::default() }),
                |mut est| {
                    for raws in &batches {
                        black_box(est.push_batch(black_box(raws)));
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }
    g.finish();
}

criterion_group!(estimator, bench_push_batch);
criterion_main!(estimator);
