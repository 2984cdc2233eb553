//! Height estimation: raw ADC batches to one filtered height.
//!
//! Two stages run on every batch:
//! 1. the upper median of the valid samples rejects single-sample spikes;
//! 2. exponential smoothing against the previous output removes jitter.
//!
//! The first batch seeds the smoother directly. Published heights are
//! rounded to 0.1 mm; the smoother itself keeps full precision.
use crate::config::EstimatorCfg;
use crate::hw_error::map_hw_error;
use crate::shared::{Flag, HeightReader, HeightWriter};
use lift_traits::RangeSensor;
use lift_traits::clock::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct HeightEstimator {
    cfg: EstimatorCfg,
    smoothed: Option<f32>,
    scratch: Vec<f32>,
}

impl HeightEstimator {
    pub fn new(cfg: EstimatorCfg) -> Self {
        let cap = cfg.batch_size;
        Self {
            cfg,
            smoothed: None,
            scratch: Vec::with_capacity(cap),
        }
    }

    /// Convert one raw conversion to millimetres. `None` marks a reading
    /// below the noise floor.
    pub fn raw_to_mm(&self, raw: u16) -> Option<f32> {
        let c = &self.cfg;
        let v = f32::from(raw) / f32::from(c.adc_full_scale.max(1)) * c.adc_ref_v;
        if v < c.noise_floor_v {
            return None;
        }
        Some(c.curve_gain * v.powf(c.curve_exponent) - c.curve_offset)
    }

    /// Upper median (`v[n / 2]` after sorting). `None` for an empty slice.
    pub fn median(samples: &mut [f32]) -> Option<f32> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_by(f32::total_cmp);
        Some(samples[samples.len() / 2])
    }

    /// Fold one median into the smoother and return the rounded output.
    pub fn smooth(&mut self, median: f32) -> f32 {
        let next = match self.smoothed {
            None => median,
            Some(prev) => self.cfg.retain * prev + (1.0 - self.cfg.retain) * median,
        };
        self.smoothed = Some(next);
        crate::util::round_tenth(next)
    }

    /// Filter one batch of raw readings. Invalid readings are excluded;
    /// a batch without any valid reading leaves the state untouched.
    pub fn push_batch(&mut self, raws: &[u16]) -> Option<f32> {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        scratch.extend(raws.iter().filter_map(|&r| self.raw_to_mm(r)));
        let median = Self::median(&mut scratch);
        self.scratch = scratch;
        median.map(|m| self.smooth(m))
    }

    /// Unrounded smoother state.
    pub fn smoothed(&self) -> Option<f32> {
        self.smoothed
    }

    pub fn cfg(&self) -> &EstimatorCfg {
        &self.cfg
    }
}

/// Something that can bring the published height up to date on demand.
///
/// The motion controller calls `tick` on every poll of its travel loops and
/// `refresh` where calibration needs a guaranteed fresh value.
pub trait HeightSource {
    /// Take a batch now and publish it.
    fn refresh(&mut self);
    /// Take a batch only if the sampling period has elapsed.
    fn tick(&mut self);
}

/// Height is produced elsewhere (the sampler thread); nothing to do inline.
#[derive(Debug, Default, Clone, Copy)]
pub struct Published;

impl HeightSource for Published {
    fn refresh(&mut self) {}
    fn tick(&mut self) {}
}

/// Owns the range sensor and the estimator; sole writer of the height cell.
pub struct HeightSampler<S: RangeSensor, C: Clock> {
    sensor: S,
    estimator: HeightEstimator,
    writer: HeightWriter,
    clock: C,
    batch: Vec<u16>,
    epoch: Instant,
    last_batch: Option<Instant>,
    last_ok: Arc<AtomicU64>,
}

impl<S: RangeSensor, C: Clock> HeightSampler<S, C> {
    pub fn new(sensor: S, cfg: EstimatorCfg, writer: HeightWriter, clock: C) -> Self {
        let epoch = clock.now();
        Self {
            batch: Vec::with_capacity(cfg.batch_size),
            sensor,
            estimator: HeightEstimator::new(cfg),
            writer,
            clock,
            epoch,
            last_batch: None,
            last_ok: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Read one batch, filter it and publish the result.
    pub fn sample_batch(&mut self) -> Option<f32> {
        let cfg = self.estimator.cfg().clone();
        let gap = Duration::from_millis(cfg.inter_sample_ms);
        self.batch.clear();
        for i in 0..cfg.batch_size {
            match self.sensor.read_raw() {
                Ok(raw) => self.batch.push(raw),
                Err(e) => {
                    // counted as an invalid sample
                    tracing::trace!(error = %map_hw_error(&*e), "range sensor read failed");
                }
            }
            if i + 1 < cfg.batch_size {
                self.clock.sleep(gap);
            }
        }
        self.last_batch = Some(self.clock.now());
        let out = self.estimator.push_batch(&self.batch);
        match out {
            Some(mm) => {
                self.writer.publish(mm);
                self.last_ok
                    .store(self.clock.ms_since(self.epoch), Ordering::Relaxed);
                tracing::trace!(height_mm = mm, valid = self.batch.len(), "height sample");
            }
            None => {
                tracing::debug!("no valid sample in batch; keeping previous height");
            }
        }
        out
    }

    pub fn reader(&self) -> HeightReader {
        self.writer.reader()
    }

    pub fn estimator(&self) -> &HeightEstimator {
        &self.estimator
    }

    fn period(&self) -> Duration {
        Duration::from_millis(self.estimator.cfg().period_ms)
    }
}

impl<S: RangeSensor, C: Clock> HeightSource for HeightSampler<S, C> {
    fn refresh(&mut self) {
        self.sample_batch();
    }

    fn tick(&mut self) {
        let due = match self.last_batch {
            None => true,
            Some(t) => self.clock.now().saturating_duration_since(t) >= self.period(),
        };
        if due {
            self.sample_batch();
        }
    }
}

impl<S, C> HeightSampler<S, C>
where
    S: RangeSensor + Send + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Move the sampler onto its own thread, one batch per period.
    pub fn spawn(mut self) -> SamplerThread {
        let shutdown = Flag::new();
        let shutdown_clone = shutdown.clone();
        let last_ok = self.last_ok.clone();
        let epoch = self.epoch;
        let period = self.period();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.get() {
                    tracing::debug!("height sampler received shutdown signal");
                    break;
                }
                self.sample_batch();
                if shutdown_clone.get() {
                    break;
                }
                self.clock.sleep(period);
            }
            tracing::trace!("height sampler exiting cleanly");
        });

        SamplerThread {
            last_ok,
            epoch,
            shutdown,
            join_handle: Some(join_handle),
        }
    }
}

/// Running sampler; the thread is stopped and joined on drop.
pub struct SamplerThread {
    last_ok: Arc<AtomicU64>,
    epoch: Instant,
    shutdown: Flag,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl SamplerThread {
    /// Milliseconds since the last batch that produced a height.
    pub fn stalled_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }

    pub fn stalled_for_now(&self) -> u64 {
        let now_ms = Instant::now().saturating_duration_since(self.epoch).as_millis();
        self.stalled_for(u64::try_from(now_ms).unwrap_or(u64::MAX))
    }
}

impl Drop for SamplerThread {
    fn drop(&mut self) {
        self.shutdown.set(true);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("height sampler joined"),
                Err(e) => tracing::warn!(?e, "height sampler panicked during shutdown"),
            }
        }
    }
}
