//! Runtime configuration types for the lift controller.
//!
//! These are the structs the core components are built from. They are
//! separate from the TOML-deserialized config in `lift_config`; see
//! `conversions` for the mapping.

/// Height estimator: sampling cadence and sensor conversion.
#[derive(Debug, Clone)]
pub struct EstimatorCfg {
    /// Raw readings per batch.
    pub batch_size: usize,
    /// Pause between the raw readings of one batch (ms).
    pub inter_sample_ms: u64,
    /// Pause between batches (ms).
    pub period_ms: u64,
    /// Readings below this voltage are discarded.
    pub noise_floor_v: f32,
    pub adc_full_scale: u16,
    pub adc_ref_v: f32,
    pub curve_gain: f32,
    pub curve_exponent: f32,
    pub curve_offset: f32,
    /// Weight of the previous smoothed value; the median gets `1 - retain`.
    pub retain: f32,
}

impl Default for EstimatorCfg {
    fn default() -> Self {
        Self {
            batch_size: 11,
            inter_sample_ms: 5,
            period_ms: 200,
            noise_floor_v: 0.1,
            adc_full_scale: 4095,
            adc_ref_v: 3.3,
            curve_gain: 12.08,
            curve_exponent: -1.058,
            curve_offset: 0.20,
            retain: 0.7,
        }
    }
}

/// Soft tolerances around the calibrated bounds and absolute hard limits (mm).
#[derive(Debug, Clone)]
pub struct LimitCfg {
    pub bottom_tolerance_mm: f32,
    pub top_tolerance_mm: f32,
    pub hard_floor_mm: f32,
    pub hard_ceiling_mm: f32,
}

impl Default for LimitCfg {
    fn default() -> Self {
        Self {
            bottom_tolerance_mm: 0.5,
            top_tolerance_mm: 0.1,
            hard_floor_mm: 3.0,
            hard_ceiling_mm: 20.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MotionCfg {
    pub poll_ms: u64,
    pub arrive_tolerance_mm: f32,
    pub settle_ms: u64,
    /// First-boot descent without position feedback.
    pub park_ms: u64,
    pub converge_samples: u32,
    pub save_dwell_ms: u64,
    /// Hard cap on one blocking travel loop.
    pub max_travel_ms: u64,
    pub full_duty: u16,
}

impl Default for MotionCfg {
    fn default() -> Self {
        Self {
            poll_ms: 10,
            arrive_tolerance_mm: 0.1,
            settle_ms: 10,
            park_ms: 13_000,
            converge_samples: 10,
            save_dwell_ms: 1_000,
            max_travel_ms: 60_000,
            full_duty: 1023,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PresetCfg {
    pub long_press_us: u64,
}

impl Default for PresetCfg {
    fn default() -> Self {
        Self {
            long_press_us: 3_000_000,
        }
    }
}

/// Battery safety thresholds (percent SOC) and poll cadence.
#[derive(Debug, Clone)]
pub struct PowerCfg {
    pub lockout_soc: f32,
    pub first_alert_soc: f32,
    pub alert_step: f32,
    pub slow_poll_ms: u64,
    pub fast_poll_ms: u64,
    pub query_gap_ms: u64,
    pub alert_dwell_ms: u64,
}

impl Default for PowerCfg {
    fn default() -> Self {
        Self {
            lockout_soc: 3.0,
            first_alert_soc: 30.0,
            alert_step: 5.0,
            slow_poll_ms: 60_000,
            fast_poll_ms: 5_000,
            query_gap_ms: 50,
            alert_dwell_ms: 1_500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HostCfg {
    pub id_query: String,
    pub id_reply: String,
    pub link_timeout_ms: u64,
    pub poll_ms: u64,
    pub default_device_name: String,
}

impl Default for HostCfg {
    fn default() -> Self {
        Self {
            id_query: "ESP32_ID_QUERY".to_string(),
            id_reply: "ESP32-S3-IDENTIFIED\r\n".to_string(),
            link_timeout_ms: 120_000,
            poll_ms: 100,
            default_device_name: "LiftHost".to_string(),
        }
    }
}

/// Everything the runner needs to assemble the activities.
#[derive(Debug, Clone)]
pub struct LiftCfg {
    pub estimator: EstimatorCfg,
    pub limits: LimitCfg,
    pub motion: MotionCfg,
    pub presets: PresetCfg,
    pub power: PowerCfg,
    pub host: HostCfg,
    pub display_refresh_ms: u64,
    pub bus_capacity: usize,
}

impl Default for LiftCfg {
    fn default() -> Self {
        Self {
            estimator: EstimatorCfg::default(),
            limits: LimitCfg::default(),
            motion: MotionCfg::default(),
            presets: PresetCfg::default(),
            power: PowerCfg::default(),
            host: HostCfg::default(),
            display_refresh_ms: 200,
            bus_capacity: crate::bus::DEFAULT_CAPACITY,
        }
    }
}
