//! `From` implementations bridging `lift_config` types to `lift_core` types.

use crate::config::{EstimatorCfg, HostCfg, LiftCfg, LimitCfg, MotionCfg, PowerCfg, PresetCfg};

// ── EstimatorCfg ─────────────────────────────────────────────────────────────

impl From<&lift_config::SamplingCfg> for EstimatorCfg {
    fn from(c: &lift_config::SamplingCfg) -> Self {
        Self {
            batch_size: c.batch_size,
            inter_sample_ms: c.inter_sample_ms,
            period_ms: c.period_ms,
            noise_floor_v: c.noise_floor_v,
            adc_full_scale: c.adc_full_scale,
            adc_ref_v: c.adc_ref_v,
            curve_gain: c.curve_gain,
            curve_exponent: c.curve_exponent,
            curve_offset: c.curve_offset,
            retain: c.retain,
        }
    }
}

// ── LimitCfg ─────────────────────────────────────────────────────────────────

impl From<&lift_config::LimitsCfg> for LimitCfg {
    fn from(c: &lift_config::LimitsCfg) -> Self {
        Self {
            bottom_tolerance_mm: c.bottom_tolerance_mm,
            top_tolerance_mm: c.top_tolerance_mm,
            hard_floor_mm: c.hard_floor_mm,
            hard_ceiling_mm: c.hard_ceiling_mm,
        }
    }
}

// ── MotionCfg ────────────────────────────────────────────────────────────────

impl From<&lift_config::MotionCfg> for MotionCfg {
    fn from(c: &lift_config::MotionCfg) -> Self {
        Self {
            poll_ms: c.poll_ms,
            arrive_tolerance_mm: c.arrive_tolerance_mm,
            settle_ms: c.settle_ms,
            park_ms: c.park_ms,
            converge_samples: c.converge_samples,
            save_dwell_ms: c.save_dwell_ms,
            max_travel_ms: c.max_travel_ms,
            full_duty: c.full_duty,
        }
    }
}

// ── PresetCfg / PowerCfg / HostCfg ───────────────────────────────────────────

impl From<&lift_config::PresetsCfg> for PresetCfg {
    fn from(c: &lift_config::PresetsCfg) -> Self {
        Self {
            long_press_us: c.long_press_us,
        }
    }
}

impl From<&lift_config::PowerCfg> for PowerCfg {
    fn from(c: &lift_config::PowerCfg) -> Self {
        Self {
            lockout_soc: c.lockout_soc,
            first_alert_soc: c.first_alert_soc,
            alert_step: c.alert_step,
            slow_poll_ms: c.slow_poll_ms,
            fast_poll_ms: c.fast_poll_ms,
            query_gap_ms: c.query_gap_ms,
            alert_dwell_ms: c.alert_dwell_ms,
        }
    }
}

impl From<&lift_config::HostCfg> for HostCfg {
    fn from(c: &lift_config::HostCfg) -> Self {
        Self {
            id_query: c.id_query.clone(),
            id_reply: c.id_reply.clone(),
            link_timeout_ms: c.link_timeout_ms,
            poll_ms: c.poll_ms,
            default_device_name: c.default_device_name.clone(),
        }
    }
}

// ── LiftCfg ──────────────────────────────────────────────────────────────────

impl From<&lift_config::Config> for LiftCfg {
    fn from(c: &lift_config::Config) -> Self {
        Self {
            estimator: EstimatorCfg::from(&c.sampling),
            limits: LimitCfg::from(&c.limits),
            motion: MotionCfg::from(&c.motion),
            presets: PresetCfg::from(&c.presets),
            power: PowerCfg::from(&c.power),
            host: HostCfg::from(&c.host),
            display_refresh_ms: c.display.refresh_ms,
            bus_capacity: c.bus.capacity,
        }
    }
}
