#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas, simulation scenarios and sensor-trace parsing for the lift.
//!
//! - `Config` and its tables are deserialized from TOML and validated.
//!   Every table is optional; defaults match the production firmware.
//! - `Scenario` describes timed panel/host/battery events for the simulator.
//! - The trace CSV loader enforces headers and time ordering.
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SamplingCfg {
    /// Raw readings per filtered sample.
    pub batch_size: usize,
    /// Delay between raw readings of one batch (ms).
    pub inter_sample_ms: u64,
    /// Delay between batches (ms).
    pub period_ms: u64,
    /// Readings whose voltage is below this are discarded (V).
    pub noise_floor_v: f32,
    pub adc_full_scale: u16,
    pub adc_ref_v: f32,
    /// distance = curve_gain * v^curve_exponent - curve_offset
    pub curve_gain: f32,
    pub curve_exponent: f32,
    pub curve_offset: f32,
    /// Weight kept from the previous smoothed output, in (0, 1).
    pub retain: f32,
}

impl Default for SamplingCfg {
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LimitsCfg {
    pub bottom_tolerance_mm: f32,
    pub top_tolerance_mm: f32,
    pub hard_floor_mm: f32,
    pub hard_ceiling_mm: f32,
}

impl Default for LimitsCfg {
    fn default() -> Self {
        Self {
            bottom_tolerance_mm: 0.5,
            top_tolerance_mm: 0.1,
            hard_floor_mm: 3.0,
            hard_ceiling_mm: 20.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MotionCfg {
    /// Command queue / travel loop poll interval (ms).
    pub poll_ms: u64,
    /// GotoPosition completes when |height - target| is below this (mm).
    pub arrive_tolerance_mm: f32,
    /// Pause after reaching a limit during calibration (ms).
    pub settle_ms: u64,
    /// First-boot dead-reckoning descent (ms).
    pub park_ms: u64,
    /// Fresh batches taken before recording the top bound on first boot.
    pub converge_samples: u32,
    /// How long the "preset saved" page stays up (ms).
    pub save_dwell_ms: u64,
    /// Watchdog for blocking travel loops (ms).
    pub max_travel_ms: u64,
    /// Duty cycle used while moving.
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PresetsCfg {
    /// Continuous hold before the long-press (save) action fires (µs).
    pub long_press_us: u64,
}

impl Default for PresetsCfg {
    fn default() -> Self {
        Self {
            long_press_us: 3_000_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PowerCfg {
    /// Motion is locked out below this state of charge (%).
    pub lockout_soc: f32,
    /// First low-battery alert when dropping below this (%).
    pub first_alert_soc: f32,
    /// Further alerts every this many percent of drop.
    pub alert_step: f32,
    pub slow_poll_ms: u64,
    /// Poll period while locked out.
    pub fast_poll_ms: u64,
    /// Mandatory gap between the pack and temperature queries.
    pub query_gap_ms: u64,
    /// How long an alert page stays up (ms).
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayCfg {
    pub refresh_ms: u64,
}

impl Default for DisplayCfg {
    fn default() -> Self {
        Self { refresh_ms: 200 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HostCfg {
    /// Identification request the host sends as plain text.
    pub id_query: String,
    /// Fixed reply to the identification request.
    pub id_reply: String,
    /// Link is considered gone after this long without a valid frame (ms).
    pub link_timeout_ms: u64,
    pub poll_ms: u64,
    /// Device name stored when none was persisted yet.
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BusCfg {
    /// Capacity of each event queue.
    pub capacity: usize,
}

impl Default for BusCfg {
    fn default() -> Self {
        Self { capacity: 10 }
    }
}

/// GPIO assignment for the `hardware` backend (BCM numbering).
#[derive(Debug, Deserialize, Clone)]
pub struct Pins {
    pub motor_dir: u8,
    pub motor_sleep: u8,
    /// Hardware PWM channel (0 or 1).
    pub motor_pwm_channel: u8,
    pub proximity_top: u8,
    pub proximity_bottom: u8,
    /// MCP3208 input the distance sensor is wired to (SPI0, CE0).
    #[serde(default)]
    pub adc_channel: u8,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Simulated rig parameters used by the CLI.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimCfg {
    /// Mechanical lower stop (mm).
    pub bottom_stop_mm: f32,
    /// Mechanical upper stop (mm).
    pub top_stop_mm: f32,
    /// Height at power-on (mm).
    pub start_mm: f32,
    /// Travel speed at full duty (mm/s).
    pub speed_mm_s: f32,
    /// Peak-to-peak sensor noise (mm).
    pub noise_mm: f32,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            bottom_stop_mm: 4.0,
            top_stop_mm: 17.5,
            start_mm: 10.0,
            speed_mm_s: 2.0,
            noise_mm: 0.2,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub sampling: SamplingCfg,
    #[serde(default)]
    pub limits: LimitsCfg,
    #[serde(default)]
    pub motion: MotionCfg,
    #[serde(default)]
    pub presets: PresetsCfg,
    #[serde(default)]
    pub power: PowerCfg,
    #[serde(default)]
    pub display: DisplayCfg,
    #[serde(default)]
    pub host: HostCfg,
    #[serde(default)]
    pub bus: BusCfg,
    #[serde(default)]
    pub pins: Option<Pins>,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub sim: SimCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sampling
        let s = &self.sampling;
        if s.batch_size == 0 {
            eyre::bail!("sampling.batch_size must be >= 1");
        }
        if s.period_ms == 0 {
            eyre::bail!("sampling.period_ms must be >= 1");
        }
        if !(s.retain > 0.0 && s.retain < 1.0) {
            eyre::bail!("sampling.retain must be in (0.0, 1.0)");
        }
        if s.adc_full_scale == 0 {
            eyre::bail!("sampling.adc_full_scale must be > 0");
        }
        if !(s.adc_ref_v > 0.0) {
            eyre::bail!("sampling.adc_ref_v must be > 0");
        }
        if s.noise_floor_v.is_sign_negative() {
            eyre::bail!("sampling.noise_floor_v must be >= 0");
        }

        // Limits
        let l = &self.limits;
        if l.bottom_tolerance_mm.is_sign_negative() || l.top_tolerance_mm.is_sign_negative() {
            eyre::bail!("limits tolerances must be >= 0");
        }
        if l.hard_floor_mm >= l.hard_ceiling_mm {
            eyre::bail!("limits.hard_floor_mm must be below limits.hard_ceiling_mm");
        }

        // Motion
        let m = &self.motion;
        if m.poll_ms == 0 {
            eyre::bail!("motion.poll_ms must be >= 1");
        }
        if !(m.arrive_tolerance_mm > 0.0) {
            eyre::bail!("motion.arrive_tolerance_mm must be > 0");
        }
        if m.max_travel_ms == 0 {
            eyre::bail!("motion.max_travel_ms must be >= 1");
        }
        if m.full_duty == 0 {
            eyre::bail!("motion.full_duty must be > 0");
        }

        // Presets
        if self.presets.long_press_us == 0 {
            eyre::bail!("presets.long_press_us must be >= 1");
        }

        // Power
        let p = &self.power;
        if !(p.alert_step > 0.0) {
            eyre::bail!("power.alert_step must be > 0");
        }
        if p.lockout_soc >= p.first_alert_soc {
            eyre::bail!("power.lockout_soc must be below power.first_alert_soc");
        }
        if p.slow_poll_ms == 0 || p.fast_poll_ms == 0 {
            eyre::bail!("power poll periods must be >= 1");
        }

        // Display / host / bus
        if self.display.refresh_ms == 0 {
            eyre::bail!("display.refresh_ms must be >= 1");
        }
        if self.host.poll_ms == 0 {
            eyre::bail!("host.poll_ms must be >= 1");
        }
        if self.host.id_query.is_empty() {
            eyre::bail!("host.id_query must not be empty");
        }
        if self.bus.capacity == 0 {
            eyre::bail!("bus.capacity must be >= 1");
        }

        // Simulator
        if self.sim.bottom_stop_mm >= self.sim.top_stop_mm {
            eyre::bail!("sim.bottom_stop_mm must be below sim.top_stop_mm");
        }
        if !(self.sim.speed_mm_s > 0.0) {
            eyre::bail!("sim.speed_mm_s must be > 0");
        }

        Ok(())
    }
}

/// One timed event of a simulation scenario.
#[derive(Debug, Deserialize, Clone)]
pub struct ScenarioStep {
    /// Offset from the start of the run (ms).
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: ScenarioAction,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioAction {
    /// Raw panel report: variable pointer, key code and data byte.
    Button {
        vp: u8,
        code: u8,
        #[serde(default)]
        value: u8,
    },
    /// Battery state of charge reported from now on.
    Soc { soc: f32 },
    HostMetrics { values: [u8; 8] },
    HostName { name: String },
    HostText { text: String },
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Scenario {
    #[serde(default, rename = "step")]
    pub steps: Vec<ScenarioStep>,
}

pub fn load_scenario(s: &str) -> eyre::Result<Scenario> {
    let mut sc: Scenario =
        toml::from_str(s).map_err(|e| eyre::eyre!("invalid scenario TOML: {e}"))?;
    sc.steps.sort_by_key(|st| st.at_ms);
    Ok(sc)
}

/// Recorded sensor trace schema.
///
/// Expected headers:
/// t_ms,raw
///
/// Example:
/// t_ms,raw
/// 0,1210
/// 5,1204
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TraceRow {
    pub t_ms: u64,
    pub raw: u16,
}

pub fn load_trace_csv(path: &std::path::Path) -> eyre::Result<Vec<TraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["t_ms", "raw"];
    let actual: Vec<String> = headers.iter().map(|s| s.trim().to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "trace CSV must have headers 't_ms,raw', got: {}",
            actual.join(",")
        );
    }

    let mut rows: Vec<TraceRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<TraceRow>().enumerate() {
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        if let Some(prev) = rows.last()
            && row.t_ms < prev.t_ms
        {
            eyre::bail!("trace rows must be ordered by t_ms (row {})", idx + 2);
        }
        rows.push(row);
    }
    if rows.is_empty() {
        eyre::bail!("trace CSV contains no rows");
    }
    Ok(rows)
}
