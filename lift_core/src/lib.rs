#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core lift control logic (hardware-agnostic).
//!
//! Every hardware interaction goes through the `lift_traits` seams
//! (`RangeSensor`, `Actuator`, `LimitSwitches`, `KvStore`, `DisplaySink`,
//! `BatteryLink`, `HostSink`), so the same code runs on the board, on the
//! simulated rig and under test doubles.
//!
//! ## Architecture
//!
//! - **Height**: batch median + exponential smoothing of a non-linear
//!   distance sensor (`height`)
//! - **Actuation**: direction/duty/sleep sequencing with the lockout gate
//!   (`actuator`)
//! - **Limits**: switch and soft-bound end-of-travel detection (`limits`)
//! - **Position**: height to discrete steps with hysteresis (`position`)
//! - **Bus**: bounded, non-blocking queues between activities (`bus`)
//! - **Presets**: press/hold/release disambiguation (`presets`)
//! - **Power**: battery SOC alerts and motion lockout (`power`)
//! - **Motion**: the state machine owning the actuator, incl. calibration
//!   (`motion`)
//!
//! Around them sit the activities (`panel`, `display`, `battery`, `host`)
//! and the threaded `runner` that wires everything together.

pub mod actuator;
pub mod battery;
pub mod bus;
pub mod config;
pub mod conversions;
pub mod display;
pub mod error;
pub mod height;
pub mod host;
pub mod hw_error;
pub mod limits;
pub mod mocks;
pub mod motion;
pub mod panel;
pub mod position;
pub mod power;
pub mod presets;
pub mod runner;
pub mod settings;
pub mod shared;
pub mod util;

pub use actuator::{ActuatorDriver, DriveState};
pub use bus::{DisplayMsg, EventBus, MotorCommand, Queue, TelemetryMsg};
pub use config::LiftCfg;
pub use error::{BuildError, LiftError, Result};
pub use height::{HeightEstimator, HeightSampler, HeightSource};
pub use host::{HostEvent, HostLink};
pub use limits::{LimitPhase, LimitSensor};
pub use motion::{BootOutcome, MotionController, MotionState, TravelEnd};
pub use panel::{ButtonEvent, ButtonSource, PanelDispatcher};
pub use position::{PositionMapper, PositionStep};
pub use power::{PowerSafetyMonitor, SocVerdict};
pub use presets::{PresetAction, PresetId, PresetInputDecoder, PressEdge};
pub use runner::{LiftHandle, LiftSystem, LiftSystemBuilder};
pub use settings::Settings;
pub use shared::{Bounds, Flag, SharedState};
