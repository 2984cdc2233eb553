//! Collaborators for the lift core: a simulated rig, a file-backed store
//! and, behind the `hardware` feature, the Raspberry Pi backend.
pub mod error;
#[cfg(feature = "hardware")]
pub mod rpi;
pub mod sim;
pub mod store;

pub use error::HwError;
pub use sim::{PanelState, SensorCurve, SimBattery, SimPanel, SimRig, TraceHost};
pub use store::FileStore;
