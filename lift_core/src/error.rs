use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum LiftError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("link error: {0}")]
    Link(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing range sensor")]
    MissingSensor,
    #[error("missing actuator")]
    MissingActuator,
    #[error("missing limit switches")]
    MissingSwitches,
    #[error("missing battery link")]
    MissingBattery,
    #[error("missing display sink")]
    MissingDisplay,
    #[error("missing host sink")]
    MissingHost,
    #[error("missing key-value store")]
    MissingStore,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
