use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("pwm error: {0}")]
    Pwm(String),
    #[error("adc error: {0}")]
    Adc(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("link error: {0}")]
    Link(String),
    #[error("simulated fault: {0}")]
    Sim(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
