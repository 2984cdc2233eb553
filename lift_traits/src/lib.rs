//! Seams between the lift controller and its collaborators.
//!
//! Everything the control core touches that is not pure logic (ADC sampling,
//! actuation pins, proximity switches, persistent storage, the panel and the
//! serial links) goes through one of these traits, so the core can run against
//! real hardware, the simulated rig, or test doubles.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Boxed error used at every trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Direction of travel of the actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Raise the platform.
    Forward,
    /// Lower the platform.
    Backward,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// Analog range sensor: one raw ADC conversion per call.
pub trait RangeSensor {
    fn read_raw(&mut self) -> Result<u16, BoxError>;
}

/// Raw actuation outputs: direction pin, PWM duty register and driver sleep pin.
pub trait Actuator {
    fn set_direction(&mut self, dir: Direction) -> Result<(), BoxError>;
    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), BoxError>;
    /// `true` puts the driver to sleep, `false` wakes it.
    fn set_sleep(&mut self, asleep: bool) -> Result<(), BoxError>;
}

/// Hardware proximity inputs at both ends of travel.
pub trait LimitSwitches {
    fn top(&self) -> bool;
    fn bottom(&self) -> bool;
}

/// Persistent key-value storage. `Ok(None)` means the key is not stored.
///
/// Methods take `&self`: the store is shared by several activities and
/// implementations provide their own interior locking.
pub trait KvStore: Send + Sync {
    fn save_float(&self, key: &str, value: f32) -> Result<(), BoxError>;
    fn load_float(&self, key: &str) -> Result<Option<f32>, BoxError>;
    fn save_int(&self, key: &str, value: i32) -> Result<(), BoxError>;
    fn load_int(&self, key: &str) -> Result<Option<i32>, BoxError>;
    fn save_string(&self, key: &str, value: &str) -> Result<(), BoxError>;
    fn load_string(&self, key: &str) -> Result<Option<String>, BoxError>;
}

/// Touch panel output side.
pub trait DisplaySink {
    fn set_page(&mut self, page: u16) -> Result<(), BoxError>;
    fn set_text(&mut self, addr: u16, text: &str) -> Result<(), BoxError>;
    fn set_vp(&mut self, addr: u16, value: u16) -> Result<(), BoxError>;
    fn beep(&mut self) -> Result<(), BoxError>;
}

/// Battery pack electrical reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackReading {
    /// Pack voltage (V).
    pub voltage: f32,
    /// Pack current (A); positive while charging.
    pub current: f32,
    /// State of charge (%).
    pub soc: f32,
}

/// Battery pack temperature reading (°C).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempReading {
    pub min: i8,
    pub max: i8,
    pub avg: f32,
}

/// Battery-monitor query link. `Ok(None)` is an invalid poll (checksum or
/// timeout) that the link already rejected.
pub trait BatteryLink {
    fn pack(&mut self) -> Result<Option<PackReading>, BoxError>;
    fn temperature(&mut self) -> Result<Option<TempReading>, BoxError>;
}

/// Outgoing side of the host telemetry link.
pub trait HostSink {
    fn send_text(&mut self, text: &str) -> Result<(), BoxError>;
    fn send_pack(&mut self, reading: Option<PackReading>) -> Result<(), BoxError>;
    fn send_temperature(&mut self, reading: Option<TempReading>) -> Result<(), BoxError>;
}

impl<T: RangeSensor + ?Sized> RangeSensor for Box<T> {
    fn read_raw(&mut self) -> Result<u16, BoxError> {
        (**self).read_raw()
    }
}

impl<T: Actuator + ?Sized> Actuator for Box<T> {
    fn set_direction(&mut self, dir: Direction) -> Result<(), BoxError> {
        (**self).set_direction(dir)
    }
    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), BoxError> {
        (**self).set_duty_cycle(duty)
    }
    fn set_sleep(&mut self, asleep: bool) -> Result<(), BoxError> {
        (**self).set_sleep(asleep)
    }
}

impl<T: LimitSwitches + ?Sized> LimitSwitches for Box<T> {
    fn top(&self) -> bool {
        (**self).top()
    }
    fn bottom(&self) -> bool {
        (**self).bottom()
    }
}

impl<T: DisplaySink + ?Sized> DisplaySink for Box<T> {
    fn set_page(&mut self, page: u16) -> Result<(), BoxError> {
        (**self).set_page(page)
    }
    fn set_text(&mut self, addr: u16, text: &str) -> Result<(), BoxError> {
        (**self).set_text(addr, text)
    }
    fn set_vp(&mut self, addr: u16, value: u16) -> Result<(), BoxError> {
        (**self).set_vp(addr, value)
    }
    fn beep(&mut self) -> Result<(), BoxError> {
        (**self).beep()
    }
}

impl<T: BatteryLink + ?Sized> BatteryLink for Box<T> {
    fn pack(&mut self) -> Result<Option<PackReading>, BoxError> {
        (**self).pack()
    }
    fn temperature(&mut self) -> Result<Option<TempReading>, BoxError> {
        (**self).temperature()
    }
}

impl<T: HostSink + ?Sized> HostSink for Box<T> {
    fn send_text(&mut self, text: &str) -> Result<(), BoxError> {
        (**self).send_text(text)
    }
    fn send_pack(&mut self, reading: Option<PackReading>) -> Result<(), BoxError> {
        (**self).send_pack(reading)
    }
    fn send_temperature(&mut self, reading: Option<TempReading>) -> Result<(), BoxError> {
        (**self).send_temperature(reading)
    }
}
