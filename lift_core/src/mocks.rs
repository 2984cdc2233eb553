//! Test and helper doubles for lift_core.
//!
//! Each double records what it was asked to do behind an `Arc<Mutex<_>>`,
//! so a clone can be handed to the component under test while the original
//! is kept for assertions.
use lift_traits::{
    Actuator, BatteryLink, BoxError, Direction, DisplaySink, HostSink, KvStore, LimitSwitches,
    PackReading, RangeSensor, TempReading,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn failure(what: &str) -> BoxError {
    Box::new(std::io::Error::other(format!("{what} failed (mock)")))
}

#[derive(Debug, Clone, PartialEq)]
enum Stored {
    Float(f32),
    Int(i32),
    Text(String),
}

/// In-memory `KvStore`; can be switched to fail every call.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, Stored>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, v: bool) {
        self.failing.store(v, Ordering::Relaxed);
    }

    fn check(&self) -> Result<(), BoxError> {
        if self.failing.load(Ordering::Relaxed) {
            Err(failure("store"))
        } else {
            Ok(())
        }
    }

    fn put(&self, key: &str, v: Stored) -> Result<(), BoxError> {
        self.check()?;
        lock(&self.map).insert(key.to_string(), v);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Stored>, BoxError> {
        self.check()?;
        Ok(lock(&self.map).get(key).cloned())
    }
}

impl KvStore for MemoryStore {
    fn save_float(&self, key: &str, value: f32) -> Result<(), BoxError> {
        self.put(key, Stored::Float(value))
    }
    fn load_float(&self, key: &str) -> Result<Option<f32>, BoxError> {
        Ok(match self.get(key)? {
            Some(Stored::Float(v)) => Some(v),
            _ => None,
        })
    }
    fn save_int(&self, key: &str, value: i32) -> Result<(), BoxError> {
        self.put(key, Stored::Int(value))
    }
    fn load_int(&self, key: &str) -> Result<Option<i32>, BoxError> {
        Ok(match self.get(key)? {
            Some(Stored::Int(v)) => Some(v),
            _ => None,
        })
    }
    fn save_string(&self, key: &str, value: &str) -> Result<(), BoxError> {
        self.put(key, Stored::Text(value.to_string()))
    }
    fn load_string(&self, key: &str) -> Result<Option<String>, BoxError> {
        Ok(match self.get(key)? {
            Some(Stored::Text(v)) => Some(v),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorOp {
    Direction(Direction),
    Duty(u16),
    Sleep(bool),
}

#[derive(Debug, Default)]
struct ActuatorLog {
    ops: Vec<ActuatorOp>,
    fail_direction: bool,
}

/// Records every actuator write.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator(Arc<Mutex<ActuatorLog>>);

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<ActuatorOp> {
        lock(&self.0).ops.clone()
    }

    /// The next `set_direction` call fails.
    pub fn fail_next_direction(&self) {
        lock(&self.0).fail_direction = true;
    }

    /// Last sleep state written; a fresh driver counts as asleep.
    pub fn asleep(&self) -> bool {
        lock(&self.0)
            .ops
            .iter()
            .rev()
            .find_map(|op| match op {
                ActuatorOp::Sleep(s) => Some(*s),
                _ => None,
            })
            .unwrap_or(true)
    }

    pub fn last_duty(&self) -> Option<u16> {
        lock(&self.0).ops.iter().rev().find_map(|op| match op {
            ActuatorOp::Duty(d) => Some(*d),
            _ => None,
        })
    }
}

impl Actuator for RecordingActuator {
    fn set_direction(&mut self, dir: Direction) -> Result<(), BoxError> {
        let mut log = lock(&self.0);
        if std::mem::take(&mut log.fail_direction) {
            return Err(failure("direction pin"));
        }
        log.ops.push(ActuatorOp::Direction(dir));
        Ok(())
    }
    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), BoxError> {
        lock(&self.0).ops.push(ActuatorOp::Duty(duty));
        Ok(())
    }
    fn set_sleep(&mut self, asleep: bool) -> Result<(), BoxError> {
        lock(&self.0).ops.push(ActuatorOp::Sleep(asleep));
        Ok(())
    }
}

/// Limit switches set by hand.
#[derive(Debug, Clone, Default)]
pub struct SwitchPanel {
    top: Arc<AtomicBool>,
    bottom: Arc<AtomicBool>,
}

impl SwitchPanel {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_top(&self, v: bool) {
        self.top.store(v, Ordering::Relaxed);
    }
    pub fn set_bottom(&self, v: bool) {
        self.bottom.store(v, Ordering::Relaxed);
    }
}

impl LimitSwitches for SwitchPanel {
    fn top(&self) -> bool {
        self.top.load(Ordering::Relaxed)
    }
    fn bottom(&self) -> bool {
        self.bottom.load(Ordering::Relaxed)
    }
}

/// Sensor returning scripted raw values, repeating the last one forever.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSensor {
    script: VecDeque<Option<u16>>,
    last: Option<u16>,
}

impl ScriptedSensor {
    /// `None` entries produce read errors.
    pub fn new(script: impl IntoIterator<Item = Option<u16>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: None,
        }
    }

    pub fn constant(raw: u16) -> Self {
        Self::new([Some(raw)])
    }
}

impl RangeSensor for ScriptedSensor {
    fn read_raw(&mut self) -> Result<u16, BoxError> {
        let next = match self.script.pop_front() {
            Some(v) => v,
            None => self.last,
        };
        match next {
            Some(raw) => {
                self.last = Some(raw);
                Ok(raw)
            }
            None => Err(failure("adc read")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayOp {
    Page(u16),
    Text(u16, String),
    Vp(u16, u16),
    Beep,
}

/// Panel that records every write.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay(Arc<Mutex<Vec<DisplayOp>>>);

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<DisplayOp> {
        lock(&self.0).clone()
    }

    pub fn pages(&self) -> Vec<u16> {
        lock(&self.0)
            .iter()
            .filter_map(|op| match op {
                DisplayOp::Page(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    /// Last text written at `addr`.
    pub fn text_at(&self, addr: u16) -> Option<String> {
        lock(&self.0).iter().rev().find_map(|op| match op {
            DisplayOp::Text(a, t) if *a == addr => Some(t.clone()),
            _ => None,
        })
    }

    /// Last VP value written at `addr`.
    pub fn vp_at(&self, addr: u16) -> Option<u16> {
        lock(&self.0).iter().rev().find_map(|op| match op {
            DisplayOp::Vp(a, v) if *a == addr => Some(*v),
            _ => None,
        })
    }

    pub fn clear(&self) {
        lock(&self.0).clear();
    }
}

impl DisplaySink for RecordingDisplay {
    fn set_page(&mut self, page: u16) -> Result<(), BoxError> {
        lock(&self.0).push(DisplayOp::Page(page));
        Ok(())
    }
    fn set_text(&mut self, addr: u16, text: &str) -> Result<(), BoxError> {
        lock(&self.0).push(DisplayOp::Text(addr, text.to_string()));
        Ok(())
    }
    fn set_vp(&mut self, addr: u16, value: u16) -> Result<(), BoxError> {
        lock(&self.0).push(DisplayOp::Vp(addr, value));
        Ok(())
    }
    fn beep(&mut self) -> Result<(), BoxError> {
        lock(&self.0).push(DisplayOp::Beep);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostOp {
    Text(String),
    Pack(Option<PackReading>),
    Temperature(Option<TempReading>),
}

/// Host link that records every frame sent.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost(Arc<Mutex<Vec<HostOp>>>);

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<HostOp> {
        lock(&self.0).clone()
    }
}

impl HostSink for RecordingHost {
    fn send_text(&mut self, text: &str) -> Result<(), BoxError> {
        lock(&self.0).push(HostOp::Text(text.to_string()));
        Ok(())
    }
    fn send_pack(&mut self, reading: Option<PackReading>) -> Result<(), BoxError> {
        lock(&self.0).push(HostOp::Pack(reading));
        Ok(())
    }
    fn send_temperature(&mut self, reading: Option<TempReading>) -> Result<(), BoxError> {
        lock(&self.0).push(HostOp::Temperature(reading));
        Ok(())
    }
}

/// Battery link answering from a script; the last entry repeats.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBattery {
    packs: Arc<Mutex<VecDeque<Option<PackReading>>>>,
    temp: Option<TempReading>,
    last: Option<PackReading>,
}

impl ScriptedBattery {
    pub fn new(packs: impl IntoIterator<Item = Option<PackReading>>, temp: Option<TempReading>) -> Self {
        Self {
            packs: Arc::new(Mutex::new(packs.into_iter().collect())),
            temp,
            last: None,
        }
    }

    /// Pack reading at `soc` percent, discharging.
    pub fn reading(soc: f32) -> PackReading {
        PackReading {
            voltage: 25.6,
            current: -2.0,
            soc,
        }
    }

    /// Append a reading to the script.
    pub fn push(&self, r: Option<PackReading>) {
        lock(&self.packs).push_back(r);
    }
}

impl BatteryLink for ScriptedBattery {
    fn pack(&mut self) -> Result<Option<PackReading>, BoxError> {
        let next = lock(&self.packs).pop_front();
        Ok(match next {
            Some(r) => {
                if r.is_some() {
                    self.last = r;
                }
                r
            }
            None => self.last,
        })
    }
    fn temperature(&mut self) -> Result<Option<TempReading>, BoxError> {
        Ok(self.temp)
    }
}
