//! Bounded, non-blocking queues between producers and the consuming activities.
//!
//! Every queue drops the *newest* message when full: `post` never blocks the
//! producer, the rejected message is counted and logged, and everything
//! already queued is delivered in order.
use crate::presets::PresetId;
use crossbeam_channel as xch;
use lift_traits::{BoxError, DisplaySink, PackReading, TempReading};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const DEFAULT_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotorCommand {
    Forward,
    Backward,
    Stop,
    /// Travel to the given height (mm).
    GotoPosition(f32),
    /// Store the current height under the preset.
    SavePosition(PresetId),
    Calibrate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayMsg {
    SetPage(u16),
    SetText { addr: u16, text: String },
    SetVp { addr: u16, value: u16 },
    Beep,
}

/// Battery readings bound for the host; `None` is an invalid poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryMsg {
    Pack(Option<PackReading>),
    Temperature(Option<TempReading>),
}

/// One bounded queue. Clones share the same channel.
#[derive(Debug)]
pub struct Queue<T> {
    name: &'static str,
    tx: xch::Sender<T>,
    rx: xch::Receiver<T>,
    dropped: Arc<AtomicU64>,
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            dropped: self.dropped.clone(),
        }
    }
}

impl<T: std::fmt::Debug> Queue<T> {
    pub fn bounded(name: &'static str, capacity: usize) -> Self {
        let (tx, rx) = xch::bounded(capacity.max(1));
        Self {
            name,
            tx,
            rx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Enqueue without blocking. Returns `false` if the message was dropped.
    pub fn post(&self, msg: T) -> bool {
        match self.tx.try_send(msg) {
            Ok(()) => true,
            Err(xch::TrySendError::Full(msg)) => {
                let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(queue = self.name, ?msg, dropped_total = n, "queue full; dropping newest");
                false
            }
            Err(xch::TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn try_recv(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Everything queued right now, in arrival order.
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Queued display writes; flushed by the display refresher.
impl DisplaySink for Queue<DisplayMsg> {
    fn set_page(&mut self, page: u16) -> Result<(), BoxError> {
        self.post(DisplayMsg::SetPage(page));
        Ok(())
    }

    fn set_text(&mut self, addr: u16, text: &str) -> Result<(), BoxError> {
        self.post(DisplayMsg::SetText {
            addr,
            text: text.to_string(),
        });
        Ok(())
    }

    fn set_vp(&mut self, addr: u16, value: u16) -> Result<(), BoxError> {
        self.post(DisplayMsg::SetVp { addr, value });
        Ok(())
    }

    fn beep(&mut self) -> Result<(), BoxError> {
        self.post(DisplayMsg::Beep);
        Ok(())
    }
}

/// The three queues of the controller.
#[derive(Debug, Clone)]
pub struct EventBus {
    pub motor: Queue<MotorCommand>,
    pub display: Queue<DisplayMsg>,
    pub telemetry: Queue<TelemetryMsg>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            motor: Queue::bounded("motor", capacity),
            display: Queue::bounded("display", capacity),
            telemetry: Queue::bounded("telemetry", capacity),
        }
    }

    /// Total messages dropped across all queues.
    pub fn dropped_total(&self) -> u64 {
        self.motor.dropped() + self.display.dropped() + self.telemetry.dropped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_is_kept() {
        let bus = EventBus::default();
        assert!(bus.motor.post(MotorCommand::Forward));
        assert!(bus.motor.post(MotorCommand::Stop));
        assert_eq!(bus.motor.try_recv(), Some(MotorCommand::Forward));
        assert_eq!(bus.motor.try_recv(), Some(MotorCommand::Stop));
        assert_eq!(bus.motor.try_recv(), None);
    }

    #[test]
    fn display_queue_is_a_sink() {
        let bus = EventBus::default();
        let mut q = bus.display.clone();
        q.set_page(5).unwrap();
        q.set_text(0x1000, "07").unwrap();
        assert_eq!(
            bus.display.drain(),
            vec![
                DisplayMsg::SetPage(5),
                DisplayMsg::SetText {
                    addr: 0x1000,
                    text: "07".into()
                }
            ]
        );
    }
}
