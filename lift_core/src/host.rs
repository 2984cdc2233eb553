//! Host telemetry link: metrics and device name in, battery telemetry out.
//!
//! Any valid frame marks the link connected; the connected idle page is
//! shown on the transition. With no frame for `link_timeout_ms` the link
//! drops back to disconnected and the disconnected idle page is shown.
use crate::bus::{DisplayMsg, EventBus, TelemetryMsg};
use crate::config::HostCfg;
use crate::hw_error::map_hw_error;
use crate::settings::Settings;
use crate::shared::{Flag, SharedState};
use crossbeam_channel as xch;
use lift_traits::HostSink;
use lift_traits::clock::Clock;
use lift_ui::addr;
use std::time::{Duration, Instant};

/// Decoded input from the host link. Frame checksums are verified upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// Eight one-byte system metrics in frame order.
    Metrics([u8; 8]),
    DeviceName(String),
    /// Plain text outside the binary framing (identification handshake).
    Text(String),
}

pub struct HostLink<H: HostSink, C: Clock> {
    sink: H,
    settings: Settings,
    bus: EventBus,
    shared: SharedState,
    cfg: HostCfg,
    clock: C,
    last_frame: Option<Instant>,
}

impl<H: HostSink, C: Clock> HostLink<H, C> {
    pub fn new(sink: H, settings: Settings, bus: EventBus, shared: SharedState, cfg: HostCfg, clock: C) -> Self {
        Self {
            sink,
            settings,
            bus,
            shared,
            cfg,
            clock,
            last_frame: None,
        }
    }

    pub fn connected(&self) -> bool {
        self.shared.host_connected.get()
    }

    fn text(&self, addr: u16, text: String) {
        self.bus.display.post(DisplayMsg::SetText { addr, text });
    }

    fn frame_received(&mut self) {
        self.last_frame = Some(self.clock.now());
        if !self.shared.host_connected.get() {
            self.shared.host_connected.set(true);
            tracing::info!("host link connected");
            self.bus.display.post(DisplayMsg::SetPage(self.shared.idle_page()));
        }
    }

    pub fn handle(&mut self, ev: HostEvent) {
        match ev {
            HostEvent::Metrics(values) => {
                self.frame_received();
                for (a, v) in addr::METRICS.iter().zip(values) {
                    self.text(*a, lift_ui::metric_cell(v));
                }
                tracing::trace!(?values, "host metrics");
            }
            HostEvent::DeviceName(name) => {
                self.frame_received();
                let name: String = name.chars().take(lift_ui::DEVICE_NAME_LEN).collect();
                if self.settings.device_name().as_deref() != Some(name.as_str()) {
                    tracing::info!(name = %name, "device name changed");
                    self.settings.save_device_name(&name);
                }
                self.text(addr::DEVICE_NAME, lift_ui::padded_name(&name));
            }
            HostEvent::Text(text) => {
                if text.contains(&self.cfg.id_query) {
                    tracing::debug!("identification request");
                    if let Err(e) = self.sink.send_text(&self.cfg.id_reply) {
                        tracing::warn!(error = %map_hw_error(&*e), "host reply failed");
                    }
                }
            }
        }
    }

    /// Drop the link if it has been silent for too long.
    pub fn check_timeout(&mut self) {
        if !self.shared.host_connected.get() {
            return;
        }
        let silent_ms = self.last_frame.map_or(u64::MAX, |t| self.clock.ms_since(t));
        if silent_ms > self.cfg.link_timeout_ms {
            self.shared.host_connected.set(false);
            tracing::warn!(silent_ms, "host link timed out");
            self.bus.display.post(DisplayMsg::SetPage(self.shared.idle_page()));
        }
    }

    /// Send queued battery telemetry while connected; drop it otherwise.
    pub fn forward_telemetry(&mut self) {
        for msg in self.bus.telemetry.drain() {
            if !self.shared.host_connected.get() {
                continue;
            }
            let res = match msg {
                TelemetryMsg::Pack(r) => self.sink.send_pack(r),
                TelemetryMsg::Temperature(r) => self.sink.send_temperature(r),
            };
            if let Err(e) = res {
                tracing::warn!(error = %map_hw_error(&*e), "telemetry send failed");
            }
        }
    }

    pub fn run(mut self, rx: &xch::Receiver<HostEvent>, shutdown: &Flag) {
        let poll = Duration::from_millis(self.cfg.poll_ms);
        while !shutdown.get() {
            match rx.recv_timeout(poll) {
                Ok(ev) => self.handle(ev),
                Err(xch::RecvTimeoutError::Timeout) => {}
                Err(xch::RecvTimeoutError::Disconnected) => break,
            }
            self.check_timeout();
            self.forward_telemetry();
        }
        tracing::debug!("host link exiting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{HostOp, MemoryStore, RecordingHost};
    use lift_traits::clock::test_clock::TestClock;
    use lift_ui::Theme;
    use std::sync::Arc;

    struct Fixture {
        link: HostLink<RecordingHost, TestClock>,
        host: RecordingHost,
        bus: EventBus,
        shared: SharedState,
        settings: Settings,
        clock: TestClock,
    }

    fn fixture() -> Fixture {
        let (shared, _w) = SharedState::new(Theme::Primary);
        let bus = EventBus::new(32);
        let host = RecordingHost::new();
        let settings = Settings::new(Arc::new(MemoryStore::new()));
        let clock = TestClock::new();
        let link = HostLink::new(
            host.clone(),
            settings.clone(),
            bus.clone(),
            shared.clone(),
            HostCfg::default(),
            clock.clone(),
        );
        Fixture {
            link,
            host,
            bus,
            shared,
            settings,
            clock,
        }
    }

    #[test]
    fn first_frame_connects_and_shows_connected_page() {
        let mut f = fixture();
        f.link.handle(HostEvent::Metrics([1, 2, 3, 4, 5, 6, 7, 8]));
        f.link.handle(HostEvent::Metrics([1, 2, 3, 4, 5, 6, 7, 8]));
        assert!(f.shared.host_connected.get());
        let msgs = f.bus.display.drain();
        let pages: Vec<_> = msgs
            .iter()
            .filter(|m| matches!(m, DisplayMsg::SetPage(_)))
            .collect();
        assert_eq!(pages, vec![&DisplayMsg::SetPage(5)]);
        assert!(msgs.contains(&DisplayMsg::SetText {
            addr: 0x9000,
            text: "1    ".into()
        }));
    }

    #[test]
    fn silence_times_out_to_disconnected_page() {
        let mut f = fixture();
        f.link.handle(HostEvent::Metrics([0; 8]));
        f.bus.display.drain();
        f.clock.advance(Duration::from_millis(120_000));
        f.link.check_timeout();
        assert!(f.link.connected());
        f.clock.advance(Duration::from_millis(1));
        f.link.check_timeout();
        assert!(!f.link.connected());
        assert_eq!(f.bus.display.drain(), vec![DisplayMsg::SetPage(21)]);
    }

    #[test]
    fn device_name_saved_only_when_changed() {
        let mut f = fixture();
        f.link.handle(HostEvent::DeviceName("Workstation".into()));
        assert_eq!(f.settings.device_name().as_deref(), Some("Workstation"));
        assert!(f.bus.display.drain().contains(&DisplayMsg::SetText {
            addr: 0x1800,
            text: lift_ui::padded_name("Workstation")
        }));
    }

    #[test]
    fn handshake_is_answered() {
        let mut f = fixture();
        f.link.handle(HostEvent::Text("xxESP32_ID_QUERY\r\n".into()));
        assert_eq!(
            f.host.ops(),
            vec![HostOp::Text("ESP32-S3-IDENTIFIED\r\n".into())]
        );
        assert!(!f.link.connected(), "handshake is not a data frame");
    }

    #[test]
    fn telemetry_forwarded_only_while_connected() {
        let mut f = fixture();
        f.bus.telemetry.post(TelemetryMsg::Pack(None));
        f.link.forward_telemetry();
        assert!(f.host.ops().is_empty());
        f.link.handle(HostEvent::Metrics([0; 8]));
        f.bus.telemetry.post(TelemetryMsg::Pack(None));
        f.link.forward_telemetry();
        assert_eq!(f.host.ops(), vec![HostOp::Pack(None)]);
    }
}
