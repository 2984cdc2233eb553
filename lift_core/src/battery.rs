//! Battery poller: pack and temperature queries, panel fields, host
//! forwarding and the power-safety policy.
use crate::bus::{DisplayMsg, EventBus, TelemetryMsg};
use crate::config::PowerCfg;
use crate::hw_error::map_hw_error;
use crate::power::{PowerSafetyMonitor, SocVerdict};
use crate::shared::{Flag, SharedState};
use lift_traits::clock::Clock;
use lift_traits::{BatteryLink, PackReading, TempReading};
use lift_ui::addr;
use std::time::Duration;

pub struct BatteryPoller<B: BatteryLink, C: Clock> {
    link: B,
    monitor: PowerSafetyMonitor,
    bus: EventBus,
    shared: SharedState,
    clock: C,
}

impl<B: BatteryLink, C: Clock> BatteryPoller<B, C> {
    pub fn new(link: B, cfg: PowerCfg, bus: EventBus, shared: SharedState, clock: C) -> Self {
        Self {
            link,
            monitor: PowerSafetyMonitor::new(cfg, shared.lockout.clone()),
            bus,
            shared,
            clock,
        }
    }

    pub fn monitor(&self) -> &PowerSafetyMonitor {
        &self.monitor
    }

    fn text(&self, addr: u16, text: impl Into<String>) {
        self.bus.display.post(DisplayMsg::SetText {
            addr,
            text: text.into(),
        });
    }

    fn read_pack(&mut self) -> Option<PackReading> {
        match self.link.pack() {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %map_hw_error(&*e), "pack query failed");
                None
            }
        }
    }

    fn read_temperature(&mut self) -> Option<TempReading> {
        match self.link.temperature() {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %map_hw_error(&*e), "temperature query failed");
                None
            }
        }
    }

    fn show_pack(&self, r: &PackReading) {
        let charging = r.current > 0.0;
        let watts = lift_ui::rounded_text((r.voltage * r.current).abs());
        self.text(addr::SOC_TEXT, lift_ui::rounded_text(r.soc));
        if charging {
            self.text(addr::CHARGE_WATTS, watts);
            self.text(addr::DISCHARGE_WATTS, lift_ui::ZERO_FIELD);
        } else {
            self.text(addr::DISCHARGE_WATTS, watts);
            self.text(addr::CHARGE_WATTS, lift_ui::ZERO_FIELD);
        }
        self.bus.display.post(DisplayMsg::SetVp {
            addr: addr::BATTERY_ICON,
            value: lift_ui::battery_icon(r.soc, charging),
        });
    }

    fn show_alert(&self, page: u16) {
        let dwell = Duration::from_millis(self.monitor.cfg().alert_dwell_ms);
        self.bus.display.post(DisplayMsg::SetPage(page));
        self.bus.display.post(DisplayMsg::Beep);
        self.clock.sleep(dwell);
        self.bus.display.post(DisplayMsg::SetPage(self.shared.idle_page()));
    }

    /// One poll cycle. Returns the delay before the next one.
    pub fn poll_once(&mut self) -> Duration {
        let connected = self.shared.host_connected.get();
        let pack = self.read_pack();
        match &pack {
            Some(r) => {
                tracing::debug!(soc = r.soc, voltage = r.voltage, current = r.current, "pack");
                self.show_pack(r);
            }
            None => {
                tracing::warn!("pack reading invalid");
                for a in [
                    addr::SOC_TEXT,
                    addr::DISCHARGE_WATTS,
                    addr::CHARGE_WATTS,
                    addr::BATTERY_ICON,
                ] {
                    self.text(a, lift_ui::PLACEHOLDER);
                }
            }
        }
        if connected {
            self.bus.telemetry.post(TelemetryMsg::Pack(pack));
        }

        if let Some(r) = pack {
            let theme = self.shared.theme.get();
            match self.monitor.observe(r.soc) {
                SocVerdict::Alert => self.show_alert(lift_ui::pages::low_battery(theme)),
                SocVerdict::Lockout => self.show_alert(lift_ui::pages::critical_battery(theme)),
                SocVerdict::Steady | SocVerdict::Unlocked => {}
            }
        }

        self.clock
            .sleep(Duration::from_millis(self.monitor.cfg().query_gap_ms));

        let temp = self.read_temperature();
        match &temp {
            Some(t) => {
                self.text(addr::TEMP_MIN, lift_ui::temp_text(t.min));
                self.text(addr::TEMP_MAX, lift_ui::temp_text(t.max));
                self.text(addr::TEMP_AVG, lift_ui::temp_avg_text(t.avg));
            }
            None => {
                tracing::warn!("temperature reading invalid");
                for a in [addr::TEMP_MIN, addr::TEMP_MAX, addr::TEMP_AVG] {
                    self.text(a, lift_ui::PLACEHOLDER);
                }
            }
        }
        if connected {
            self.bus.telemetry.post(TelemetryMsg::Temperature(temp));
        }

        Duration::from_millis(self.monitor.poll_ms())
    }

    /// Poll until shutdown. The wait is sliced so shutdown is noticed promptly.
    pub fn run(mut self, shutdown: &Flag, slice: Duration) {
        'outer: while !shutdown.get() {
            let wait = self.poll_once();
            let start = self.clock.now();
            while self.clock.now().saturating_duration_since(start) < wait {
                if shutdown.get() {
                    break 'outer;
                }
                self.clock.sleep(slice.min(wait));
            }
        }
        tracing::debug!("battery poller exiting");
    }
}
