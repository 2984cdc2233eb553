//! Decoded panel input and its dispatch onto the motion queue.
use crate::bus::{DisplayMsg, EventBus, MotorCommand};
use crate::presets::{PresetAction, PresetId, PresetInputDecoder, PressEdge};
use crate::settings::Settings;
use crate::shared::{Flag, SharedState};
use crossbeam_channel as xch;
use lift_traits::clock::Clock;
use lift_ui::Theme;
use std::time::{Duration, Instant};

/// Variable pointers the panel reports button activity on.
pub mod vp {
    pub const UP_DOWN: u8 = 0x50;
    pub const PRESETS: u8 = 0x71;
    pub const CALIBRATE: u8 = 0x81;
    pub const THEME: u8 = 0x85;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonSource {
    UpDown,
    Preset(PresetId),
    Calibrate,
    ThemeSelect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub source: ButtonSource,
    pub edge: PressEdge,
    /// Up/down: 1 lowers, 2 raises. Theme: the selection byte.
    pub value: u8,
}

impl ButtonEvent {
    /// Map one panel report `(vp, key code, data byte)`; unknown codes give `None`.
    pub fn from_vp_code(vp: u8, code: u8, value: u8) -> Option<Self> {
        let ev = |source, edge, value| Some(Self { source, edge, value });
        match vp {
            vp::UP_DOWN => match code {
                0x01 | 0x02 => ev(ButtonSource::UpDown, PressEdge::Press, code),
                0x03 | 0x04 => ev(ButtonSource::UpDown, PressEdge::Release, code),
                _ => None,
            },
            vp::PRESETS => {
                let (id, edge) = match code {
                    0x05 => (1, PressEdge::Press),
                    0x06 => (1, PressEdge::Hold),
                    0x11 => (1, PressEdge::Release),
                    0x07 => (2, PressEdge::Press),
                    0x08 => (2, PressEdge::Hold),
                    0x12 => (2, PressEdge::Release),
                    0x09 => (3, PressEdge::Press),
                    0x10 => (3, PressEdge::Hold),
                    0x13 => (3, PressEdge::Release),
                    _ => return None,
                };
                ev(ButtonSource::Preset(PresetId::new(id)?), edge, code)
            }
            vp::CALIBRATE if code == 0x00 => ev(ButtonSource::Calibrate, PressEdge::Press, 0),
            vp::THEME => ev(ButtonSource::ThemeSelect, PressEdge::Press, value),
            _ => None,
        }
    }
}

/// Turns button events into motor commands, preset saves/recalls and theme changes.
pub struct PanelDispatcher<C: Clock> {
    decoder: PresetInputDecoder,
    settings: Settings,
    bus: EventBus,
    shared: SharedState,
    clock: C,
    epoch: Instant,
}

impl<C: Clock> PanelDispatcher<C> {
    pub fn new(long_press_us: u64, settings: Settings, bus: EventBus, shared: SharedState, clock: C) -> Self {
        let epoch = clock.now();
        Self {
            decoder: PresetInputDecoder::new(long_press_us),
            settings,
            bus,
            shared,
            clock,
            epoch,
        }
    }

    pub fn decoder(&self) -> &PresetInputDecoder {
        &self.decoder
    }

    pub fn dispatch(&mut self, ev: ButtonEvent) {
        tracing::debug!(?ev, "button");
        match ev.source {
            ButtonSource::UpDown => {
                let cmd = match (ev.edge, ev.value) {
                    (PressEdge::Press, 0x01) => MotorCommand::Backward,
                    (PressEdge::Press, 0x02) => MotorCommand::Forward,
                    _ => MotorCommand::Stop,
                };
                self.bus.motor.post(cmd);
            }
            ButtonSource::Preset(id) => {
                let now_us = self.clock.us_since(self.epoch);
                match self.decoder.on_edge(id, ev.edge, now_us) {
                    Some(PresetAction::Save(id)) => {
                        self.bus.motor.post(MotorCommand::SavePosition(id));
                    }
                    Some(PresetAction::Recall(id)) => match self.settings.load_preset(id) {
                        Some(target) => {
                            self.bus.motor.post(MotorCommand::GotoPosition(target));
                        }
                        None => tracing::warn!(preset = %id, "preset not stored; ignoring recall"),
                    },
                    None => {}
                }
            }
            ButtonSource::Calibrate => {
                self.bus.motor.post(MotorCommand::Calibrate);
            }
            ButtonSource::ThemeSelect => {
                let theme = match ev.value {
                    0x01 => Theme::Alternate,
                    0x02 => Theme::Primary,
                    other => {
                        tracing::debug!(value = other, "unknown theme selection");
                        return;
                    }
                };
                self.settings.save_theme(theme);
                self.shared.theme.set(theme);
                let page = lift_ui::pages::theme_applied(theme, self.shared.host_connected.get());
                self.bus.display.post(DisplayMsg::SetPage(page));
                tracing::info!(?theme, "theme changed");
            }
        }
    }

    /// Dispatch events from `rx` until shutdown or the sender is gone.
    pub fn run(mut self, rx: &xch::Receiver<ButtonEvent>, shutdown: &Flag, poll: Duration) {
        while !shutdown.get() {
            match rx.recv_timeout(poll) {
                Ok(ev) => self.dispatch(ev),
                Err(xch::RecvTimeoutError::Timeout) => {}
                Err(xch::RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::debug!("panel dispatcher exiting");
    }
}
