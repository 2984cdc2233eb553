//! Display refresher: the only writer of the panel once the system runs.
//!
//! Each refresh maps the current height to both step resolutions and writes
//! them if they changed, then flushes the display queue. The queue is
//! coalesced: only the latest page and the latest value per address are
//! written, plus one beep if any was requested.
use crate::bus::{DisplayMsg, Queue};
use crate::hw_error::map_hw_error;
use crate::position::PositionMapper;
use crate::shared::{Flag, SharedState};
use lift_traits::clock::Clock;
use lift_traits::{BoxError, DisplaySink};
use lift_ui::addr;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Coalesced {
    pub page: Option<u16>,
    pub texts: BTreeMap<u16, String>,
    pub vps: BTreeMap<u16, u16>,
    pub beep: bool,
}

impl Coalesced {
    pub fn from_msgs(msgs: impl IntoIterator<Item = DisplayMsg>) -> Self {
        let mut out = Self::default();
        for m in msgs {
            match m {
                DisplayMsg::SetPage(p) => out.page = Some(p),
                DisplayMsg::SetText { addr, text } => {
                    out.texts.insert(addr, text);
                }
                DisplayMsg::SetVp { addr, value } => {
                    out.vps.insert(addr, value);
                }
                DisplayMsg::Beep => out.beep = true,
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.page.is_none() && self.texts.is_empty() && self.vps.is_empty() && !self.beep
    }

    fn apply(&self, sink: &mut dyn DisplaySink) -> Result<(), BoxError> {
        if let Some(p) = self.page {
            sink.set_page(p)?;
        }
        for (a, t) in &self.texts {
            sink.set_text(*a, t)?;
        }
        for (a, v) in &self.vps {
            sink.set_vp(*a, *v)?;
        }
        if self.beep {
            sink.beep()?;
        }
        Ok(())
    }
}

pub struct DisplayRefresher<D: DisplaySink> {
    sink: D,
    queue: Queue<DisplayMsg>,
    shared: SharedState,
    mapper: PositionMapper,
    shown: Option<(u8, u8)>,
}

impl<D: DisplaySink> DisplayRefresher<D> {
    pub fn new(sink: D, queue: Queue<DisplayMsg>, shared: SharedState) -> Self {
        Self {
            sink,
            queue,
            shared,
            mapper: PositionMapper::default(),
            shown: None,
        }
    }

    /// Update the step indicators from the current height.
    pub fn update_position(&mut self) {
        let h = self.shared.height.get();
        let Some(bounds) = self.shared.bounds.load() else {
            return;
        };
        if h <= 0.0 {
            return;
        }
        let steps = self.mapper.update(h, bounds);
        match self.write_steps(steps) {
            Ok(()) => self.shown = Some(steps),
            Err(e) => tracing::warn!(error = %map_hw_error(&*e), "panel write failed"),
        }
    }

    fn write_steps(&mut self, (coarse, fine): (u8, u8)) -> Result<(), BoxError> {
        let (prev_coarse, prev_fine) = self.shown.unzip();
        if prev_coarse != Some(coarse) {
            self.sink
                .set_text(addr::STEP_TEXT, &lift_ui::step_text(coarse))?;
            tracing::debug!(coarse, "step changed");
        }
        if prev_fine != Some(fine) {
            self.sink.set_vp(addr::FINE_STEP_VP, u16::from(fine - 1))?;
        }
        Ok(())
    }

    /// Write everything queued since the last flush.
    pub fn flush(&mut self) -> Coalesced {
        let batch = Coalesced::from_msgs(self.queue.drain());
        if !batch.is_empty()
            && let Err(e) = batch.apply(&mut self.sink)
        {
            tracing::warn!(error = %map_hw_error(&*e), "panel write failed");
        }
        batch
    }

    pub fn refresh(&mut self) {
        self.update_position();
        self.flush();
    }

    pub fn run<C: Clock>(mut self, clock: &C, period: Duration, shutdown: &Flag) {
        while !shutdown.get() {
            self.refresh();
            clock.sleep(period);
        }
        self.flush();
        tracing::debug!("display refresher exiting");
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::mocks::{DisplayOp, RecordingDisplay};
    use crate::shared::Bounds;
    use lift_ui::Theme;

    #[test]
    fn queue_is_coalesced_to_latest_values() {
        let c = Coalesced::from_msgs([
            DisplayMsg::SetPage(16),
            DisplayMsg::SetText { addr: 0x2000, text: "50     ".into() },
            DisplayMsg::Beep,
            DisplayMsg::SetPage(21),
            DisplayMsg::SetText { addr: 0x2000, text: "49     ".into() },
            DisplayMsg::Beep,
        ]);
        assert_eq!(c.page, Some(21));
        assert_eq!(c.texts.get(&0x2000).map(String::as_str), Some("49     "));
        assert!(c.beep);
    }

    #[test]
    fn steps_written_only_on_change() {
        let (shared, height) = SharedState::new(Theme::Primary);
        let bus = EventBus::default();
        let panel = RecordingDisplay::new();
        let mut r = DisplayRefresher::new(panel.clone(), bus.display.clone(), shared.clone());

        r.refresh();
        assert!(panel.ops().is_empty(), "no bounds yet");

        shared.bounds.store(Bounds::new(4.0, 14.0).unwrap());
        height.publish(9.0);
        r.refresh();
        assert_eq!(
            panel.ops(),
            vec![
                DisplayOp::Text(0x1000, "05".into()),
                DisplayOp::Vp(0x8100, 9)
            ]
        );
        panel.clear();
        r.refresh();
        assert!(panel.ops().is_empty());

        bus.display.post(DisplayMsg::SetPage(5));
        r.refresh();
        assert_eq!(panel.pages(), vec![5]);
    }
}
