//! Preset buttons: short press recalls, long hold saves.
//!
//! Each preset has its own press timeline. The panel repeats `Hold` while a
//! button is held; once the hold has lasted `long_press_us` the save fires,
//! at most once per press. `Release` recalls only if the save did not fire,
//! and always returns the timeline to idle.
//!
//! Only one preset is armed at a time: the last one pressed.

/// Number of preset buttons on the panel.
pub const PRESET_COUNT: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PresetId(u8);

impl PresetId {
    /// `None` unless `1 <= id <= PRESET_COUNT`.
    pub fn new(id: u8) -> Option<Self> {
        (1..=PRESET_COUNT).contains(&id).then_some(Self(id))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Storage key for this preset's height.
    pub fn key(self) -> String {
        format!("preset{}", self.0)
    }

    fn slot(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl std::fmt::Display for PresetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressEdge {
    Press,
    Hold,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PressState {
    #[default]
    Idle,
    Pressed {
        start_us: u64,
    },
    HeldActionDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetAction {
    /// Long press: store the current height.
    Save(PresetId),
    /// Short press: travel to the stored height.
    Recall(PresetId),
}

#[derive(Debug, Clone)]
pub struct PresetInputDecoder {
    slots: [PressState; PRESET_COUNT as usize],
    armed: Option<PresetId>,
    long_press_us: u64,
}

impl PresetInputDecoder {
    pub fn new(long_press_us: u64) -> Self {
        Self {
            slots: [PressState::Idle; PRESET_COUNT as usize],
            armed: None,
            long_press_us,
        }
    }

    pub fn state(&self, id: PresetId) -> PressState {
        self.slots[id.slot()]
    }

    pub fn armed(&self) -> Option<PresetId> {
        self.armed
    }

    /// Feed one button edge observed at `now_us`.
    pub fn on_edge(&mut self, id: PresetId, edge: PressEdge, now_us: u64) -> Option<PresetAction> {
        let slot = id.slot();
        match edge {
            PressEdge::Press => {
                self.slots[slot] = PressState::Pressed { start_us: now_us };
                self.armed = Some(id);
                None
            }
            PressEdge::Hold => {
                if self.armed != Some(id) {
                    return None;
                }
                match self.slots[slot] {
                    PressState::Pressed { start_us }
                        if now_us.saturating_sub(start_us) >= self.long_press_us =>
                    {
                        self.slots[slot] = PressState::HeldActionDone;
                        tracing::info!(preset = %id, "long press: save");
                        Some(PresetAction::Save(id))
                    }
                    _ => None,
                }
            }
            PressEdge::Release => {
                let prev = std::mem::take(&mut self.slots[slot]);
                // any preset release clears the selection
                let was_armed = self.armed.take() == Some(id);
                match prev {
                    PressState::Pressed { .. } if was_armed => {
                        tracing::info!(preset = %id, "short press: recall");
                        Some(PresetAction::Recall(id))
                    }
                    PressState::HeldActionDone => {
                        tracing::debug!(preset = %id, "released after long press");
                        None
                    }
                    _ => None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: u8) -> PresetId {
        PresetId::new(n).unwrap()
    }

    #[test]
    fn ids_are_one_based() {
        assert!(PresetId::new(0).is_none());
        assert!(PresetId::new(4).is_none());
        assert_eq!(p(2).key(), "preset2");
    }

    #[test]
    fn short_press_recalls() {
        let mut d = PresetInputDecoder::new(3_000_000);
        assert_eq!(d.on_edge(p(1), PressEdge::Press, 0), None);
        assert_eq!(d.on_edge(p(1), PressEdge::Hold, 2_999_999), None);
        assert_eq!(
            d.on_edge(p(1), PressEdge::Release, 3_100_000),
            Some(PresetAction::Recall(p(1)))
        );
        assert_eq!(d.state(p(1)), PressState::Idle);
    }

    #[test]
    fn long_hold_saves_once_and_release_is_silent() {
        let mut d = PresetInputDecoder::new(3_000_000);
        d.on_edge(p(2), PressEdge::Press, 1_000);
        assert_eq!(
            d.on_edge(p(2), PressEdge::Hold, 3_001_000),
            Some(PresetAction::Save(p(2)))
        );
        assert_eq!(d.on_edge(p(2), PressEdge::Hold, 4_000_000), None);
        assert_eq!(d.on_edge(p(2), PressEdge::Release, 4_100_000), None);
        assert_eq!(d.state(p(2)), PressState::Idle);
        assert_eq!(d.armed(), None);
    }

    #[test]
    fn last_press_wins_the_arming() {
        let mut d = PresetInputDecoder::new(3_000_000);
        d.on_edge(p(1), PressEdge::Press, 0);
        d.on_edge(p(3), PressEdge::Press, 10);
        assert_eq!(d.armed(), Some(p(3)));
        // preset 1 is no longer armed: its hold does nothing
        assert_eq!(d.on_edge(p(1), PressEdge::Hold, 5_000_000), None);
        assert_eq!(
            d.on_edge(p(3), PressEdge::Release, 5_000_001),
            Some(PresetAction::Recall(p(3)))
        );
    }

    #[test]
    fn releasing_any_preset_clears_the_selection() {
        let mut d = PresetInputDecoder::new(3_000_000);
        d.on_edge(p(1), PressEdge::Press, 0);
        d.on_edge(p(3), PressEdge::Press, 10);
        assert_eq!(d.on_edge(p(1), PressEdge::Release, 20), None);
        assert_eq!(d.armed(), None);
        assert_eq!(d.state(p(1)), PressState::Idle);
        assert_eq!(d.on_edge(p(3), PressEdge::Hold, 5_000_000), None);
        assert_eq!(d.on_edge(p(3), PressEdge::Release, 5_000_001), None);
        assert_eq!(d.state(p(3)), PressState::Idle);
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut d = PresetInputDecoder::new(3_000_000);
        assert_eq!(d.on_edge(p(1), PressEdge::Release, 0), None);
    }
}
