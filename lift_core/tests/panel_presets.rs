use std::sync::Arc;
use std::time::Duration;

use lift_core::mocks::MemoryStore;
use lift_core::{ButtonEvent, DisplayMsg, EventBus, MotorCommand, PanelDispatcher, PresetId, Settings, SharedState};
use lift_traits::clock::test_clock::TestClock;
use lift_ui::Theme;

struct Fixture {
    panel: PanelDispatcher<TestClock>,
    bus: EventBus,
    shared: SharedState,
    settings: Settings,
    clock: TestClock,
}

fn fixture() -> Fixture {
    let (shared, _height) = SharedState::new(Theme::Primary);
    let bus = EventBus::new(16);
    let settings = Settings::new(Arc::new(MemoryStore::new()));
    let clock = TestClock::new();
    let panel = PanelDispatcher::new(3_000_000, settings.clone(), bus.clone(), shared.clone(), clock.clone());
    Fixture {
        panel,
        bus,
        shared,
        settings,
        clock,
    }
}

fn key(vp: u8, code: u8) -> ButtonEvent {
    ButtonEvent::from_vp_code(vp, code, 0).unwrap()
}

fn preset(n: u8) -> PresetId {
    PresetId::new(n).unwrap()
}

#[test]
fn short_press_recalls_stored_height() {
    let mut f = fixture();
    f.settings.save_preset(preset(1), 12.5);
    f.panel.dispatch(key(0x71, 0x05));
    f.clock.advance(Duration::from_millis(800));
    f.panel.dispatch(key(0x71, 0x11));
    assert_eq!(f.bus.motor.drain(), vec![MotorCommand::GotoPosition(12.5)]);
}

#[test]
fn long_hold_saves_and_release_does_not_recall() {
    let mut f = fixture();
    f.settings.save_preset(preset(2), 8.0);
    f.panel.dispatch(key(0x71, 0x07));
    f.clock.advance(Duration::from_millis(1_500));
    f.panel.dispatch(key(0x71, 0x08));
    assert!(f.bus.motor.is_empty(), "hold before the threshold does nothing");
    f.clock.advance(Duration::from_millis(1_500));
    f.panel.dispatch(key(0x71, 0x08));
    f.panel.dispatch(key(0x71, 0x12));
    assert_eq!(f.bus.motor.drain(), vec![MotorCommand::SavePosition(preset(2))]);
}

#[test]
fn recall_of_an_empty_slot_enqueues_nothing() {
    let mut f = fixture();
    f.panel.dispatch(key(0x71, 0x09));
    f.panel.dispatch(key(0x71, 0x13));
    assert!(f.bus.motor.is_empty());
}

#[test]
fn up_down_keys_map_to_jog_commands() {
    let mut f = fixture();
    for code in [0x01, 0x02, 0x03, 0x04] {
        f.panel.dispatch(key(0x50, code));
    }
    assert_eq!(
        f.bus.motor.drain(),
        vec![
            MotorCommand::Backward,
            MotorCommand::Forward,
            MotorCommand::Stop,
            MotorCommand::Stop
        ]
    );
}

#[test]
fn calibrate_key_enqueues_calibration() {
    let mut f = fixture();
    f.panel.dispatch(key(0x81, 0x00));
    assert_eq!(f.bus.motor.drain(), vec![MotorCommand::Calibrate]);
    assert!(ButtonEvent::from_vp_code(0x81, 0x01, 0).is_none());
}

#[test]
fn theme_selection_is_persisted_and_confirmed() {
    let mut f = fixture();
    f.panel.dispatch(ButtonEvent::from_vp_code(0x85, 0x00, 0x01).unwrap());
    assert_eq!(f.settings.theme(), Theme::Alternate);
    assert_eq!(f.shared.theme.get(), Theme::Alternate);
    assert_eq!(f.bus.display.drain(), vec![DisplayMsg::SetPage(20)]);

    f.shared.host_connected.set(true);
    f.panel.dispatch(ButtonEvent::from_vp_code(0x85, 0x00, 0x02).unwrap());
    assert_eq!(f.settings.theme(), Theme::Primary);
    assert_eq!(f.bus.display.drain(), vec![DisplayMsg::SetPage(10)]);
}
