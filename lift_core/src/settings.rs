//! Typed access to the persisted settings.
//!
//! Storage failures never stop the controller: reads degrade to "not found"
//! and writes are logged and skipped.
use crate::hw_error::map_hw_error;
use crate::presets::PresetId;
use crate::shared::Bounds;
use lift_traits::KvStore;
use lift_ui::Theme;
use std::sync::Arc;

pub const KEY_BOTTOM: &str = "limit_bottom";
pub const KEY_TOP: &str = "limit_top";
pub const KEY_THEME: &str = "theme";
pub const KEY_DEVICE_NAME: &str = "device_name";

#[derive(Clone)]
pub struct Settings {
    store: Arc<dyn KvStore>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings").finish_non_exhaustive()
    }
}

impl Settings {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn float(&self, key: &str) -> Option<f32> {
        match self.store.load_float(key) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key, error = %map_hw_error(&*e), "settings read failed");
                None
            }
        }
    }

    fn int(&self, key: &str) -> Option<i32> {
        match self.store.load_int(key) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key, error = %map_hw_error(&*e), "settings read failed");
                None
            }
        }
    }

    fn log_write(key: &str, res: Result<(), lift_traits::BoxError>) -> bool {
        match res {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %map_hw_error(&*e), "settings write failed");
                false
            }
        }
    }

    /// Stored bounds, or `None` when either end is missing, outside
    /// `[floor, ceiling]`, or the pair is inverted.
    pub fn load_bounds(&self, floor: f32, ceiling: f32) -> Option<Bounds> {
        let bottom = self.float(KEY_BOTTOM);
        let top = self.float(KEY_TOP);
        let (Some(bottom), Some(top)) = (bottom, top) else {
            tracing::info!("no stored bounds");
            return None;
        };
        let b = Bounds::new(bottom, top).filter(|b| b.within(floor, ceiling));
        if b.is_none() {
            tracing::warn!(bottom, top, floor, ceiling, "stored bounds rejected");
        }
        b
    }

    pub fn save_bottom(&self, mm: f32) -> bool {
        Self::log_write(KEY_BOTTOM, self.store.save_float(KEY_BOTTOM, mm))
    }

    pub fn save_top(&self, mm: f32) -> bool {
        Self::log_write(KEY_TOP, self.store.save_float(KEY_TOP, mm))
    }

    /// Presets are stored as integer thousandths of a millimetre.
    pub fn save_preset(&self, id: PresetId, mm: f32) -> bool {
        let key = id.key();
        let milli = (mm * 1000.0).round() as i32;
        Self::log_write(&key, self.store.save_int(&key, milli))
    }

    pub fn load_preset(&self, id: PresetId) -> Option<f32> {
        self.int(&id.key()).map(|milli| milli as f32 / 1000.0)
    }

    /// Stored theme, defaulting to the primary one.
    pub fn theme(&self) -> Theme {
        self.int(KEY_THEME).map(Theme::from_stored).unwrap_or_default()
    }

    pub fn save_theme(&self, theme: Theme) -> bool {
        Self::log_write(KEY_THEME, self.store.save_int(KEY_THEME, theme.stored()))
    }

    pub fn device_name(&self) -> Option<String> {
        match self.store.load_string(KEY_DEVICE_NAME) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %map_hw_error(&*e), "device name read failed");
                None
            }
        }
    }

    pub fn save_device_name(&self, name: &str) -> bool {
        Self::log_write(
            KEY_DEVICE_NAME,
            self.store.save_string(KEY_DEVICE_NAME, name),
        )
    }

    /// Stored device name; when none exists `default` is stored and returned.
    pub fn device_name_or_default(&self, default: &str) -> String {
        if let Some(name) = self.device_name() {
            return name;
        }
        tracing::info!(name = default, "storing default device name");
        self.save_device_name(default);
        default.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MemoryStore;

    fn settings() -> (Arc<MemoryStore>, Settings) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), Settings::new(store))
    }

    #[test]
    fn bounds_out_of_range_count_as_missing() {
        let (store, s) = settings();
        assert!(s.load_bounds(3.0, 20.0).is_none());
        store.save_float(KEY_BOTTOM, 2.0).unwrap();
        store.save_float(KEY_TOP, 15.0).unwrap();
        assert!(s.load_bounds(3.0, 20.0).is_none());
        s.save_bottom(4.5);
        assert_eq!(s.load_bounds(3.0, 20.0), Bounds::new(4.5, 15.0));
        s.save_top(4.0);
        assert!(s.load_bounds(3.0, 20.0).is_none(), "inverted");
    }

    #[test]
    fn presets_keep_three_decimals() {
        let (store, s) = settings();
        let id = PresetId::new(3).unwrap();
        assert_eq!(s.load_preset(id), None);
        s.save_preset(id, 12.3456);
        assert_eq!(store.load_int("preset3").unwrap(), Some(12_346));
        assert!((s.load_preset(id).unwrap() - 12.346).abs() < 1e-4);
    }

    #[test]
    fn default_device_name_is_written_back() {
        let (store, s) = settings();
        assert_eq!(s.device_name_or_default("Desk"), "Desk");
        assert_eq!(store.load_string(KEY_DEVICE_NAME).unwrap().as_deref(), Some("Desk"));
        s.save_device_name("Office");
        assert_eq!(s.device_name_or_default("Desk"), "Office");
    }

    #[test]
    fn theme_defaults_to_primary() {
        let (_store, s) = settings();
        assert_eq!(s.theme(), Theme::Primary);
        s.save_theme(Theme::Alternate);
        assert_eq!(s.theme(), Theme::Alternate);
    }

    #[test]
    fn failing_store_degrades() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let s = Settings::new(store);
        assert!(s.load_bounds(3.0, 20.0).is_none());
        assert!(!s.save_bottom(5.0));
        assert_eq!(s.theme(), Theme::Primary);
    }
}
