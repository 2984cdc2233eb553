//! Single-writer cells for the state several activities observe.
//!
//! Each value is published with one atomic store, so a reader always sees a
//! complete value from some cycle, never a half-written one. Nothing here
//! takes a lock.
use lift_ui::Theme;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, Ordering};

/// Create the filtered-height cell. The writer half is not `Clone`: whoever
/// owns it (the height sampler) is the only activity that publishes heights.
pub fn height_cell() -> (HeightWriter, HeightReader) {
    let cell = Arc::new(AtomicU32::new(0.0f32.to_bits()));
    (HeightWriter(cell.clone()), HeightReader(cell))
}

#[derive(Debug)]
pub struct HeightWriter(Arc<AtomicU32>);

impl HeightWriter {
    pub fn publish(&self, mm: f32) {
        self.0.store(mm.to_bits(), Ordering::Relaxed);
    }

    pub fn reader(&self) -> HeightReader {
        HeightReader(self.0.clone())
    }
}

#[derive(Debug, Clone)]
pub struct HeightReader(Arc<AtomicU32>);

impl HeightReader {
    /// Last committed height in mm; 0.0 before the first batch.
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Calibrated travel envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub bottom_mm: f32,
    pub top_mm: f32,
}

impl Bounds {
    /// `None` unless both ends are finite and `bottom < top`.
    pub fn new(bottom_mm: f32, top_mm: f32) -> Option<Self> {
        if bottom_mm.is_finite() && top_mm.is_finite() && bottom_mm < top_mm {
            Some(Self { bottom_mm, top_mm })
        } else {
            None
        }
    }

    pub fn center_mm(&self) -> f32 {
        (self.top_mm + self.bottom_mm) / 2.0
    }

    pub fn span_mm(&self) -> f32 {
        self.top_mm - self.bottom_mm
    }

    /// Both ends lie inside `[floor, ceiling]`.
    pub fn within(&self, floor: f32, ceiling: f32) -> bool {
        (floor..=ceiling).contains(&self.bottom_mm) && (floor..=ceiling).contains(&self.top_mm)
    }
}

const UNSET_BOUNDS: u64 = pack(f32::NAN, f32::NAN);

const fn pack(bottom: f32, top: f32) -> u64 {
    ((bottom.to_bits() as u64) << 32) | top.to_bits() as u64
}

/// Bounds packed into one `AtomicU64` so bottom and top always change together.
/// Written only by the motion controller.
#[derive(Debug, Clone)]
pub struct BoundsCell(Arc<AtomicU64>);

impl Default for BoundsCell {
    fn default() -> Self {
        Self(Arc::new(AtomicU64::new(UNSET_BOUNDS)))
    }
}

impl BoundsCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> Option<Bounds> {
        let bits = self.0.load(Ordering::Relaxed);
        let bottom = f32::from_bits((bits >> 32) as u32);
        let top = f32::from_bits(bits as u32);
        Bounds::new(bottom, top)
    }

    pub fn store(&self, b: Bounds) {
        self.0.store(pack(b.bottom_mm, b.top_mm), Ordering::Relaxed);
    }
}

/// Shared boolean (lockout, host link, shutdown).
#[derive(Debug, Clone, Default)]
pub struct Flag(Arc<AtomicBool>);

impl Flag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, v: bool) {
        self.0.store(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Currently selected panel theme, kept in sync with the persisted value.
#[derive(Debug, Clone)]
pub struct ThemeCell(Arc<AtomicI32>);

impl ThemeCell {
    pub fn new(theme: Theme) -> Self {
        Self(Arc::new(AtomicI32::new(theme.stored())))
    }

    pub fn get(&self) -> Theme {
        Theme::from_stored(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, theme: Theme) {
        self.0.store(theme.stored(), Ordering::Relaxed);
    }
}

/// Read handles for everything that crosses activity boundaries.
#[derive(Debug, Clone)]
pub struct SharedState {
    pub height: HeightReader,
    pub bounds: BoundsCell,
    /// Raised by the power monitor while the battery is critically low.
    pub lockout: Flag,
    pub host_connected: Flag,
    pub theme: ThemeCell,
}

impl SharedState {
    pub fn new(theme: Theme) -> (Self, HeightWriter) {
        let (writer, height) = height_cell();
        let shared = Self {
            height,
            bounds: BoundsCell::new(),
            lockout: Flag::new(),
            host_connected: Flag::new(),
            theme: ThemeCell::new(theme),
        };
        (shared, writer)
    }

    /// Idle page for the current theme and host-link state.
    pub fn idle_page(&self) -> u16 {
        lift_ui::pages::idle(self.theme.get(), self.host_connected.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cell_starts_empty_and_round_trips() {
        let cell = BoundsCell::new();
        assert!(cell.load().is_none());
        let b = Bounds::new(4.2, 17.3).unwrap();
        cell.store(b);
        assert_eq!(cell.clone().load(), Some(b));
        assert!((b.center_mm() - 10.75).abs() < 1e-5);
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        assert!(Bounds::new(10.0, 10.0).is_none());
        assert!(Bounds::new(12.0, 4.0).is_none());
        assert!(Bounds::new(f32::NAN, 4.0).is_none());
    }

    #[test]
    fn readers_see_published_heights() {
        let (w, r) = height_cell();
        assert_eq!(r.get(), 0.0);
        w.publish(11.4);
        assert_eq!(w.reader().get(), 11.4);
        assert_eq!(r.get(), 11.4);
    }

    #[test]
    fn idle_page_follows_theme_and_link() {
        let (shared, _w) = SharedState::new(Theme::Primary);
        assert_eq!(shared.idle_page(), 21);
        shared.host_connected.set(true);
        assert_eq!(shared.idle_page(), 5);
        shared.theme.set(Theme::Alternate);
        assert_eq!(shared.idle_page(), 1);
    }
}
