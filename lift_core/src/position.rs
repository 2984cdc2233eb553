//! Height to discrete panel step, with hysteresis.
//!
//! The computed index is `trunc(map(h, [bottom, top], [0, n-1])) + 1`,
//! clamped to `[1, n]`. Once an index is committed it moves by one only when
//! the height leaves the committed zone by more than 10% of a step width.
use crate::shared::Bounds;

/// Share of one step width the height must overshoot a zone edge by.
pub const HYSTERESIS_FRACTION: f32 = 0.10;

#[derive(Debug, Clone)]
pub struct PositionStep {
    resolution: u8,
    committed: Option<u8>,
}

impl PositionStep {
    pub fn new(resolution: u8) -> Self {
        Self {
            resolution: resolution.max(1),
            committed: None,
        }
    }

    pub fn resolution(&self) -> u8 {
        self.resolution
    }

    pub fn committed(&self) -> Option<u8> {
        self.committed
    }

    /// Index without hysteresis.
    pub fn raw_index(&self, height_mm: f32, bounds: Bounds) -> u8 {
        let n = f32::from(self.resolution);
        let mapped = (height_mm - bounds.bottom_mm) * (n - 1.0) / bounds.span_mm();
        let idx = (mapped as i32).saturating_add(1);
        idx.clamp(1, i32::from(self.resolution)) as u8
    }

    /// Width of one zone in mm.
    pub fn step_mm(&self, bounds: Bounds) -> f32 {
        bounds.span_mm() / f32::from(self.resolution)
    }

    /// `[low, high]` heights that keep `index` committed.
    pub fn band(&self, index: u8, bounds: Bounds) -> (f32, f32) {
        let w = self.step_mm(bounds);
        let zone_min = bounds.bottom_mm + f32::from(index.saturating_sub(1)) * w;
        let zone_max = zone_min + w;
        let h = HYSTERESIS_FRACTION * w;
        (zone_min - h, zone_max + h)
    }

    /// Evaluate one height and return the committed index.
    pub fn update(&mut self, height_mm: f32, bounds: Bounds) -> u8 {
        let Some(prev) = self.committed else {
            let idx = self.raw_index(height_mm, bounds);
            self.committed = Some(idx);
            return idx;
        };
        let (low, high) = self.band(prev, bounds);
        let next = if height_mm < low {
            prev.saturating_sub(1)
        } else if height_mm > high {
            prev.saturating_add(1)
        } else {
            prev
        };
        let next = next.clamp(1, self.resolution);
        self.committed = Some(next);
        next
    }
}

/// Both panel resolutions tracked side by side.
#[derive(Debug, Clone)]
pub struct PositionMapper {
    coarse: PositionStep,
    fine: PositionStep,
}

impl Default for PositionMapper {
    fn default() -> Self {
        Self::new(10, 20)
    }
}

impl PositionMapper {
    pub fn new(coarse: u8, fine: u8) -> Self {
        Self {
            coarse: PositionStep::new(coarse),
            fine: PositionStep::new(fine),
        }
    }

    /// `(coarse, fine)` indices, both 1-based.
    pub fn update(&mut self, height_mm: f32, bounds: Bounds) -> (u8, u8) {
        (
            self.coarse.update(height_mm, bounds),
            self.fine.update(height_mm, bounds),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn b() -> Bounds {
        Bounds::new(4.0, 14.0).unwrap()
    }

    #[rstest]
    #[case(4.0, 1)]
    #[case(3.0, 1)]
    #[case(9.0, 5)]
    #[case(14.0, 10)]
    #[case(30.0, 10)]
    fn first_evaluation_adopts_computed_index(#[case] h: f32, #[case] want: u8) {
        let mut s = PositionStep::new(10);
        assert_eq!(s.update(h, b()), want);
    }

    #[test]
    fn boundary_jitter_does_not_flicker() {
        let mut s = PositionStep::new(10);
        // step width 1.0 mm, band for index 5 is [7.9, 9.1]
        assert_eq!(s.update(9.0, b()), 5);
        for h in [9.05, 8.95, 9.09, 7.95] {
            assert_eq!(s.update(h, b()), 5, "h={h}");
        }
        assert_eq!(s.update(9.2, b()), 6);
        assert_eq!(s.update(7.0, b()), 5);
    }

    #[test]
    fn mapper_tracks_both_resolutions() {
        let mut m = PositionMapper::default();
        assert_eq!(m.update(14.0, b()), (10, 20));
        assert_eq!(m.update(4.0, b()), (9, 19));
    }
}
