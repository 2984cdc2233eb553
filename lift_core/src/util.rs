//! Small numeric helpers shared by the filters and monitors.

/// Round to one decimal place, the resolution the height is published at.
#[inline]
pub fn round_tenth(v: f32) -> f32 {
    (v * 10.0).round() / 10.0
}

/// Largest multiple of `step` that is `<= v`. A non-positive step returns `v`.
#[inline]
pub fn floor_to_step(v: f32, step: f32) -> f32 {
    if step <= 0.0 {
        return v;
    }
    (v / step).floor() * step
}

/// Smallest multiple of `step` that is `>= v`. A non-positive step returns `v`.
#[inline]
pub fn ceil_to_step(v: f32, step: f32) -> f32 {
    if step <= 0.0 {
        return v;
    }
    (v / step).ceil() * step
}
