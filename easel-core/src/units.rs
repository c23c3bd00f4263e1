//! # Units
//!
//! Stored geometry lives in abstract document units; rendering and pointer
//! input live in device pixels. The relationship is a fixed constant.
//! Display zoom is a separate multiplicative factor that never touches
//! stored geometry.

/// Pixels per document unit. One unit is one typographic inch at the scale
/// defined by W3C (72 points per inch).
pub const PIXELS_PER_UNIT: f64 = 72.0;
pub const UNITS_PER_PIXEL: f64 = 1.0 / PIXELS_PER_UNIT;

/// Convert a length in units to device pixels.
#[must_use]
pub fn to_pixels(units: f64) -> f64 {
    units * PIXELS_PER_UNIT
}

/// Convert a length in device pixels to units.
#[must_use]
pub fn to_units(pixels: f64) -> f64 {
    pixels * UNITS_PER_PIXEL
}

/// Display-only magnification. Applies to rendering and pointer mapping,
/// never to stored geometry.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Zoom(f64);

impl Zoom {
    pub const MIN: f64 = 1.0;
    pub const MAX: f64 = 4.0;
    pub const STEP: f64 = 0.25;

    /// Construct a zoom factor, clamped into `[MIN, MAX]`.
    #[must_use]
    pub fn new(factor: f64) -> Self {
        Self(factor.clamp(Self::MIN, Self::MAX))
    }
    #[must_use]
    pub fn factor(self) -> f64 {
        self.0
    }
    /// Step up by one increment, saturating at [`Self::MAX`].
    #[must_use = "returns the new zoom and does not modify `self`"]
    pub fn zoom_in(self) -> Self {
        Self::new(self.0 + Self::STEP)
    }
    /// Step down by one increment, saturating at [`Self::MIN`].
    #[must_use = "returns the new zoom and does not modify `self`"]
    pub fn zoom_out(self) -> Self {
        Self::new(self.0 - Self::STEP)
    }
}
impl Default for Zoom {
    fn default() -> Self {
        Self(Self::MIN)
    }
}
impl std::fmt::Display for Zoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0 * 100.0)
    }
}
