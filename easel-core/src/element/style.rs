//! Fill, outline, and dash attributes attached to an element.
//!
//! These are opaque to the core: rendering interprets them, combine copies
//! them from the reference element into its result.

/// 8-bit straight-alpha color.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}
impl Rgba {
    pub const BLACK: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum DashPattern {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

/// Stroke drawn along an element's outline.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OutlineStyle {
    pub color: Rgba,
    /// Width in pixels. Half of it paints outside the nominal bounds, which
    /// is why margin-bounds must account for it.
    pub width: f64,
    pub dash: DashPattern,
}
impl Default for OutlineStyle {
    fn default() -> Self {
        Self {
            color: Rgba::BLACK,
            width: 1.0,
            dash: DashPattern::Solid,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FillStyle {
    pub color: Rgba,
}
impl Default for FillStyle {
    fn default() -> Self {
        Self {
            color: Rgba::WHITE,
        }
    }
}
