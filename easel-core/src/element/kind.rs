//! # Shape kinds
//!
//! One tagged variant per shape kind, with free functions implementing the
//! per-kind geometry contract. This replaces a deep subtype hierarchy: the
//! element record is shared, only outline construction and capability
//! defaults vary by kind.

use kurbo::{BezPath, Point, Rect, Shape as _};

/// Flattening tolerance for curved base outlines, in pixels.
const CURVE_TOLERANCE: f64 = 0.1;

#[derive(Clone, PartialEq, Debug, strum::EnumDiscriminants)]
#[strum_discriminants(name(ShapeTag), derive(strum::Display, Hash))]
pub enum ShapeKind {
    Rect,
    Oval,
    Triangle,
    /// Closed polygon. Points are normalized to the element's bounds:
    /// `(0, 0)` is the top-left corner, `(1, 1)` the bottom-right.
    Polygon { points: Vec<Point> },
    /// Pie wedge: the arc from `start_deg` sweeping `sweep_deg` counter-
    /// clockwise, closed through the center.
    Arc { start_deg: f64, sweep_deg: f64 },
    /// Free-form closed path, normalized to the unit square like
    /// [`Polygon`](Self::Polygon) points. Combine results land here.
    Path { path: BezPath },
    Text { content: String },
    /// Composite of owned children. Child positions are relative to the
    /// group's top-left; ownership is strictly tree-shaped.
    Group {
        children: Vec<super::Element>,
    },
}

impl ShapeKind {
    #[must_use]
    pub fn tag(&self) -> ShapeTag {
        self.into()
    }
    /// Whether this kind exposes an outline the combine engine can operate on.
    #[must_use]
    pub fn has_combinable_outline(&self) -> bool {
        matches!(
            self,
            Self::Rect
                | Self::Oval
                | Self::Triangle
                | Self::Polygon { .. }
                | Self::Arc { .. }
                | Self::Path { .. }
        )
    }
    #[must_use]
    pub fn has_outline(&self) -> bool {
        !matches!(self, Self::Text { .. } | Self::Group { .. })
    }
    #[must_use]
    pub fn has_fill(&self) -> bool {
        !matches!(self, Self::Group { .. })
    }
    #[must_use]
    pub fn has_dash(&self) -> bool {
        self.has_outline()
    }
    #[must_use]
    pub fn supports_flip(&self) -> bool {
        self.has_combinable_outline()
    }
    /// Kinds with in-place editing claim pass-through pointer input on
    /// double-click.
    #[must_use]
    pub fn supports_edit(&self) -> bool {
        matches!(self, Self::Text { .. })
    }
}

/// Build the base-space (unrotated, unsheared) outline of a kind, filling the
/// given pixel rect. Kinds without a combinable outline fall back to their
/// frame rectangle.
#[must_use]
pub fn outline(kind: &ShapeKind, frame: Rect) -> BezPath {
    match kind {
        ShapeKind::Rect | ShapeKind::Text { .. } | ShapeKind::Group { .. } => frame.to_path(0.0),
        ShapeKind::Oval => kurbo::Ellipse::from_rect(frame).to_path(CURVE_TOLERANCE),
        ShapeKind::Triangle => {
            let mut path = BezPath::new();
            path.move_to((frame.min_x() + frame.width() / 2.0, frame.min_y()));
            path.line_to((frame.max_x(), frame.max_y()));
            path.line_to((frame.min_x(), frame.max_y()));
            path.close_path();
            path
        }
        ShapeKind::Polygon { points } => {
            let mut path = BezPath::new();
            let mut iter = points.iter().map(|p| {
                Point::new(
                    frame.min_x() + p.x * frame.width(),
                    frame.min_y() + p.y * frame.height(),
                )
            });
            if let Some(first) = iter.next() {
                path.move_to(first);
                for p in iter {
                    path.line_to(p);
                }
                path.close_path();
            }
            path
        }
        ShapeKind::Path { path } => {
            let fit = kurbo::Affine::translate(frame.origin().to_vec2())
                * kurbo::Affine::scale_non_uniform(frame.width(), frame.height());
            fit * path.clone()
        }
        ShapeKind::Arc {
            start_deg,
            sweep_deg,
        } => {
            let center = frame.center();
            let arc = kurbo::Arc {
                center,
                radii: kurbo::Vec2::new(frame.width() / 2.0, frame.height() / 2.0),
                start_angle: start_deg.to_radians(),
                sweep_angle: sweep_deg.to_radians(),
                x_rotation: 0.0,
            };
            let mut path = arc.to_path(CURVE_TOLERANCE);
            // Close through the center to form a wedge with well-defined area.
            path.line_to(center);
            path.close_path();
            path
        }
    }
}

/// Mirror a kind's internal geometry about its vertical center line.
/// Kinds whose outline is symmetric need no point surgery; the flip flag
/// alone covers them at paint time.
pub fn mirror_horizontal(kind: &mut ShapeKind) {
    match kind {
        ShapeKind::Polygon { points } => {
            for p in points {
                p.x = 1.0 - p.x;
            }
        }
        ShapeKind::Path { path } => {
            // x -> 1 - x within the normalized unit square.
            *path = kurbo::Affine::new([-1.0, 0.0, 0.0, 1.0, 1.0, 0.0]) * path.clone();
        }
        ShapeKind::Arc {
            start_deg,
            sweep_deg,
        } => {
            *start_deg = (180.0 - (*start_deg + *sweep_deg)).rem_euclid(360.0);
        }
        _ => {}
    }
}

/// Mirror a kind's internal geometry about its horizontal center line.
pub fn mirror_vertical(kind: &mut ShapeKind) {
    match kind {
        ShapeKind::Polygon { points } => {
            for p in points {
                p.y = 1.0 - p.y;
            }
        }
        ShapeKind::Path { path } => {
            *path = kurbo::Affine::new([1.0, 0.0, 0.0, -1.0, 0.0, 1.0]) * path.clone();
        }
        ShapeKind::Arc {
            start_deg,
            sweep_deg,
        } => {
            *start_deg = (-(*start_deg + *sweep_deg)).rem_euclid(360.0);
        }
        _ => {}
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rect_outline_covers_frame() {
        let frame = Rect::new(10.0, 20.0, 110.0, 70.0);
        let path = outline(&ShapeKind::Rect, frame);
        assert_eq!(path.bounding_box(), frame);
    }

    #[test]
    fn polygon_mirror_involution() {
        let original = vec![
            Point::new(0.1, 0.0),
            Point::new(1.0, 0.4),
            Point::new(0.3, 1.0),
        ];
        let mut kind = ShapeKind::Polygon {
            points: original.clone(),
        };
        mirror_horizontal(&mut kind);
        let ShapeKind::Polygon { points } = &kind else {
            panic!("kind changed");
        };
        assert_ne!(*points, original);
        mirror_horizontal(&mut kind);
        let ShapeKind::Polygon { points } = &kind else {
            panic!("kind changed");
        };
        // Mirroring twice is the identity up to floating-point rounding.
        for (before, after) in original.iter().zip(points) {
            assert!((*after - *before).hypot() < 1e-12, "{after:?} vs {before:?}");
        }
    }

    #[test]
    fn group_has_no_own_style_surface() {
        let kind = ShapeKind::Group { children: vec![] };
        assert!(!kind.has_outline());
        assert!(!kind.has_fill());
        assert!(!kind.has_combinable_outline());
    }
}
