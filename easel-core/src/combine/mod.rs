//! # Combine
//!
//! Boolean set algebra over element outlines, plus the area/perimeter
//! measurement utilities used for diagnostics and validation.
//!
//! The engine is purely geometric: it maps N outlines to one result outline,
//! or to nothing when the accumulated area is empty. Document surgery
//! (removing inputs, inserting the result element) lives in
//! [`crate::session`], which only commits once this engine reports success.

mod polygon;

pub use polygon::PolygonSet;
use polygon::BooleanVerb;

use kurbo::{BezPath, PathEl, Rect};

/// Default flattening tolerance for curved outlines entering the engine,
/// in pixels.
pub const DEFAULT_TOLERANCE: f64 = 0.25;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum CombineOp {
    /// Outline union of all inputs.
    Union,
    /// The reference (lowest-z) outline minus each other outline in turn.
    Subtract,
    /// Running intersection of all inputs.
    Intersect,
    /// Running XOR, composed as (A ∪ B) − (A ∩ B) per step.
    SymmetricDifference,
}

/// Apply `op` pairwise over the outlines, accumulating left-to-right. The
/// first outline is the reference. Returns None when the accumulated result
/// has empty area - the caller must leave its inputs untouched in that case.
#[must_use]
pub fn combine_outlines(op: CombineOp, outlines: &[BezPath], tolerance: f64) -> Option<BezPath> {
    let mut sets = outlines
        .iter()
        .map(|path| PolygonSet::from_path(path, tolerance));
    let mut accumulated = sets.next()?;
    for next in sets {
        accumulated = match op {
            CombineOp::Union => polygon::boolean(&accumulated, &next, BooleanVerb::Union),
            CombineOp::Subtract => polygon::boolean(&accumulated, &next, BooleanVerb::Difference),
            CombineOp::Intersect => {
                polygon::boolean(&accumulated, &next, BooleanVerb::Intersection)
            }
            CombineOp::SymmetricDifference => {
                let union = polygon::boolean(&accumulated, &next, BooleanVerb::Union);
                let overlap = polygon::boolean(&accumulated, &next, BooleanVerb::Intersection);
                polygon::boolean(&union, &overlap, BooleanVerb::Difference)
            }
        };
        if accumulated.is_empty() {
            break;
        }
    }
    if accumulated.is_empty() || accumulated.gross_area() < 1e-9 {
        log::debug!("combine {op} produced an empty result");
        return None;
    }
    Some(accumulated.to_path())
}

/// Approximate enclosed area by two-pass rectangular-slice integration:
/// vertical strips of width `resolution`, then horizontal strips, averaged.
/// Deterministic for a given resolution; intentionally approximate for
/// curved outlines.
#[must_use]
pub fn area(path: &BezPath, resolution: f64) -> f64 {
    if resolution <= 0.0 {
        return 0.0;
    }
    let set = PolygonSet::from_path(path, resolution / 4.0);
    if set.is_empty() {
        return 0.0;
    }
    let bbox = set.bounding_box();
    let vertical = slice_pass(&set, bbox, resolution, false);
    let horizontal = slice_pass(&set, bbox, resolution, true);
    (vertical + horizontal) / 2.0
}

/// One integration pass. `transposed` sweeps horizontal strips instead.
fn slice_pass(set: &PolygonSet, bbox: Rect, resolution: f64, transposed: bool) -> f64 {
    let (sweep_min, sweep_max) = if transposed {
        (bbox.min_y(), bbox.max_y())
    } else {
        (bbox.min_x(), bbox.max_x())
    };
    let mut total = 0.0;
    let mut strip_start = sweep_min;
    while strip_start < sweep_max {
        let strip_width = resolution.min(sweep_max - strip_start);
        let strip_center = strip_start + strip_width / 2.0;
        total += strip_width * covered_length(set, strip_center, transposed);
        strip_start += resolution;
    }
    total
}

/// Total length of the polygon's cross-section along a scanline.
fn covered_length(set: &PolygonSet, at: f64, transposed: bool) -> f64 {
    // Even-odd crossing intervals along the scanline.
    let mut crossings: smallvec::SmallVec<[f64; 8]> = smallvec::SmallVec::new();
    for ring in &set.rings {
        let n = ring.len();
        for i in 0..n {
            let (mut a, mut b) = (ring[i], ring[(i + 1) % n]);
            if transposed {
                (a, b) = (
                    kurbo::Point::new(a.y, a.x),
                    kurbo::Point::new(b.y, b.x),
                );
            }
            if (a.x > at) != (b.x > at) {
                crossings.push(a.y + (at - a.x) / (b.x - a.x) * (b.y - a.y));
            }
        }
    }
    crossings.sort_by(f64::total_cmp);
    crossings
        .chunks_exact(2)
        .map(|pair| pair[1] - pair[0])
        .sum()
}

/// Approximate outline length by flattening curves at the given tolerance
/// and summing Euclidean segment lengths, closing edges included.
#[must_use]
pub fn perimeter(path: &BezPath, flatness: f64) -> f64 {
    let mut total = 0.0;
    let mut subpath_start = kurbo::Point::ZERO;
    let mut previous = kurbo::Point::ZERO;
    kurbo::flatten(path.elements().iter().copied(), flatness, |el| match el {
        PathEl::MoveTo(p) => {
            subpath_start = p;
            previous = p;
        }
        PathEl::LineTo(p) => {
            total += (p - previous).hypot();
            previous = p;
        }
        PathEl::ClosePath => {
            total += (subpath_start - previous).hypot();
            previous = subpath_start;
        }
        PathEl::QuadTo(..) | PathEl::CurveTo(..) => unreachable!(),
    });
    total
}
