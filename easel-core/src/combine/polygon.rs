//! Flattened-polygon boolean clipping.
//!
//! Outlines arrive as bezier paths, get flattened into closed rings, and the
//! boolean operations work on ring edges: split every edge at its crossings
//! with the other polygon, classify each fragment by midpoint inclusion
//! (even-odd), keep the fragments the operation asks for, and stitch the
//! kept fragments back into closed rings.

use kurbo::{BezPath, PathEl, Point, Rect};

/// Closed loop of vertices. The closing edge (last -> first) is implicit.
pub type Ring = Vec<Point>;

/// Endpoint quantization for stitching, in output units. Fragments whose
/// endpoints land within this grid cell are considered connected.
const WELD_GRID: f64 = 1e-6;
/// Rings with less signed area than this are discarded as numerical noise.
const NOISE_AREA: f64 = 1e-9;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolygonSet {
    pub rings: Vec<Ring>,
}

impl PolygonSet {
    /// Flatten a path into closed rings at the given tolerance.
    #[must_use]
    pub fn from_path(path: &BezPath, tolerance: f64) -> Self {
        let mut rings: Vec<Ring> = Vec::new();
        let mut current: Ring = Vec::new();
        kurbo::flatten(path.elements().iter().copied(), tolerance, |el| match el {
            PathEl::MoveTo(p) => {
                if current.len() >= 3 {
                    rings.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
                current.push(p);
            }
            PathEl::LineTo(p) => current.push(p),
            PathEl::ClosePath => {
                if current.len() >= 3 {
                    rings.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            }
            // Flatten produces no curves.
            PathEl::QuadTo(..) | PathEl::CurveTo(..) => unreachable!(),
        });
        if current.len() >= 3 {
            rings.push(current);
        }
        let mut set = Self { rings };
        set.drop_noise();
        set
    }

    #[must_use]
    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        for ring in &self.rings {
            let mut iter = ring.iter();
            if let Some(first) = iter.next() {
                path.move_to(*first);
                for p in iter {
                    path.line_to(*p);
                }
                path.close_path();
            }
        }
        path
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// Sum of unsigned ring areas (shoelace). For even-odd ring sets this
    /// over-counts holes, but it is exactly zero iff the covered area is
    /// degenerate, which is all the combine failure check needs.
    #[must_use]
    pub fn gross_area(&self) -> f64 {
        self.rings.iter().map(|ring| shoelace(ring).abs()).sum()
    }

    #[must_use]
    pub fn bounding_box(&self) -> Rect {
        let mut points = self.rings.iter().flatten();
        let Some(first) = points.next() else {
            return Rect::ZERO;
        };
        points.fold(Rect::from_points(*first, *first), |acc, p| {
            acc.union_pt(*p)
        })
    }

    /// Even-odd point containment over all rings.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        let mut inside = false;
        for ring in &self.rings {
            for (a, b) in ring_edges(ring) {
                if (a.y > p.y) != (b.y > p.y) {
                    let cross_x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                    if cross_x > p.x {
                        inside = !inside;
                    }
                }
            }
        }
        inside
    }

    fn drop_noise(&mut self) {
        self.rings
            .retain(|ring| ring.len() >= 3 && shoelace(ring).abs() > NOISE_AREA);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Keep {
    Inside,
    Outside,
}

/// One boolean operation over two flattened polygon sets.
///
/// Union keeps A-outside-B with B-outside-A; intersection keeps
/// A-inside-B with B-inside-A; difference keeps A-outside-B with
/// B-inside-A (the B fragments become the hole boundary). Symmetric
/// difference is composed by the caller as (A ∪ B) − (A ∩ B).
#[must_use]
pub fn boolean(a: &PolygonSet, b: &PolygonSet, op: BooleanVerb) -> PolygonSet {
    let (keep_a, keep_b) = match op {
        BooleanVerb::Union => (Keep::Outside, Keep::Outside),
        BooleanVerb::Intersection => (Keep::Inside, Keep::Inside),
        BooleanVerb::Difference => (Keep::Outside, Keep::Inside),
    };
    let mut fragments = kept_fragments(a, b, keep_a);
    fragments.extend(kept_fragments(b, a, keep_b));
    let mut result = stitch(fragments);
    result.drop_noise();
    result
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BooleanVerb {
    Union,
    Intersection,
    Difference,
}

/// Split every edge of `subject` at its crossings with `clip` and keep the
/// fragments whose midpoint lies on the requested side of `clip`.
fn kept_fragments(subject: &PolygonSet, clip: &PolygonSet, keep: Keep) -> Vec<(Point, Point)> {
    let mut kept = Vec::new();
    for ring in &subject.rings {
        for (start, end) in ring_edges(ring) {
            let mut cuts = vec![0.0, 1.0];
            for clip_ring in &clip.rings {
                for (c0, c1) in ring_edges(clip_ring) {
                    if let Some(t) = segment_crossing(start, end, c0, c1) {
                        cuts.push(t);
                    }
                }
            }
            cuts.sort_by(f64::total_cmp);
            for pair in cuts.windows(2) {
                let [t0, t1] = [pair[0], pair[1]];
                if t1 - t0 < 1e-12 {
                    continue;
                }
                let p0 = lerp(start, end, t0);
                let p1 = lerp(start, end, t1);
                let midpoint = lerp(start, end, (t0 + t1) / 2.0);
                let inside = clip.contains(midpoint);
                if (inside && keep == Keep::Inside) || (!inside && keep == Keep::Outside) {
                    kept.push((p0, p1));
                }
            }
        }
    }
    kept
}

/// Reassemble undirected fragments into closed rings by welding endpoints on
/// a fine grid and walking connected chains.
fn stitch(fragments: Vec<(Point, Point)>) -> PolygonSet {
    use hashbrown::HashMap;

    let key = |p: Point| -> (i64, i64) {
        (
            (p.x / WELD_GRID).round() as i64,
            (p.y / WELD_GRID).round() as i64,
        )
    };

    // Adjacency: welded endpoint -> fragment indices touching it.
    let mut adjacency: HashMap<(i64, i64), smallvec::SmallVec<[usize; 2]>> = HashMap::new();
    for (idx, (p0, p1)) in fragments.iter().enumerate() {
        adjacency.entry(key(*p0)).or_default().push(idx);
        adjacency.entry(key(*p1)).or_default().push(idx);
    }

    let mut used = vec![false; fragments.len()];
    let mut rings = Vec::new();
    for seed in 0..fragments.len() {
        if used[seed] {
            continue;
        }
        used[seed] = true;
        let (ring_start, mut cursor) = fragments[seed];
        let mut ring = vec![ring_start];
        let start_key = key(ring_start);
        loop {
            ring.push(cursor);
            if key(cursor) == start_key {
                // Closed. Last point duplicates the first; drop it.
                ring.pop();
                break;
            }
            let Some(candidates) = adjacency.get(&key(cursor)) else {
                // Open chain - numerical orphan. Discard.
                ring.clear();
                break;
            };
            let Some(&next) = candidates.iter().find(|&&idx| !used[idx]) else {
                ring.clear();
                break;
            };
            used[next] = true;
            let (n0, n1) = fragments[next];
            // Continue out the far end of the fragment we just entered.
            cursor = if key(n0) == key(cursor) { n1 } else { n0 };
        }
        if ring.len() >= 3 {
            rings.push(ring);
        }
    }
    PolygonSet { rings }
}

/// Parameter on `a0..a1` of a transversal crossing with `b0..b1`, if any.
fn segment_crossing(a0: Point, a1: Point, b0: Point, b1: Point) -> Option<f64> {
    let d1 = a1 - a0;
    let d2 = b1 - b0;
    let denominator = d1.cross(d2);
    if denominator.abs() < 1e-12 {
        // Parallel or collinear - no transversal crossing.
        return None;
    }
    let offset = b0 - a0;
    let t = offset.cross(d2) / denominator;
    let u = offset.cross(d1) / denominator;
    ((0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)).then_some(t)
}

fn lerp(a: Point, b: Point, t: f64) -> Point {
    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

fn ring_edges(ring: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    ring.iter()
        .zip(ring.iter().cycle().skip(1))
        .take(ring.len())
        .map(|(a, b)| (*a, *b))
}

fn shoelace(ring: &[Point]) -> f64 {
    let mut doubled = 0.0;
    for (a, b) in ring_edges(ring) {
        doubled += a.x * b.y - b.x * a.y;
    }
    doubled / 2.0
}
