//! # Grouping
//!
//! Pure composition/decomposition of group elements. The document surgery
//! and history discipline around these live in [`crate::session`]; this
//! module only computes the geometry.
//!
//! Ownership is strictly tree-shaped: a child belongs to exactly one parent
//! group (or the document root), and groups may contain groups.

use crate::element::{Element, ShapeKind, Size};
use crate::id::CopyKind;
use kurbo::{Point, Rect, Vec2};

/// Union of the transformed margin-bounds of the given elements, in pixels.
/// Returns None for an empty input.
#[must_use]
pub fn union_margin_bounds<'a>(
    elements: impl IntoIterator<Item = &'a Element>,
    scale: f64,
) -> Option<Rect> {
    elements
        .into_iter()
        .map(|e| e.margin_bounds(scale))
        .reduce(|acc, r| acc.union(r))
}

/// Build a composite element from the given members (topmost first, i.e.
/// document z-order). Members are copied identity-preserved and repositioned
/// relative to the group's origin; the group's frame is the union of their
/// transformed margin-bounds.
///
/// Returns None when fewer than two members are supplied - a group of one is
/// a geometric no-op the caller reports as zero-effect.
#[must_use]
pub fn compose(members: &[&Element], scale: f64) -> Option<Element> {
    if members.len() < 2 {
        return None;
    }
    let bounds_px = union_margin_bounds(members.iter().copied(), scale)?;
    let origin = Point::new(bounds_px.min_x() / scale, bounds_px.min_y() / scale);
    let children: Vec<Element> = members
        .iter()
        .map(|member| {
            let mut child = member.copy(CopyKind::NotForNew);
            child.set_selected(false);
            let absolute = child.position();
            child.place(Point::new(absolute.x - origin.x, absolute.y - origin.y));
            child
        })
        .collect();
    let mut group = Element::new(
        ShapeKind::Group { children },
        origin,
        Size::new(bounds_px.width() / scale, bounds_px.height() / scale),
    );
    group.set_selected(true);
    Some(group)
}

/// Restore a group's children to absolute coordinates, compounding the
/// group's own rotation into each child. Children come back in their
/// original relative z-order, selected. Returns None if the element is not
/// a group.
#[must_use]
pub fn decompose(group: &Element) -> Option<Vec<Element>> {
    let ShapeKind::Group { children } = &group.kind else {
        return None;
    };
    let origin = group.position();
    let group_rotation = group.rotation();
    let group_size = group.layout_size();
    let group_center = Point::new(
        origin.x + group_size.width / 2.0,
        origin.y + group_size.height / 2.0,
    );
    let restored = children
        .iter()
        .map(|child| {
            let mut restored = child.copy(CopyKind::NotForNew);
            let relative = restored.position();
            let mut absolute = Point::new(origin.x + relative.x, origin.y + relative.y);
            if group_rotation != 0.0 {
                // Orbit the child's center about the group center, then fold
                // the group's rotation into the child's own.
                let size = restored.layout_size();
                let half = Vec2::new(size.width / 2.0, size.height / 2.0);
                let center = absolute + half;
                let spun = rotate_about(center, group_center, group_rotation.to_radians());
                absolute = spun - half;
                restored.set_rotation(restored.rotation() + group_rotation);
            }
            restored.place(absolute);
            restored.set_selected(true);
            restored
        })
        .collect();
    Some(restored)
}

fn rotate_about(p: Point, pivot: Point, radians: f64) -> Point {
    let (sin, cos) = radians.sin_cos();
    let v = p - pivot;
    pivot + Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::element::ShapeKind;

    fn member(x: f64, y: f64, w: f64, h: f64) -> Element {
        let mut e = Element::new(ShapeKind::Rect, Point::new(x, y), Size::new(w, h));
        e.outline = None; // keep margin-bounds equal to transformed bounds
        e
    }

    #[test]
    fn group_of_one_is_rejected() {
        let a = member(0.0, 0.0, 1.0, 1.0);
        assert!(compose(&[&a], 72.0).is_none());
    }

    #[test]
    fn compose_positions_children_relative() {
        let a = member(1.0, 1.0, 2.0, 1.0);
        let b = member(4.0, 2.0, 1.0, 1.0);
        let group = compose(&[&a, &b], 72.0).unwrap();
        assert!(group.is_selected());
        assert_eq!(group.position(), Point::new(1.0, 1.0));
        let bounds = group.bounds();
        assert!((bounds.width - 4.0).abs() < 1e-9);
        assert!((bounds.height - 2.0).abs() < 1e-9);
        let ShapeKind::Group { children } = &group.kind else {
            panic!("not a group");
        };
        assert_eq!(children[0].position(), Point::new(0.0, 0.0));
        assert_eq!(children[1].position(), Point::new(3.0, 1.0));
        // Identity preserved for round-tripping.
        assert_eq!(children[0].id(), a.id());
        assert_eq!(children[1].id(), b.id());
    }

    #[test]
    fn round_trip_restores_absolute_geometry() {
        let mut a = member(1.0, 1.0, 2.0, 1.0);
        a.set_rotation(15.0);
        let b = member(4.0, 2.0, 1.0, 1.0);
        let group = compose(&[&a, &b], 72.0).unwrap();
        let restored = decompose(&group).unwrap();
        assert_eq!(restored.len(), 2);
        for (before, after) in [(&a, &restored[0]), (&b, &restored[1])] {
            assert_eq!(before.id(), after.id());
            assert!((before.position() - after.position()).hypot() < 1e-9);
            assert!((before.rotation() - after.rotation()).abs() < 1e-9);
            assert!(after.is_selected());
        }
    }

    #[test]
    fn group_rotation_compounds_into_children() {
        let a = member(0.0, 0.0, 2.0, 2.0);
        let b = member(4.0, 0.0, 2.0, 2.0);
        let mut group = compose(&[&a, &b], 72.0).unwrap();
        group.set_rotation(180.0);
        let restored = decompose(&group).unwrap();
        // Group frame spans (0,0)..(6,2); under a half turn the two children
        // swap places about its center (3,1).
        assert!((restored[0].position() - Point::new(4.0, 0.0)).hypot() < 1e-9);
        assert!((restored[1].position() - Point::new(0.0, 0.0)).hypot() < 1e-9);
        assert!((restored[0].rotation() - 180.0).abs() < 1e-9);
    }
}
