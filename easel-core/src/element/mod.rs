//! # Elements
//!
//! The unit of scene content: one record holding identity, geometry,
//! transform state, capability flags and style attributes, with a tagged
//! [`ShapeKind`] for the per-kind payload.
//!
//! Geometry mutators are silent no-ops when the element lacks the capability.
//! Callers are expected to consult the capability predicates before offering
//! an action, and the core never turns a denied mutation into an error.

pub mod kind;
pub mod style;

pub use kind::{ShapeKind, ShapeTag};

use crate::id::{CopyKind, ElementId};
use kurbo::{Affine, BezPath, Point, Rect};

bitflags::bitflags! {
    /// What a consumer is allowed to do with an element.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        const SELECTABLE = 1;
        const RESIZABLE = 1 << 1;
        const MOVABLE = 1 << 2;
        const VISIBLE = 1 << 3;
        /// Whether the element may be copied, deleted, or combined.
        const MUTABLE = 1 << 4;
    }
}
impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Width and height in units. Negative values mean "fill to container",
/// resolved only at paint time when the container is known.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}
impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Resolved layout dimensions are never permitted to reach exactly zero.
/// This is the substitute floor, in units.
const MIN_LAYOUT_UNITS: f64 = 1e-3;
/// Extra margin painted by a drop shadow, in pixels.
const SHADOW_MARGIN_PX: f64 = 4.0;

/// A polymorphic scene node: geometry, transform state, capabilities, style.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    id: ElementId,
    pub kind: ShapeKind,
    /// Top-left corner, in units.
    position: Point,
    /// Width/height in units; negative means fill-to-container.
    bounds: Size,
    /// Degrees, normalized to `[0, 360)`.
    rotation: f64,
    shear_x: f64,
    shear_y: f64,
    flipped_h: bool,
    flipped_v: bool,
    caps: Capabilities,
    pub outline: Option<style::OutlineStyle>,
    pub fill: Option<style::FillStyle>,
    pub shadow: bool,
    // Transient interaction state. Not part of the persisted contract.
    selected: bool,
    has_changes: bool,
}

impl Element {
    #[must_use]
    pub fn new(kind: ShapeKind, position: Point, bounds: Size) -> Self {
        Self {
            id: ElementId::new(),
            outline: kind.has_outline().then(style::OutlineStyle::default),
            fill: kind.has_fill().then(style::FillStyle::default),
            kind,
            position,
            bounds,
            rotation: 0.0,
            shear_x: 0.0,
            shear_y: 0.0,
            flipped_h: false,
            flipped_v: false,
            caps: Capabilities::default(),
            shadow: false,
            selected: false,
            has_changes: false,
        }
    }
    /// Copy this element. `ForNew` (paste, duplicate) regenerates identity
    /// down through any owned children; `NotForNew` (history snapshots,
    /// grouping internals) preserves it.
    #[must_use]
    pub fn copy(&self, copy_kind: CopyKind) -> Self {
        let mut copy = self.clone();
        if copy_kind == CopyKind::ForNew {
            copy.id = ElementId::new();
            copy.selected = false;
            copy.has_changes = true;
            if let ShapeKind::Group { children } = &mut copy.kind {
                for child in children.iter_mut() {
                    *child = child.copy(CopyKind::ForNew);
                }
            }
        }
        copy
    }

    // ---- identity & transient state ----

    #[must_use]
    pub fn id(&self) -> ElementId {
        self.id
    }
    /// Restore a persisted identity. Only meaningful while reconstructing a
    /// document from its serialized form.
    pub fn restore_id(&mut self, id: ElementId) {
        self.id = id;
    }
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected
    }
    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
    /// Dirty flag: has any mutation happened since the last save?
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.has_changes
    }
    pub fn mark_saved(&mut self) {
        self.has_changes = false;
    }

    // ---- capability predicates ----

    #[must_use]
    pub fn is_selectable(&self) -> bool {
        self.caps.contains(Capabilities::SELECTABLE)
    }
    #[must_use]
    pub fn is_resizable(&self) -> bool {
        self.caps.contains(Capabilities::RESIZABLE)
    }
    #[must_use]
    pub fn is_movable(&self) -> bool {
        self.caps.contains(Capabilities::MOVABLE)
    }
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.caps.contains(Capabilities::VISIBLE)
    }
    #[must_use]
    pub fn is_mutable(&self) -> bool {
        self.caps.contains(Capabilities::MUTABLE)
    }
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }
    pub fn set_capabilities(&mut self, caps: Capabilities) {
        self.caps = caps;
    }
    #[must_use]
    pub fn supports_flip(&self) -> bool {
        self.kind.supports_flip()
    }
    #[must_use]
    pub fn supports_edit(&self) -> bool {
        self.kind.supports_edit()
    }
    #[must_use]
    pub fn has_outline(&self) -> bool {
        self.kind.has_outline()
    }
    #[must_use]
    pub fn has_fill(&self) -> bool {
        self.kind.has_fill()
    }
    #[must_use]
    pub fn has_dash(&self) -> bool {
        self.kind.has_dash()
    }

    // ---- geometry accessors ----

    /// Top-left corner, in units.
    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }
    /// Top-left corner, in pixels at the given scale.
    #[must_use]
    pub fn position_pixels(&self, scale: f64) -> Point {
        Point::new(self.position.x * scale, self.position.y * scale)
    }
    /// Stored width/height in units. May be negative (fill-to-container).
    #[must_use]
    pub fn bounds(&self) -> Size {
        self.bounds
    }
    #[must_use]
    pub fn rotation(&self) -> f64 {
        self.rotation
    }
    #[must_use]
    pub fn shear_x(&self) -> f64 {
        self.shear_x
    }
    #[must_use]
    pub fn shear_y(&self) -> f64 {
        self.shear_y
    }
    #[must_use]
    pub fn is_flipped_horizontal(&self) -> bool {
        self.flipped_h
    }
    #[must_use]
    pub fn is_flipped_vertical(&self) -> bool {
        self.flipped_v
    }

    /// Layout width/height in units: negative (fill-to-container) bounds and
    /// anything at or below zero resolve to the minimum floor, never zero.
    #[must_use]
    pub fn layout_size(&self) -> Size {
        Size {
            width: self.bounds.width.max(MIN_LAYOUT_UNITS),
            height: self.bounds.height.max(MIN_LAYOUT_UNITS),
        }
    }
    /// The base (unrotated, unsheared) frame in pixels at the given scale.
    #[must_use]
    pub fn frame_rect(&self, scale: f64) -> Rect {
        let size = self.layout_size();
        Rect::new(
            self.position.x * scale,
            self.position.y * scale,
            (self.position.x + size.width) * scale,
            (self.position.y + size.height) * scale,
        )
    }

    // ---- mutators ----

    /// Internal placement for grouping/combine reparenting. Bypasses the
    /// movable capability and the off-canvas rule on purpose: the caller is
    /// restructuring the scene, not acting for the user.
    pub(crate) fn place(&mut self, position: Point) {
        self.position = position;
        self.has_changes = true;
    }
    /// Set the absolute top-left position in units. No-op if not movable, or
    /// if the new position would put the element entirely off the negative
    /// side of the origin or entirely past either limit.
    pub fn reposition(&mut self, x: f64, y: f64, x_limit: f64, y_limit: f64) {
        if !self.is_movable() {
            return;
        }
        let size = self.layout_size();
        if axis_on_canvas(x, size.width, x_limit) && axis_on_canvas(y, size.height, y_limit) {
            self.position = Point::new(x, y);
            self.has_changes = true;
        }
    }
    /// Relative move in units. Each axis is clamped independently by the same
    /// off-canvas rule - one axis may move while the other is rejected.
    pub fn translate(&mut self, dx: f64, dy: f64, x_limit: f64, y_limit: f64) {
        if !self.is_movable() {
            return;
        }
        let size = self.layout_size();
        let x = self.position.x + dx;
        let y = self.position.y + dy;
        if axis_on_canvas(x, size.width, x_limit) {
            self.position.x = x;
            self.has_changes = true;
        }
        if axis_on_canvas(y, size.height, y_limit) {
            self.position.y = y;
            self.has_changes = true;
        }
    }
    /// Set the size from pixel dimensions. Dimensions below `min_size_px`
    /// (including zero and negative) substitute the floor rather than
    /// clamping to zero or rejecting. No-op if not resizable.
    pub fn change_size(&mut self, w_px: f64, h_px: f64, min_size_px: f64, scale: f64) {
        if !self.is_resizable() {
            return;
        }
        let w = if w_px < min_size_px { min_size_px } else { w_px };
        let h = if h_px < min_size_px { min_size_px } else { h_px };
        self.bounds = Size::new(w / scale, h / scale);
        self.has_changes = true;
    }
    /// Grow (or shrink, negative delta) by pixel deltas.
    pub fn grow(&mut self, dw_px: f64, dh_px: f64, min_size_px: f64, scale: f64) {
        let size = self.layout_size();
        self.change_size(
            size.width * scale + dw_px,
            size.height * scale + dh_px,
            min_size_px,
            scale,
        );
    }
    /// Grow by a width delta, deriving the height delta from the current
    /// height:width ratio.
    pub fn grow_keep_aspect(&mut self, dw_px: f64, min_size_px: f64, scale: f64) {
        let size = self.layout_size();
        let ratio = size.height / size.width;
        self.grow(dw_px, dw_px * ratio, min_size_px, scale);
    }
    /// Rotate by a delta in degrees. The stored value is always normalized
    /// into `[0, 360)`.
    pub fn rotate_by(&mut self, delta_deg: f64) {
        self.set_rotation(self.rotation + delta_deg);
    }
    pub fn set_rotation(&mut self, deg: f64) {
        self.rotation = deg.rem_euclid(360.0);
        self.has_changes = true;
    }
    /// Cumulative horizontal shear.
    pub fn shear_x_by(&mut self, delta: f64) {
        self.set_shear_x(self.shear_x + delta);
    }
    /// Cumulative vertical shear.
    pub fn shear_y_by(&mut self, delta: f64) {
        self.set_shear_y(self.shear_y + delta);
    }
    pub fn set_shear_x(&mut self, shear: f64) {
        self.shear_x = shear;
        self.has_changes = true;
    }
    pub fn set_shear_y(&mut self, shear: f64) {
        self.shear_y = shear;
        self.has_changes = true;
    }
    /// Toggle the horizontal flip flag, mirroring kind-internal geometry.
    /// No-op unless the kind supports flipping.
    pub fn flip_horizontal(&mut self) {
        if !self.supports_flip() {
            return;
        }
        self.flipped_h = !self.flipped_h;
        kind::mirror_horizontal(&mut self.kind);
        self.has_changes = true;
    }
    /// Toggle the vertical flip flag, mirroring kind-internal geometry.
    pub fn flip_vertical(&mut self) {
        if !self.supports_flip() {
            return;
        }
        self.flipped_v = !self.flipped_v;
        kind::mirror_vertical(&mut self.kind);
        self.has_changes = true;
    }

    // ---- transform pipeline ----

    /// The composite transform mapping base (unrotated, unsheared) element
    /// space to scene space: translate-to-center, shear, rotate, translate
    /// back. With `to_base` the inverse is returned, mapping scene points
    /// into base space for hit-testing and resize math.
    ///
    /// Derived purely from rotation, shear, and bounds, with no hidden
    /// state, so rendering and hit-testing can never disagree.
    #[must_use]
    pub fn element_transform(&self, scale: f64, to_base: bool) -> Affine {
        let center = self.frame_rect(scale).center().to_vec2();
        let transform = Affine::translate(center)
            * Affine::rotate(self.rotation.to_radians())
            * Affine::new([1.0, self.shear_y, self.shear_x, 1.0, 0.0, 0.0])
            * Affine::translate(-center);
        if to_base {
            let det = transform.determinant();
            if det.abs() < 1e-12 {
                // A shear product of exactly 1 collapses the element to a
                // line. Reachable through the public shear setters, so this
                // is user geometry, not a bug. Nothing sensible to invert;
                // fall back to identity.
                log::warn!(
                    "degenerate element transform (det {det}), shear {} x {}",
                    self.shear_x,
                    self.shear_y
                );
                return Affine::IDENTITY;
            }
            transform.inverse()
        } else {
            transform
        }
    }
    /// Corners of the base frame mapped into scene space, clockwise from the
    /// top-left.
    #[must_use]
    pub fn transformed_corners(&self, scale: f64) -> [Point; 4] {
        let frame = self.frame_rect(scale);
        let transform = self.element_transform(scale, false);
        [
            transform * Point::new(frame.min_x(), frame.min_y()),
            transform * Point::new(frame.max_x(), frame.min_y()),
            transform * Point::new(frame.max_x(), frame.max_y()),
            transform * Point::new(frame.min_x(), frame.max_y()),
        ]
    }
    /// Axis-aligned bounds of the transformed element, in pixels.
    #[must_use]
    pub fn transformed_bounds(&self, scale: f64) -> Rect {
        let [a, b, c, d] = self.transformed_corners(scale);
        Rect::from_points(a, b)
            .union(Rect::from_points(c, d))
    }
    /// Transformed bounds enlarged by whatever paints outside the nominal
    /// geometry: stroke half-width and the drop-shadow margin. Used for
    /// dirty-region and grouping-bounds computation.
    #[must_use]
    pub fn margin_bounds(&self, scale: f64) -> Rect {
        let mut margin = self.outline.map_or(0.0, |outline| outline.width / 2.0);
        if self.shadow {
            margin += SHADOW_MARGIN_PX;
        }
        self.transformed_bounds(scale).inflate(margin, margin)
    }
    /// Scene-space position of the element's lower-right corner, in pixels.
    #[must_use]
    pub fn lower_right_corner(&self, scale: f64) -> Point {
        let frame = self.frame_rect(scale);
        self.element_transform(scale, false) * Point::new(frame.max_x(), frame.max_y())
    }
    /// Hit test a scene-space pixel point against the transformed frame.
    #[must_use]
    pub fn contains(&self, point: Point, scale: f64) -> bool {
        let base = self.element_transform(scale, true) * point;
        self.frame_rect(scale).contains(base)
    }
    /// The element's outline in scene space, for the combine engine.
    #[must_use]
    pub fn scene_outline(&self, scale: f64) -> BezPath {
        let base = kind::outline(&self.kind, self.frame_rect(scale));
        self.element_transform(scale, false) * base
    }

    // ---- lifecycle & external hooks ----

    /// Called by the scene document after insertion.
    pub fn added_to(&mut self, document: crate::state::document::DocumentId) {
        log::trace!("{} added to {document}", self.id);
    }
    /// Called by the scene document after removal.
    pub fn removed_from(&mut self, document: crate::state::document::DocumentId) {
        log::trace!("{} removed from {document}", self.id);
    }
    /// Invoked on double-click. Returns whether the element claims
    /// pass-through pointer input (in-place editing).
    pub fn selected_for_edit(&mut self) -> bool {
        self.supports_edit()
    }
    /// Invoked when pass-through editing ends.
    pub fn deselected_for_edit(&mut self) {}
    /// Pointer forwarding while this element owns input. `point` is in scene
    /// pixels; returns true if the event was swallowed. A miss outside the
    /// element is the caller's cue to end pass-through.
    pub fn handle_pointer_event(&mut self, point: Point, scale: f64) -> bool {
        self.contains(point, scale)
    }
    /// Paint through the external render contract: pixel width/height are
    /// resolved here (negative bounds fill the container) and handed over.
    pub fn paint(&self, target: &mut dyn PaintTarget, scale: f64, container_px: (f64, f64)) {
        if !self.is_visible() {
            return;
        }
        let width = if self.bounds.width < 0.0 {
            container_px.0
        } else {
            self.bounds.width * scale
        };
        let height = if self.bounds.height < 0.0 {
            container_px.1
        } else {
            self.bounds.height * scale
        };
        target.paint_element(
            self,
            width.max(MIN_LAYOUT_UNITS * scale),
            height.max(MIN_LAYOUT_UNITS * scale),
        );
    }
}

/// Is a span `[pos, pos + extent]` at least partially on-canvas, given the
/// far limit?
fn axis_on_canvas(pos: f64, extent: f64, limit: f64) -> bool {
    pos + extent > 0.0 && pos < limit
}

/// External rendering contract. The core resolves pixel dimensions and
/// forwards; fill/stroke/shadow compositing happens on the other side.
pub trait PaintTarget {
    fn paint_element(&mut self, element: &Element, width_px: f64, height_px: f64);
}
