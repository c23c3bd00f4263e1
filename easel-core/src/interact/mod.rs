//! # Interaction
//!
//! The selection and pointer state machine. Pointer events enter here,
//! serialized; the machine reads and writes the scene document's selection
//! and element geometry, and pushes exactly one history snapshot per
//! geometry-mutating gesture (at press, never during the drag).
//!
//! Implemented as a state machine transitioning on pointer events, in the
//! spirit of a tool layer: every state knows how to leave itself, and
//! cancellation always lands back in [`State::Idle`] with all drag-scoped
//! state cleared.

use crate::element::Element;
use crate::history::History;
use crate::id::ElementId;
use crate::state::SceneDocument;
use kurbo::{Point, Rect, Vec2};

/// Side of the square resize handle anchored at an element's transformed
/// lower-right corner, in pixels.
pub const HANDLE_SIZE_PX: f64 = 8.0;
/// Resize floor handed to `change_size` during handle drags, in pixels.
pub const MIN_RESIZE_PX: f64 = 8.0;

#[derive(Clone, Debug, PartialEq)]
pub struct PointerEvent {
    /// Scene position in pixels (already zoom-mapped by the caller).
    pub pos: Point,
    pub kind: PointerEventKind,
    /// Modifier-held click: toggles selection without clearing others.
    pub shift: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PointerEventKind {
    Press,
    Drag,
    Release,
    DoubleClick,
}

#[derive(Clone, Debug, PartialEq)]
pub enum State {
    Idle,
    /// Rubber-band multi-select; no element was hit at press.
    Selecting { anchor: Point, cursor: Point },
    /// An element is drag-repositioning.
    Moving {
        id: ElementId,
        /// Pointer offset from the element's top-left at press, in pixels.
        grab_offset: Vec2,
    },
    /// Corner-handle drag.
    Resizing {
        id: ElementId,
        /// Width/height at press, in pixels.
        original_px: (f64, f64),
        /// Pointer position at press, in pixels.
        press: Point,
    },
    /// An element owns pointer input (in-place editing).
    PassThrough { id: ElementId },
    /// An external drawing collaborator owns the canvas.
    ExternalDraw,
}

/// External drawing handoff: while registered, the collaborator receives all
/// pointer events and repaint requests instead of the normal state machine.
pub trait DrawCollaborator {
    fn pointer_event(&mut self, document: &mut SceneDocument, event: &PointerEvent);
    fn repaint(&mut self, document: &SceneDocument);
}

pub struct Interaction {
    state: State,
    external: Option<Box<dyn DrawCollaborator>>,
    /// Selection-highlight blink phase. Ephemeral render hint, advanced by
    /// the low-frequency tick; never touches structural state.
    blink_phase: u32,
}

impl Default for Interaction {
    fn default() -> Self {
        Self {
            state: State::Idle,
            external: None,
            blink_phase: 0,
        }
    }
}

impl Interaction {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn state(&self) -> &State {
        &self.state
    }
    /// Advance the selection-highlight blink. Safe to call from a timer:
    /// structural document state is never touched.
    pub fn tick(&mut self) {
        self.blink_phase = self.blink_phase.wrapping_add(1);
    }
    #[must_use]
    pub fn blink_on(&self) -> bool {
        self.blink_phase % 2 == 0
    }

    /// Hand the canvas to an external drawing collaborator. Fails (false) if
    /// one is already active.
    pub fn begin_external_draw(&mut self, collaborator: Box<dyn DrawCollaborator>) -> bool {
        if self.external.is_some() {
            return false;
        }
        self.external = Some(collaborator);
        self.state = State::ExternalDraw;
        true
    }
    pub fn end_external_draw(&mut self) -> Option<Box<dyn DrawCollaborator>> {
        let collaborator = self.external.take();
        if collaborator.is_some() {
            self.state = State::Idle;
        }
        collaborator
    }
    /// Forward a repaint request to the active collaborator, if any.
    /// Returns whether one consumed it.
    pub fn request_repaint(&mut self, document: &SceneDocument) -> bool {
        if let Some(external) = &mut self.external {
            external.repaint(document);
            true
        } else {
            false
        }
    }

    /// Abort any in-flight gesture without committing. Always lands in Idle
    /// with drag-scoped state cleared, even mid-drag.
    pub fn cancel(&mut self) {
        match self.state {
            State::Selecting { .. } | State::Moving { .. } | State::Resizing { .. } => {
                self.state = State::Idle;
            }
            State::Idle | State::PassThrough { .. } | State::ExternalDraw => {}
        }
    }

    /// Feed one serialized pointer event through the machine.
    pub fn pointer_event(
        &mut self,
        document: &mut SceneDocument,
        history: &mut History,
        event: &PointerEvent,
    ) {
        // An active external collaborator swallows everything.
        if let Some(external) = &mut self.external {
            external.pointer_event(document, event);
            return;
        }
        match event.kind {
            PointerEventKind::Press => self.press(document, history, event),
            PointerEventKind::Drag => self.drag(document, event),
            PointerEventKind::Release => self.release(document, event),
            PointerEventKind::DoubleClick => self.double_click(document, event),
        }
    }

    fn press(&mut self, document: &mut SceneDocument, history: &mut History, event: &PointerEvent) {
        let scale = document.pixel_scale();
        // Pass-through element owns input until it misses or disappears.
        if let State::PassThrough { id } = self.state {
            match document.get_mut(&id) {
                Some(element) => {
                    if element.handle_pointer_event(event.pos, scale) {
                        return;
                    }
                    element.deselected_for_edit();
                    self.state = State::Idle;
                }
                None => self.state = State::Idle,
            }
            // Fall through: the outside click is a normal press.
        }

        // Resize handles of the current selection win over element hits:
        // the handle square straddles the corner, so half of it lies outside
        // the element where top_hit would miss.
        for id in document.selected_ids() {
            let Some(element) = document.get(&id) else {
                continue;
            };
            if element.is_resizable() && resize_handle(element, scale).contains(event.pos) {
                let frame = element.frame_rect(scale);
                history.snapshot(document.sequence_snapshot());
                self.state = State::Resizing {
                    id,
                    original_px: (frame.width(), frame.height()),
                    press: event.pos,
                };
                return;
            }
        }

        let Some(hit) = document.top_hit(event.pos, scale) else {
            document.clear_selection();
            self.state = State::Selecting {
                anchor: event.pos,
                cursor: event.pos,
            };
            return;
        };

        if event.shift {
            document.select(&hit, true);
            if !document.get(&hit).is_some_and(Element::is_selected) {
                // Toggled off - nothing left to drag.
                self.state = State::Idle;
                return;
            }
        } else {
            // Plain click always narrows the selection to the hit, even when
            // the hit was already selected.
            document.select(&hit, false);
        }

        // Unwrap would be fine (top_hit just found it), but stay graceful.
        let Some(element) = document.get(&hit) else {
            self.state = State::Idle;
            return;
        };

        if element.is_resizable() && resize_handle(element, scale).contains(event.pos) {
            let frame = element.frame_rect(scale);
            history.snapshot(document.sequence_snapshot());
            self.state = State::Resizing {
                id: hit,
                original_px: (frame.width(), frame.height()),
                press: event.pos,
            };
        } else if element.is_movable() {
            let top_left = element.position_pixels(scale);
            history.snapshot(document.sequence_snapshot());
            self.state = State::Moving {
                id: hit,
                grab_offset: event.pos - top_left,
            };
        } else {
            self.state = State::Idle;
        }
    }

    fn drag(&mut self, document: &mut SceneDocument, event: &PointerEvent) {
        let scale = document.pixel_scale();
        let (x_limit, y_limit) = document.limits();
        match &mut self.state {
            State::Selecting { cursor, .. } => *cursor = event.pos,
            State::Moving { id, grab_offset } => {
                let target = event.pos - *grab_offset;
                if let Some(element) = document.get_mut(id) {
                    element.reposition(target.x / scale, target.y / scale, x_limit, y_limit);
                }
            }
            State::Resizing {
                id,
                original_px,
                press,
            } => {
                let (id, original_px, press) = (*id, *original_px, *press);
                if let Some(element) = document.get_mut(&id) {
                    // Both pointer points mapped into unrotated, unsheared
                    // space; the delta there is the size delta.
                    let to_base = element.element_transform(scale, true);
                    let delta = to_base * event.pos - to_base * press;
                    element.change_size(
                        original_px.0 + delta.x,
                        original_px.1 + delta.y,
                        MIN_RESIZE_PX,
                        scale,
                    );
                    // Keep the transformed lower-right corner under the
                    // pointer: rotation must not make the anchor drift.
                    let corner = element.lower_right_corner(scale);
                    let correction = event.pos - corner;
                    let position = element.position();
                    element.place(Point::new(
                        position.x + correction.x / scale,
                        position.y + correction.y / scale,
                    ));
                }
            }
            State::PassThrough { id } => {
                let id = *id;
                if let Some(element) = document.get_mut(&id) {
                    element.handle_pointer_event(event.pos, scale);
                }
            }
            State::Idle | State::ExternalDraw => {}
        }
    }

    fn release(&mut self, document: &mut SceneDocument, event: &PointerEvent) {
        let scale = document.pixel_scale();
        match &self.state {
            State::Selecting { anchor, .. } => {
                let band = Rect::from_points(*anchor, event.pos);
                // Select everything whose transformed bounds sit fully
                // inside the band.
                let contained: Vec<ElementId> = document
                    .matching(|e| {
                        e.is_visible()
                            && e.is_selectable()
                            && rect_contains(band, e.transformed_bounds(scale))
                    })
                    .map(Element::id)
                    .collect();
                for id in &contained {
                    document.select(id, true);
                }
                self.state = State::Idle;
            }
            State::Moving { .. } | State::Resizing { .. } => self.state = State::Idle,
            State::Idle | State::PassThrough { .. } | State::ExternalDraw => {}
        }
    }

    fn double_click(&mut self, document: &mut SceneDocument, event: &PointerEvent) {
        let scale = document.pixel_scale();
        // Second double-click on the pass-through element ends the edit.
        if let State::PassThrough { id } = self.state {
            if let Some(element) = document.get_mut(&id) {
                element.deselected_for_edit();
            }
            self.state = State::Idle;
            return;
        }
        let Some(hit) = document.top_hit(event.pos, scale) else {
            return;
        };
        let Some(element) = document.get_mut(&hit) else {
            return;
        };
        if element.is_selected() && element.supports_edit() && element.selected_for_edit() {
            self.state = State::PassThrough { id: hit };
        }
    }
}

/// The fixed-size square handle anchored at the element's transformed
/// lower-right corner.
#[must_use]
pub fn resize_handle(element: &Element, scale: f64) -> Rect {
    let corner = element.lower_right_corner(scale);
    Rect::from_center_size(corner, kurbo::Size::new(HANDLE_SIZE_PX, HANDLE_SIZE_PX))
}

fn rect_contains(outer: Rect, inner: Rect) -> bool {
    outer.min_x() <= inner.min_x()
        && outer.min_y() <= inner.min_y()
        && outer.max_x() >= inner.max_x()
        && outer.max_y() >= inner.max_y()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::element::{Element, ShapeKind, Size};
    use crate::history::History;

    fn press(pos: Point) -> PointerEvent {
        PointerEvent {
            pos,
            kind: PointerEventKind::Press,
            shift: false,
        }
    }
    fn drag(pos: Point) -> PointerEvent {
        PointerEvent {
            pos,
            kind: PointerEventKind::Drag,
            shift: false,
        }
    }
    fn release(pos: Point) -> PointerEvent {
        PointerEvent {
            pos,
            kind: PointerEventKind::Release,
            shift: false,
        }
    }

    fn rig() -> (SceneDocument, History, Interaction, ElementId) {
        let mut document = SceneDocument::new();
        let element = Element::new(ShapeKind::Rect, Point::new(1.0, 1.0), Size::new(2.0, 1.0));
        let id = element.id();
        document.add(element);
        (document, History::default(), Interaction::new(), id)
    }

    #[test]
    fn press_on_element_selects_and_starts_moving() {
        let (mut doc, mut history, mut interaction, id) = rig();
        let scale = doc.pixel_scale();
        interaction.pointer_event(&mut doc, &mut history, &press(Point::new(2.0 * scale, 1.5 * scale)));
        assert!(matches!(interaction.state(), State::Moving { id: moving, .. } if *moving == id));
        assert!(doc.get(&id).unwrap().is_selected());
        assert_eq!(history.undo_depth(), 1);
    }

    #[test]
    fn one_gesture_one_snapshot() {
        let (mut doc, mut history, mut interaction, id) = rig();
        let scale = doc.pixel_scale();
        interaction.pointer_event(&mut doc, &mut history, &press(Point::new(2.0 * scale, 1.5 * scale)));
        for step in 0..10 {
            let pos = Point::new((2.0 + 0.1 * f64::from(step)) * scale, 1.5 * scale);
            interaction.pointer_event(&mut doc, &mut history, &drag(pos));
        }
        interaction.pointer_event(&mut doc, &mut history, &release(Point::new(3.0 * scale, 1.5 * scale)));
        assert_eq!(history.undo_depth(), 1);
        assert_eq!(interaction.state(), &State::Idle);
        // The element followed the last drag position: pointer at x = 2.9
        // units minus the 1-unit grab offset.
        let moved = doc.get(&id).unwrap().position();
        assert!((moved.x - 1.9).abs() < 1e-9, "{moved:?}");
    }

    #[test]
    fn empty_press_starts_rubber_band_and_release_selects_contained() {
        let (mut doc, mut history, mut interaction, id) = rig();
        let scale = doc.pixel_scale();
        // Press far away from the element.
        interaction.pointer_event(&mut doc, &mut history, &press(Point::new(20.0 * scale, 20.0 * scale)));
        assert!(matches!(interaction.state(), State::Selecting { .. }));
        // Drag a band around everything and release.
        interaction.pointer_event(&mut doc, &mut history, &drag(Point::new(0.5 * scale, 0.5 * scale)));
        interaction.pointer_event(&mut doc, &mut history, &release(Point::new(0.5 * scale, 0.5 * scale)));
        assert_eq!(interaction.state(), &State::Idle);
        assert!(doc.get(&id).unwrap().is_selected());
        // Rubber-banding pushed no history.
        assert_eq!(history.undo_depth(), 0);
    }

    #[test]
    fn band_must_fully_contain() {
        let (mut doc, mut history, mut interaction, id) = rig();
        let scale = doc.pixel_scale();
        interaction.pointer_event(&mut doc, &mut history, &press(Point::new(20.0 * scale, 20.0 * scale)));
        // Band clips only part of the element.
        interaction.pointer_event(&mut doc, &mut history, &release(Point::new(2.0 * scale, 1.5 * scale)));
        assert!(!doc.get(&id).unwrap().is_selected());
    }

    #[test]
    fn resize_handle_press_enters_resizing_and_corner_tracks() {
        let (mut doc, mut history, mut interaction, id) = rig();
        doc.select(&id, false);
        let scale = doc.pixel_scale();
        // Lower-right corner of the unrotated element is at (3, 2) units;
        // the handle straddles it, so a press just outside still grabs.
        let corner = Point::new(3.0 * scale + 2.0, 2.0 * scale + 2.0);
        interaction.pointer_event(&mut doc, &mut history, &press(corner));
        assert!(matches!(interaction.state(), State::Resizing { .. }));
        let target = Point::new(4.0 * scale, 3.0 * scale);
        interaction.pointer_event(&mut doc, &mut history, &drag(target));
        let tracked = doc.get(&id).unwrap().lower_right_corner(scale);
        assert!((tracked - target).hypot() < 1e-6, "{tracked:?} vs {target:?}");
        interaction.pointer_event(&mut doc, &mut history, &release(target));
        assert_eq!(history.undo_depth(), 1);
    }

    #[test]
    fn rotated_resize_keeps_corner_under_pointer() {
        let (mut doc, mut history, mut interaction, id) = rig();
        doc.get_mut(&id).unwrap().set_rotation(30.0);
        doc.select(&id, false);
        let scale = doc.pixel_scale();
        let corner = doc.get(&id).unwrap().lower_right_corner(scale);
        interaction.pointer_event(&mut doc, &mut history, &press(corner));
        assert!(matches!(interaction.state(), State::Resizing { .. }));
        let target = Point::new(corner.x + 0.5 * scale, corner.y + 0.75 * scale);
        interaction.pointer_event(&mut doc, &mut history, &drag(target));
        let tracked = doc.get(&id).unwrap().lower_right_corner(scale);
        assert!((tracked - target).hypot() < 1e-6, "{tracked:?} vs {target:?}");
    }

    #[test]
    fn cancel_always_returns_to_idle() {
        let (mut doc, mut history, mut interaction, _id) = rig();
        let scale = doc.pixel_scale();
        interaction.pointer_event(&mut doc, &mut history, &press(Point::new(2.0 * scale, 1.5 * scale)));
        assert!(matches!(interaction.state(), State::Moving { .. }));
        interaction.cancel();
        assert_eq!(interaction.state(), &State::Idle);
    }

    #[test]
    fn shift_click_toggles_without_clearing() {
        let (mut doc, mut history, mut interaction, id_a) = rig();
        let second = Element::new(ShapeKind::Rect, Point::new(5.0, 1.0), Size::new(1.0, 1.0));
        let id_b = second.id();
        doc.add(second);
        let scale = doc.pixel_scale();
        interaction.pointer_event(&mut doc, &mut history, &press(Point::new(2.0 * scale, 1.5 * scale)));
        interaction.pointer_event(&mut doc, &mut history, &release(Point::new(2.0 * scale, 1.5 * scale)));
        let shift_press = PointerEvent {
            pos: Point::new(5.5 * scale, 1.5 * scale),
            kind: PointerEventKind::Press,
            shift: true,
        };
        interaction.pointer_event(&mut doc, &mut history, &shift_press);
        assert!(doc.get(&id_a).unwrap().is_selected());
        assert!(doc.get(&id_b).unwrap().is_selected());
        // Shift-click again: toggles off, drops to Idle.
        interaction.pointer_event(&mut doc, &mut history, &release(shift_press.pos));
        interaction.pointer_event(&mut doc, &mut history, &shift_press);
        assert!(!doc.get(&id_b).unwrap().is_selected());
        assert_eq!(interaction.state(), &State::Idle);
    }

    #[test]
    fn plain_press_on_selected_element_clears_others() {
        let (mut doc, mut history, mut interaction, id_a) = rig();
        let second = Element::new(ShapeKind::Rect, Point::new(5.0, 1.0), Size::new(1.0, 1.0));
        let id_b = second.id();
        doc.add(second);
        doc.select(&id_a, false);
        doc.select(&id_b, true);
        assert_eq!(doc.selected_ids().len(), 2);
        let scale = doc.pixel_scale();
        // Unmodified press on the already-selected first element.
        interaction.pointer_event(&mut doc, &mut history, &press(Point::new(2.0 * scale, 1.5 * scale)));
        assert!(doc.get(&id_a).unwrap().is_selected());
        assert!(!doc.get(&id_b).unwrap().is_selected());
    }

    #[test]
    fn double_click_enters_and_exits_pass_through() {
        let mut doc = SceneDocument::new();
        let text = Element::new(
            ShapeKind::Text {
                content: "hello".into(),
            },
            Point::new(1.0, 1.0),
            Size::new(2.0, 1.0),
        );
        let id = text.id();
        doc.add(text);
        let mut history = History::default();
        let mut interaction = Interaction::new();
        let scale = doc.pixel_scale();
        let inside = Point::new(2.0 * scale, 1.5 * scale);

        interaction.pointer_event(&mut doc, &mut history, &press(inside));
        interaction.pointer_event(&mut doc, &mut history, &release(inside));
        let double = PointerEvent {
            pos: inside,
            kind: PointerEventKind::DoubleClick,
            shift: false,
        };
        interaction.pointer_event(&mut doc, &mut history, &double);
        assert_eq!(interaction.state(), &State::PassThrough { id });
        // Press inside is swallowed by the element.
        interaction.pointer_event(&mut doc, &mut history, &press(inside));
        assert_eq!(interaction.state(), &State::PassThrough { id });
        // Click outside falls out of pass-through and becomes a normal press.
        interaction.pointer_event(&mut doc, &mut history, &press(Point::new(20.0 * scale, 20.0 * scale)));
        assert!(matches!(interaction.state(), State::Selecting { .. }));
    }

    #[test]
    fn external_collaborator_swallows_events() {
        struct Recorder(std::rc::Rc<std::cell::Cell<u32>>);
        impl DrawCollaborator for Recorder {
            fn pointer_event(&mut self, _: &mut SceneDocument, _: &PointerEvent) {
                self.0.set(self.0.get() + 1);
            }
            fn repaint(&mut self, _: &SceneDocument) {}
        }
        let (mut doc, mut history, mut interaction, id) = rig();
        let count = std::rc::Rc::new(std::cell::Cell::new(0));
        assert!(interaction.begin_external_draw(Box::new(Recorder(count.clone()))));
        // A second collaborator is refused.
        assert!(!interaction.begin_external_draw(Box::new(Recorder(count.clone()))));
        let scale = doc.pixel_scale();
        interaction.pointer_event(&mut doc, &mut history, &press(Point::new(2.0 * scale, 1.5 * scale)));
        assert_eq!(count.get(), 1);
        // Nothing reached the normal machine.
        assert!(!doc.get(&id).unwrap().is_selected());
        assert!(interaction.end_external_draw().is_some());
        assert_eq!(interaction.state(), &State::Idle);
    }
}
