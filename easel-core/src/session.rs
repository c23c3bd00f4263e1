//! # Editor session
//!
//! One open document plus its undo history, pointer state machine, and
//! session-scoped user state (recent colors). Commands here are the
//! user-visible operations: each takes exactly one history snapshot before
//! mutating, and compound operations suspend the history around their
//! internal churn so the whole thing undoes as one step.
//!
//! Commands over the selection report how many elements they touched; zero
//! means nothing qualified and the document is untouched.

use crate::combine::{self, CombineOp};
use crate::element::style::Rgba;
use crate::element::{Element, ShapeKind, Size};
use crate::history::History;
use crate::id::{CopyKind, ElementId};
use crate::interact::{Interaction, PointerEvent};
use crate::state::{grouping, SceneDocument};
use crate::units::PIXELS_PER_UNIT;
use kurbo::{Point, Shape as _};
use smallvec::SmallVec;

/// Offset applied to duplicated elements so the copy is visibly apart from
/// its source, in units.
const DUPLICATE_OFFSET: f64 = 0.25;
/// How many recently-used colors the session remembers.
const RECENT_COLOR_CAP: usize = 8;

pub struct EditorSession {
    pub document: SceneDocument,
    history: History,
    interaction: Interaction,
    recent_colors: SmallVec<[Rgba; RECENT_COLOR_CAP]>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::open(SceneDocument::new())
    }
}

impl EditorSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn open(document: SceneDocument) -> Self {
        Self {
            document,
            history: History::default(),
            interaction: Interaction::new(),
            recent_colors: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }
    #[must_use]
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }
    pub fn interaction_mut(&mut self) -> &mut Interaction {
        &mut self.interaction
    }

    // ---- event plumbing ----

    pub fn pointer_event(&mut self, event: &PointerEvent) {
        self.interaction
            .pointer_event(&mut self.document, &mut self.history, event);
    }
    /// Low-frequency timer tick: advances ephemeral render state only.
    pub fn tick(&mut self) {
        self.interaction.tick();
    }

    // ---- undo / redo ----

    /// Restore the previous snapshot. Returns false when there is nothing to
    /// undo; the document is untouched in that case.
    pub fn undo(&mut self) -> bool {
        self.interaction.cancel();
        let current = self.document.sequence_snapshot();
        match self.history.undo(current) {
            Some(restored) => {
                self.document.restore_sequence(restored);
                true
            }
            None => false,
        }
    }
    /// Re-apply the most recently undone snapshot. Returns false when the
    /// redo stack is empty.
    pub fn redo(&mut self) -> bool {
        self.interaction.cancel();
        let current = self.document.sequence_snapshot();
        match self.history.redo(current) {
            Some(restored) => {
                self.document.restore_sequence(restored);
                true
            }
            None => false,
        }
    }

    // ---- selection commands ----

    /// Delete every selected, mutable element. Returns the count removed.
    pub fn delete_selected(&mut self) -> usize {
        let targets: Vec<ElementId> = self
            .document
            .matching(|e| e.is_selected() && e.is_mutable())
            .map(Element::id)
            .collect();
        if targets.is_empty() {
            return 0;
        }
        self.history.snapshot(self.document.sequence_snapshot());
        for id in &targets {
            self.document.remove(id);
        }
        targets.len()
    }

    /// Duplicate every selected, mutable element with fresh identity, offset
    /// slightly from the source. The duplicates become the new selection.
    pub fn duplicate_selected(&mut self) -> usize {
        let copies: Vec<Element> = self
            .document
            .matching(|e| e.is_selected() && e.is_mutable())
            .map(|source| {
                let mut copy = source.copy(CopyKind::ForNew);
                let at = copy.position();
                copy.place(Point::new(at.x + DUPLICATE_OFFSET, at.y + DUPLICATE_OFFSET));
                copy
            })
            .collect();
        if copies.is_empty() {
            return 0;
        }
        self.history.snapshot(self.document.sequence_snapshot());
        self.document.clear_selection();
        let count = copies.len();
        for copy in copies {
            let id = copy.id();
            if self.document.add(copy) {
                self.document.select(&id, true);
            }
        }
        count
    }

    // ---- grouping ----

    /// Fold the selection into one composite element at the topmost member's
    /// z slot. A selection of fewer than two elements is reported as zero.
    pub fn group_selected(&mut self) -> usize {
        let scale = PIXELS_PER_UNIT;
        let selected = self.document.selected_ids();
        let members: Vec<&Element> = selected
            .iter()
            .filter_map(|id| self.document.get(id))
            .collect();
        let count = members.len();
        let Some(slot) = selected.first().and_then(|id| self.document.index_of(id)) else {
            return 0;
        };
        let Some(group) = grouping::compose(&members, scale) else {
            return 0;
        };
        self.history.snapshot(self.document.sequence_snapshot());
        self.history.suspend();
        for id in &selected {
            self.document.remove(id);
        }
        self.document.insert_at(slot, group);
        self.history.resume();
        count
    }

    /// Unfold every selected group back into its children, restored at the
    /// composite's former z slot with the group's transform compounded in.
    /// Returns the number of groups unfolded.
    pub fn ungroup_selected(&mut self) -> usize {
        let groups: Vec<ElementId> = self
            .document
            .matching(|e| e.is_selected() && matches!(e.kind, ShapeKind::Group { .. }))
            .map(Element::id)
            .collect();
        if groups.is_empty() {
            return 0;
        }
        self.history.snapshot(self.document.sequence_snapshot());
        self.history.suspend();
        let mut unfolded = 0;
        for id in &groups {
            let Some(slot) = self.document.index_of(id) else {
                continue;
            };
            let Some(group) = self.document.remove(id) else {
                continue;
            };
            let Some(children) = grouping::decompose(&group) else {
                // Not a group after all; put it back where it was.
                self.document.insert_at(slot, group);
                continue;
            };
            // Children are topmost-first; inserting each at the same slot in
            // reverse keeps their relative z-order.
            for child in children.into_iter().rev() {
                self.document.insert_at(slot, child);
            }
            unfolded += 1;
        }
        self.history.resume();
        unfolded
    }

    // ---- combine ----

    /// Apply a boolean outline operation across the selection. Operands are
    /// the selected, mutable elements with a combinable outline; the
    /// bottom-most of them is the reference whose style the result inherits.
    /// An empty result (e.g. subtract covering everything) leaves the
    /// document untouched and reports zero.
    pub fn combine_selected(&mut self, op: CombineOp) -> usize {
        let scale = PIXELS_PER_UNIT;
        let operands: Vec<ElementId> = self
            .document
            .matching(|e| e.is_selected() && e.is_mutable() && e.kind.has_combinable_outline())
            .map(Element::id)
            .collect();
        if operands.len() < 2 {
            return 0;
        }
        // Topmost-first z-order: the last operand is the bottom-most, and the
        // reference operand leads the path list.
        let reference = operands[operands.len() - 1];
        let paths: Vec<kurbo::BezPath> = std::iter::once(reference)
            .chain(operands.iter().copied().filter(|id| *id != reference))
            .filter_map(|id| self.document.get(&id))
            .map(|e| e.scene_outline(scale))
            .collect();
        let Some(combined) = combine::combine_outlines(op, &paths, combine::DEFAULT_TOLERANCE)
        else {
            return 0;
        };
        let bbox = combined.bounding_box();
        if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            return 0;
        }
        // Normalize the scene-space result into the unit square; the new
        // element's frame carries the placement.
        let normalized = kurbo::Affine::scale_non_uniform(1.0 / bbox.width(), 1.0 / bbox.height())
            * kurbo::Affine::translate(-bbox.origin().to_vec2())
            * combined;

        let count = operands.len();
        self.history.snapshot(self.document.sequence_snapshot());
        self.history.suspend();
        // All other operands sit above the reference in z, so its slot drops
        // by their count once they are removed.
        let slot = self
            .document
            .index_of(&reference)
            .unwrap_or(0)
            .saturating_sub(count - 1);
        let style = self.document.get(&reference).map(|e| (e.outline, e.fill));
        for id in &operands {
            self.document.remove(id);
        }
        let mut result = Element::new(
            ShapeKind::Path { path: normalized },
            Point::new(bbox.min_x() / scale, bbox.min_y() / scale),
            Size::new(bbox.width() / scale, bbox.height() / scale),
        );
        if let Some((outline, fill)) = style {
            result.outline = outline;
            result.fill = fill;
        }
        let result_id = result.id();
        self.document.insert_at(slot.min(self.document.len()), result);
        self.document.select(&result_id, false);
        self.history.resume();
        count
    }

    // ---- z-order ----

    pub fn bring_to_front(&mut self) {
        self.z_command(SceneDocument::move_to_front);
    }
    pub fn send_to_back(&mut self) {
        self.z_command(SceneDocument::move_to_back);
    }
    pub fn bring_forward(&mut self) {
        self.z_command(SceneDocument::move_forward);
    }
    pub fn send_backward(&mut self) {
        self.z_command(SceneDocument::move_backward);
    }
    fn z_command(&mut self, command: fn(&mut SceneDocument)) {
        if self.document.selected_ids().is_empty() {
            return;
        }
        self.history.snapshot(self.document.sequence_snapshot());
        command(&mut self.document);
    }

    // ---- session state ----

    /// Record a color as recently used. Most recent first, duplicates
    /// collapse, bounded length.
    pub fn remember_color(&mut self, color: Rgba) {
        self.recent_colors.retain(|c| *c != color);
        self.recent_colors.insert(0, color);
        self.recent_colors.truncate(RECENT_COLOR_CAP);
    }
    #[must_use]
    pub fn recent_colors(&self) -> &[Rgba] {
        &self.recent_colors
    }

    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.document.iter().any(Element::has_changes)
    }
    pub fn mark_saved(&mut self) {
        for element in self.document.iter_mut() {
            element.mark_saved();
        }
    }

    pub fn zoom_in(&mut self) {
        self.document.zoom = self.document.zoom.zoom_in();
    }
    pub fn zoom_out(&mut self) {
        self.document.zoom = self.document.zoom.zoom_out();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::element::style::FillStyle;
    use crate::interact::PointerEventKind;

    fn rect_at(x: f64, y: f64, w: f64, h: f64) -> Element {
        Element::new(ShapeKind::Rect, Point::new(x, y), Size::new(w, h))
    }

    fn session_with(elements: Vec<Element>) -> (EditorSession, Vec<ElementId>) {
        let mut session = EditorSession::new();
        let ids = elements
            .iter()
            .map(Element::id)
            .collect();
        for element in elements {
            assert!(session.document.add(element));
        }
        (session, ids)
    }

    #[test]
    fn delete_is_one_undo_step() {
        let (mut session, ids) = session_with(vec![
            rect_at(0.0, 0.0, 1.0, 1.0),
            rect_at(2.0, 0.0, 1.0, 1.0),
        ]);
        session.document.select(&ids[0], false);
        session.document.select(&ids[1], true);
        assert_eq!(session.delete_selected(), 2);
        assert!(session.document.is_empty());
        assert!(session.undo());
        assert_eq!(session.document.len(), 2);
        assert!(session.document.contains(&ids[0]));
        assert!(session.redo());
        assert!(session.document.is_empty());
    }

    #[test]
    fn delete_with_nothing_selected_reports_zero() {
        let (mut session, _) = session_with(vec![rect_at(0.0, 0.0, 1.0, 1.0)]);
        assert_eq!(session.delete_selected(), 0);
        assert_eq!(session.history().undo_depth(), 0);
    }

    #[test]
    fn duplicate_offsets_and_reselects() {
        let (mut session, ids) = session_with(vec![rect_at(1.0, 1.0, 1.0, 1.0)]);
        session.document.select(&ids[0], false);
        assert_eq!(session.duplicate_selected(), 1);
        assert_eq!(session.document.len(), 2);
        let selected = session.document.selected_ids();
        assert_eq!(selected.len(), 1);
        assert_ne!(selected[0], ids[0]);
        let copy = session.document.get(&selected[0]).unwrap();
        assert!((copy.position().x - 1.25).abs() < 1e-9);
        assert!((copy.position().y - 1.25).abs() < 1e-9);
    }

    #[test]
    fn group_then_ungroup_round_trips_as_two_undo_steps() {
        let (mut session, ids) = session_with(vec![
            rect_at(1.0, 1.0, 2.0, 1.0),
            rect_at(4.0, 2.0, 1.0, 1.0),
        ]);
        session.document.select(&ids[0], false);
        session.document.select(&ids[1], true);
        assert_eq!(session.group_selected(), 2);
        assert_eq!(session.document.len(), 1);
        assert_eq!(session.history().undo_depth(), 1);

        assert_eq!(session.ungroup_selected(), 1);
        assert_eq!(session.document.len(), 2);
        assert_eq!(session.history().undo_depth(), 2);
        // Children restored with original identity and absolute geometry.
        for id in &ids {
            assert!(session.document.contains(id));
        }
        let restored = session.document.get(&ids[1]).unwrap();
        assert_eq!(restored.position(), Point::new(4.0, 2.0));

        // Undo twice walks back through ungroup then group.
        assert!(session.undo());
        assert_eq!(session.document.len(), 1);
        assert!(session.undo());
        assert_eq!(session.document.len(), 2);
    }

    #[test]
    fn group_of_one_touches_nothing() {
        let (mut session, ids) = session_with(vec![rect_at(0.0, 0.0, 1.0, 1.0)]);
        session.document.select(&ids[0], false);
        assert_eq!(session.group_selected(), 0);
        assert_eq!(session.document.len(), 1);
        assert_eq!(session.history().undo_depth(), 0);
    }

    #[test]
    fn ungroup_restores_children_z_order() {
        let (mut session, ids) = session_with(vec![
            rect_at(0.0, 0.0, 1.0, 1.0), // bottom
            rect_at(2.0, 0.0, 1.0, 1.0), // top
        ]);
        session.document.select(&ids[0], false);
        session.document.select(&ids[1], true);
        session.group_selected();
        session.ungroup_selected();
        let order: Vec<_> = session.document.iter().map(Element::id).collect();
        assert_eq!(order, vec![ids[1], ids[0]]);
    }

    #[test]
    fn combine_union_replaces_operands_with_styled_path() {
        let (mut session, ids) = session_with(vec![
            rect_at(1.0, 1.0, 2.0, 2.0), // bottom-most: the reference
            rect_at(2.0, 2.0, 2.0, 2.0),
        ]);
        let fill = FillStyle {
            color: Rgba {
                r: 200,
                g: 50,
                b: 25,
                a: 255,
            },
        };
        session.document.get_mut(&ids[0]).unwrap().fill = Some(fill);
        session.document.select(&ids[0], false);
        session.document.select(&ids[1], true);

        assert_eq!(session.combine_selected(CombineOp::Union), 2);
        assert_eq!(session.document.len(), 1);
        let result = session.document.iter().next().unwrap();
        assert!(matches!(result.kind, ShapeKind::Path { .. }));
        assert!(result.is_selected());
        assert_eq!(result.fill, Some(fill));
        // Frame spans the union: (1,1) to (4,4) units.
        assert!((result.position().x - 1.0).abs() < 1e-6);
        let bounds = result.bounds();
        assert!((bounds.width - 3.0).abs() < 1e-6);
        assert!((bounds.height - 3.0).abs() < 1e-6);
        // One undo step brings both operands back.
        assert!(session.undo());
        assert_eq!(session.document.len(), 2);
    }

    #[test]
    fn combine_to_nothing_is_untouched_zero() {
        let (mut session, ids) = session_with(vec![
            rect_at(1.0, 1.0, 1.0, 1.0),
            rect_at(0.0, 0.0, 4.0, 4.0), // covers the other entirely
        ]);
        session.document.select(&ids[0], false);
        session.document.select(&ids[1], true);
        // Disjoint intersection of... actually subtract the cover from the
        // covered: nothing remains.
        let ids_before: Vec<_> = session.document.iter().map(Element::id).collect();
        assert_eq!(session.combine_selected(CombineOp::Subtract), 0);
        let ids_after: Vec<_> = session.document.iter().map(Element::id).collect();
        assert_eq!(ids_before, ids_after);
        assert_eq!(session.history().undo_depth(), 0);
    }

    #[test]
    fn combine_needs_two_eligible_operands() {
        let (mut session, ids) = session_with(vec![
            rect_at(0.0, 0.0, 2.0, 2.0),
            Element::new(
                ShapeKind::Text {
                    content: "label".into(),
                },
                Point::new(1.0, 1.0),
                Size::new(1.0, 1.0),
            ),
        ]);
        session.document.select(&ids[0], false);
        session.document.select(&ids[1], true);
        // The text element has no combinable outline; one operand remains.
        assert_eq!(session.combine_selected(CombineOp::Union), 0);
        assert_eq!(session.document.len(), 2);
    }

    #[test]
    fn z_commands_snapshot_only_with_selection() {
        let (mut session, ids) = session_with(vec![
            rect_at(0.0, 0.0, 1.0, 1.0),
            rect_at(2.0, 0.0, 1.0, 1.0),
        ]);
        session.bring_to_front();
        assert_eq!(session.history().undo_depth(), 0);
        // ids[1] was added last, so it sits at the front (index 0).
        session.document.select(&ids[1], false);
        assert_eq!(session.document.index_of(&ids[1]), Some(0));
        session.send_to_back();
        assert_eq!(session.history().undo_depth(), 1);
        assert_eq!(session.document.index_of(&ids[1]), Some(1));
        assert!(session.undo());
        assert_eq!(session.document.index_of(&ids[1]), Some(0));
    }

    #[test]
    fn undo_reverses_a_drag_gesture() {
        let (mut session, ids) = session_with(vec![rect_at(1.0, 1.0, 2.0, 1.0)]);
        let scale = session.document.pixel_scale();
        let event = |kind, pos| PointerEvent {
            pos,
            kind,
            shift: false,
        };
        session.pointer_event(&event(
            PointerEventKind::Press,
            Point::new(2.0 * scale, 1.5 * scale),
        ));
        session.pointer_event(&event(
            PointerEventKind::Drag,
            Point::new(4.0 * scale, 3.0 * scale),
        ));
        session.pointer_event(&event(
            PointerEventKind::Release,
            Point::new(4.0 * scale, 3.0 * scale),
        ));
        // Pointer moved (2, 1.5) units; so did the element.
        let moved = session.document.get(&ids[0]).unwrap().position();
        assert!((moved - Point::new(3.0, 2.5)).hypot() < 1e-9, "{moved:?}");
        // One undo reverses the whole gesture, exactly.
        assert!(session.undo());
        let restored = session.document.get(&ids[0]).unwrap().position();
        assert_eq!(restored, Point::new(1.0, 1.0));
        assert!(session.redo());
        let redone = session.document.get(&ids[0]).unwrap().position();
        assert!((redone - moved).hypot() < 1e-9);
    }

    #[test]
    fn recent_colors_dedupe_and_cap() {
        let mut session = EditorSession::new();
        for i in 0..12u8 {
            session.remember_color(Rgba {
                r: i * 20,
                g: 0,
                b: 0,
                a: 255,
            });
        }
        assert_eq!(session.recent_colors().len(), 8);
        // Re-remembering moves to the front without growing.
        let again = session.recent_colors()[3];
        session.remember_color(again);
        assert_eq!(session.recent_colors().len(), 8);
        assert_eq!(session.recent_colors()[0], again);
    }

    #[test]
    fn saved_state_tracks_changes() {
        let (mut session, ids) = session_with(vec![rect_at(0.0, 0.0, 1.0, 1.0)]);
        assert!(!session.has_unsaved_changes());
        session
            .document
            .get_mut(&ids[0])
            .unwrap()
            .set_rotation(45.0);
        assert!(session.has_unsaved_changes());
        session.mark_saved();
        assert!(!session.has_unsaved_changes());
    }
}
