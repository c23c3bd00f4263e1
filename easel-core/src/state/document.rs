//! # Scene document
//!
//! An ordered sequence of elements (index 0 is the topmost z-plane) plus
//! document-level settings and a UUID index for O(1) lookup.
//!
//! Invariant: the identity index and the ordered sequence are a single unit
//! of mutation. Every structural change updates both in the same logical
//! step; a desync is a programming error, not a recoverable condition.

use crate::element::{Element, Size};
use crate::id::ElementId;
use crate::units::Zoom;
use kurbo::Point;
use smallvec::SmallVec;

pub type DocumentId = crate::FuzzID<SceneDocument>;

/// Failure while rebuilding a document from persisted state. Interactive
/// mutation never produces these - corrupt or hand-edited input does.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ReconstructError {
    #[error("duplicate element identity {0}")]
    DuplicateIdentity(ElementId),
}

pub struct SceneDocument {
    id: DocumentId,
    /// Top-to-bottom z-order. Hit-testing iterates forward, painting must
    /// iterate in reverse.
    elements: Vec<Element>,
    /// Identity → index. Rebuilt (suffix included) on every structural change.
    index: hashbrown::HashMap<ElementId, usize>,
    /// Offset of the drawing origin, in units.
    pub origin: Point,
    /// Optional fixed canvas bounds, in units. Clips element growth.
    pub fixed_bounds: Option<Size>,
    pub zoom: Zoom,
    last_selected: Option<ElementId>,
}

impl Default for SceneDocument {
    fn default() -> Self {
        Self {
            id: DocumentId::next(),
            elements: Vec::new(),
            index: hashbrown::HashMap::new(),
            origin: Point::ZERO,
            fixed_bounds: None,
            zoom: Zoom::default(),
            last_selected: None,
        }
    }
}

impl SceneDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.id
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
    /// Pixels per unit at the current display zoom. Pointer mapping and
    /// rendering use this; stored geometry never does.
    #[must_use]
    pub fn pixel_scale(&self) -> f64 {
        crate::units::PIXELS_PER_UNIT * self.zoom.factor()
    }
    /// Far movement limits in units, from the fixed bounds if set.
    #[must_use]
    pub fn limits(&self) -> (f64, f64) {
        self.fixed_bounds
            .map_or((f64::INFINITY, f64::INFINITY), |b| (b.width, b.height))
    }

    /// Iterate in z-order, topmost first. This is hit-test order; painting
    /// must iterate [`Self::iter_paint_order`].
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Element> + '_ {
        self.elements.iter()
    }
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Element> + '_ {
        self.elements.iter_mut()
    }
    /// Bottom-to-top, for painting.
    pub fn iter_paint_order(&self) -> impl Iterator<Item = &Element> + '_ {
        self.elements.iter().rev()
    }

    // ---- structural mutation ----

    /// Insert at the top (index 0). Returns false if the identity already
    /// exists in the document, since an identity collision corrupts undo
    /// consistency, so it is also reported as a programming error.
    pub fn add(&mut self, mut element: Element) -> bool {
        if self.index.contains_key(&element.id()) {
            log::error!("identity collision adding {} to {}", element.id(), self.id);
            debug_assert!(false, "identity collision on add");
            return false;
        }
        element.added_to(self.id);
        self.elements.insert(0, element);
        self.rebuild_index();
        true
    }
    /// Insert at a specific z index (clamped to the sequence length). Same
    /// collision rule as [`Self::add`]. Ungrouping uses this to restore
    /// children at their composite's former slot.
    pub fn insert_at(&mut self, index: usize, mut element: Element) -> bool {
        if self.index.contains_key(&element.id()) {
            log::error!("identity collision inserting {} into {}", element.id(), self.id);
            debug_assert!(false, "identity collision on insert");
            return false;
        }
        element.added_to(self.id);
        let index = index.min(self.elements.len());
        self.elements.insert(index, element);
        self.rebuild_index();
        true
    }
    /// Remove by identity. Returns the element, or None if absent.
    pub fn remove(&mut self, id: &ElementId) -> Option<Element> {
        let idx = self.index.get(id).copied()?;
        let mut element = self.elements.remove(idx);
        self.rebuild_index();
        element.removed_from(self.id);
        if self.last_selected == Some(*id) {
            self.last_selected = None;
        }
        Some(element)
    }
    /// Swap an element for a new one, preserving its index position.
    /// Returns false if `old` is absent or the replacement's identity
    /// collides with a different element.
    pub fn replace(&mut self, old: &ElementId, mut new: Element) -> bool {
        let Some(idx) = self.index.get(old).copied() else {
            return false;
        };
        if new.id() != *old && self.index.contains_key(&new.id()) {
            log::error!("identity collision replacing {old} in {}", self.id);
            debug_assert!(false, "identity collision on replace");
            return false;
        }
        new.added_to(self.id);
        let mut removed = std::mem::replace(&mut self.elements[idx], new);
        self.rebuild_index();
        removed.removed_from(self.id);
        true
    }
    /// Replace the whole sequence, e.g. from a history snapshot. No lifecycle
    /// hooks fire - these are the same elements coming back.
    pub fn restore_sequence(&mut self, elements: Vec<Element>) {
        self.elements = elements;
        self.rebuild_index();
        self.last_selected = None;
    }
    /// Rebuild from persisted state: an ordered element list. Identity is
    /// expected to have been re-established on each element already; the
    /// `added_to` hook fires for every element. A duplicate identity fails
    /// the whole rebuild, leaving the document empty rather than silently
    /// dropping elements.
    pub fn reconstruct(
        &mut self,
        elements: impl IntoIterator<Item = Element>,
    ) -> Result<(), ReconstructError> {
        self.elements.clear();
        self.index.clear();
        self.last_selected = None;
        for mut element in elements {
            if self.index.contains_key(&element.id()) {
                let id = element.id();
                self.elements.clear();
                self.index.clear();
                return Err(ReconstructError::DuplicateIdentity(id));
            }
            self.index.insert(element.id(), self.elements.len());
            element.added_to(self.id);
            self.elements.push(element);
        }
        Ok(())
    }
    /// Clone of the element sequence with identity preserved, for history.
    #[must_use]
    pub fn sequence_snapshot(&self) -> Vec<Element> {
        self.elements
            .iter()
            .map(|e| e.copy(crate::id::CopyKind::NotForNew))
            .collect()
    }

    // ---- lookup ----

    #[must_use]
    pub fn contains(&self, id: &ElementId) -> bool {
        self.index.contains_key(id)
    }
    /// O(1) lookup by identity.
    #[must_use]
    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(self.index.get(id).copied()?)
    }
    pub fn get_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        let idx = self.index.get(id).copied()?;
        self.elements.get_mut(idx)
    }
    #[must_use]
    pub fn index_of(&self, id: &ElementId) -> Option<usize> {
        self.index.get(id).copied()
    }
    /// Linear scan returning all matches in z-order.
    pub fn matching<'s>(
        &'s self,
        mut predicate: impl FnMut(&Element) -> bool + 's,
    ) -> impl Iterator<Item = &'s Element> + 's {
        self.elements.iter().filter(move |e| predicate(e))
    }

    // ---- selection ----

    /// Identities of selected elements, topmost first.
    #[must_use]
    pub fn selected_ids(&self) -> SmallVec<[ElementId; 4]> {
        self.elements
            .iter()
            .filter(|e| e.is_selected())
            .map(Element::id)
            .collect()
    }
    #[must_use]
    pub fn last_selected(&self) -> Option<ElementId> {
        self.last_selected
    }
    pub fn clear_selection(&mut self) {
        for element in &mut self.elements {
            element.set_selected(false);
        }
        self.last_selected = None;
    }
    /// Select an element. Without `additive`, all other selections are
    /// cleared first; with it, the element's selection is toggled.
    pub fn select(&mut self, id: &ElementId, additive: bool) {
        if !additive {
            for element in &mut self.elements {
                if element.id() != *id {
                    element.set_selected(false);
                }
            }
        }
        let Some(element) = self.get_mut(id) else {
            return;
        };
        if additive && element.is_selected() {
            element.set_selected(false);
            if self.last_selected == Some(*id) {
                self.last_selected = None;
            }
        } else {
            element.set_selected(true);
            self.last_selected = Some(*id);
        }
    }

    // ---- z-order commands (over the current selection) ----

    /// Move every selected element to the top, preserving their relative
    /// order. No-op for an already-topmost selection.
    pub fn move_to_front(&mut self) {
        let (mut selected, mut rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.elements)
            .into_iter()
            .partition(Element::is_selected);
        selected.append(&mut rest);
        self.elements = selected;
        self.rebuild_index();
    }
    /// Move every selected element to the bottom, preserving relative order.
    pub fn move_to_back(&mut self) {
        let (selected, mut rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.elements)
            .into_iter()
            .partition(Element::is_selected);
        rest.extend(selected);
        self.elements = rest;
        self.rebuild_index();
    }
    /// Swap each selected element with its upper neighbor. No-op at the top
    /// boundary; a selected neighbor blocks the swap so relative order among
    /// moved elements is preserved.
    pub fn move_forward(&mut self) {
        for idx in 1..self.elements.len() {
            if self.elements[idx].is_selected() && !self.elements[idx - 1].is_selected() {
                self.elements.swap(idx, idx - 1);
            }
        }
        self.rebuild_index();
    }
    /// Swap each selected element with its lower neighbor. No-op at the
    /// bottom boundary.
    pub fn move_backward(&mut self) {
        for idx in (0..self.elements.len().saturating_sub(1)).rev() {
            if self.elements[idx].is_selected() && !self.elements[idx + 1].is_selected() {
                self.elements.swap(idx, idx + 1);
            }
        }
        self.rebuild_index();
    }

    /// Topmost selectable, visible element containing the given scene pixel
    /// point. Ties are won by z-order - first match in hit-test order.
    #[must_use]
    pub fn top_hit(&self, point: Point, scale: f64) -> Option<ElementId> {
        self.elements
            .iter()
            .find(|e| e.is_visible() && e.is_selectable() && e.contains(point, scale))
            .map(Element::id)
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (idx, element) in self.elements.iter().enumerate() {
            self.index.insert(element.id(), idx);
        }
        debug_assert_eq!(self.index.len(), self.elements.len(), "index desync");
    }
}
