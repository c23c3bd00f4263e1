//! # History
//!
//! Bounded-depth snapshot undo/redo over the document's element sequence.
//! A snapshot is a deep copy of the whole ordered sequence with identity
//! preserved, so undo restores the *same* elements byte-for-byte.
//!
//! Exactly one snapshot per user-visible step: continuous drag mutations
//! never push, and compound operations (group, combine) suspend pushes
//! around their internal remove/add churn after taking their own single
//! snapshot.

use crate::element::Element;
use std::collections::VecDeque;

/// A deep copy of the element sequence at a point in time, identity
/// preserved (`CopyKind::NotForNew`).
pub type Snapshot = Vec<Element>;

pub const DEFAULT_DEPTH: usize = 16;

pub struct History {
    /// Most recent snapshot at the front; eviction pops the back (FIFO
    /// eviction under LIFO pop).
    undo: VecDeque<Snapshot>,
    redo: VecDeque<Snapshot>,
    depth: usize,
    suspended: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::with_depth(DEFAULT_DEPTH)
    }
}

impl History {
    #[must_use]
    pub fn with_depth(depth: usize) -> Self {
        Self {
            undo: VecDeque::with_capacity(depth),
            redo: VecDeque::with_capacity(depth),
            depth,
            suspended: false,
        }
    }
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Record a snapshot before a mutation. Clears the redo stack, since a
    /// new action invalidates the redone future. No-op while suspended.
    pub fn snapshot(&mut self, sequence: Snapshot) {
        self.snapshot_inner(sequence, true);
    }
    /// Record a snapshot without clearing redo. Only `redo` itself wants
    /// this, to re-push the pre-redo state onto undo.
    pub fn snapshot_keep_redo(&mut self, sequence: Snapshot) {
        self.snapshot_inner(sequence, false);
    }
    fn snapshot_inner(&mut self, sequence: Snapshot, clear_redo: bool) {
        if self.suspended {
            return;
        }
        if clear_redo {
            self.redo.clear();
        }
        push_capped(&mut self.undo, sequence, self.depth);
    }

    /// Pop the most recent undo entry, pushing `current` onto redo first.
    /// Returns None ("nothing to undo") on an empty stack, leaving `current`
    /// untouched conceptually - the caller keeps its state.
    #[must_use]
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        if self.undo.is_empty() {
            return None;
        }
        push_capped(&mut self.redo, current, self.depth);
        self.undo.pop_front()
    }
    /// Symmetric pop from the redo stack; `current` is re-pushed onto undo
    /// without clearing redo's remaining entries.
    #[must_use]
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.redo.pop_front()?;
        self.snapshot_keep_redo(current);
        Some(restored)
    }

    /// Disable snapshot pushes (reads still work). Used to batch a compound
    /// operation's internal steps into the one snapshot it took itself.
    pub fn suspend(&mut self) {
        self.suspended = true;
    }
    pub fn resume(&mut self) {
        self.suspended = false;
    }
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }
}

fn push_capped(stack: &mut VecDeque<Snapshot>, snapshot: Snapshot, depth: usize) {
    if depth == 0 {
        return;
    }
    while stack.len() >= depth {
        // Oldest entry goes first.
        stack.pop_back();
    }
    stack.push_front(snapshot);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::element::{Element, ShapeKind, Size};
    use kurbo::Point;

    fn sequence_of(n: usize) -> Snapshot {
        (0..n)
            .map(|i| {
                Element::new(
                    ShapeKind::Rect,
                    Point::new(i as f64, 0.0),
                    Size::new(1.0, 1.0),
                )
            })
            .collect()
    }

    #[test]
    fn empty_stacks_report_nothing() {
        let mut history = History::default();
        assert!(history.undo(sequence_of(1)).is_none());
        assert!(history.redo(sequence_of(1)).is_none());
    }

    #[test]
    fn depth_bound_evicts_oldest_first() {
        let mut history = History::with_depth(3);
        for n in 0..10 {
            history.snapshot(sequence_of(n));
        }
        assert_eq!(history.undo_depth(), 3);
        // LIFO pop order: 9, 8, 7. Everything older was evicted FIFO.
        for expected in [9, 8, 7] {
            let popped = history.undo(sequence_of(0)).unwrap();
            assert_eq!(popped.len(), expected);
        }
        assert!(history.undo(sequence_of(0)).is_none());
    }

    #[test]
    fn snapshot_clears_redo_but_redo_path_does_not() {
        let mut history = History::default();
        history.snapshot(sequence_of(1));
        history.snapshot(sequence_of(2));
        let _ = history.undo(sequence_of(3)).unwrap();
        assert_eq!(history.redo_depth(), 1);
        // Redo re-snapshots without clobbering its sibling stack.
        let restored = history.redo(sequence_of(2)).unwrap();
        assert_eq!(restored.len(), 3);
        assert_eq!(history.redo_depth(), 0);
        assert_eq!(history.undo_depth(), 2);
        // A fresh action invalidates any remaining future.
        let _ = history.undo(sequence_of(3)).unwrap();
        assert_eq!(history.redo_depth(), 1);
        history.snapshot(sequence_of(4));
        assert_eq!(history.redo_depth(), 0);
    }

    #[test]
    fn suspended_pushes_are_ignored() {
        let mut history = History::default();
        history.snapshot(sequence_of(1));
        history.suspend();
        history.snapshot(sequence_of(2));
        history.snapshot(sequence_of(3));
        assert_eq!(history.undo_depth(), 1);
        history.resume();
        history.snapshot(sequence_of(4));
        assert_eq!(history.undo_depth(), 2);
    }
}
