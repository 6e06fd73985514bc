//! Linear undo/redo history over edit snapshots.

use crate::page_edits::PageEditMap;

/// Append-only sequence of [`PageEditMap`] snapshots with a cursor.
///
/// Snapshot 0 is always the empty map (the post-load baseline) and the
/// cursor is always a valid index. A push while undone discards the redo
/// branch, per standard linear-undo semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    snapshots: Vec<PageEditMap>,
    cursor: usize,
}

impl History {
    pub fn new() -> Self {
        Self { snapshots: vec![PageEditMap::new()], cursor: 0 }
    }

    /// Snapshot at the cursor.
    pub fn current(&self) -> &PageEditMap {
        &self.snapshots[self.cursor]
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.snapshots.len() - 1
    }

    /// Number of snapshots, including the baseline.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        false // the baseline snapshot is always present
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Append a new snapshot, discarding anything after the cursor.
    ///
    /// A map identical to the current snapshot is dropped silently, so
    /// ineffective actions never grow the history.
    pub fn push(&mut self, map: PageEditMap) {
        if map == *self.current() {
            return;
        }
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(map);
        self.cursor = self.snapshots.len() - 1;
    }

    /// Move the cursor back one snapshot; silent no-op at the baseline.
    pub fn undo(&mut self) {
        if self.can_undo() {
            self.cursor -= 1;
        }
    }

    /// Move the cursor forward one snapshot; silent no-op at the tip.
    pub fn redo(&mut self) {
        if self.can_redo() {
            self.cursor += 1;
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
