//! Per-page edit collections.
//!
//! A [`PageEditMap`] is one immutable snapshot of every edit in the document.
//! Operations return a new map instead of mutating in place; each returned
//! map is what gets appended to the undo history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::edit::{Edit, EditId, EditPatch};

/// Mapping from 1-based page number to that page's edits in z-order
/// (creation order, latest drawn on top). An absent key means the page has
/// no edits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageEditMap {
    pages: BTreeMap<u32, Vec<Edit>>,
}

impl PageEditMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// New map with `edit` appended to `page`'s sequence.
    pub fn with_added(&self, page: u32, edit: Edit) -> Self {
        let mut next = self.clone();
        next.pages.entry(page).or_default().push(edit);
        next
    }

    /// New map with the patch merged into the matching edit.
    ///
    /// Returns an equal map when no edit on `page` matches `edit_id`; the
    /// caller's history dedup then drops the no-op.
    pub fn with_updated(&self, page: u32, edit_id: EditId, patch: &EditPatch) -> Self {
        let mut next = self.clone();
        if let Some(edits) = next.pages.get_mut(&page) {
            for edit in edits.iter_mut() {
                if edit.id() == edit_id {
                    *edit = edit.with_patch(patch);
                }
            }
        }
        next
    }

    /// New map with the matching edit removed. The page key disappears when
    /// its sequence becomes empty.
    pub fn with_removed(&self, page: u32, edit_id: EditId) -> Self {
        let mut next = self.clone();
        if let Some(edits) = next.pages.get_mut(&page) {
            edits.retain(|edit| edit.id() != edit_id);
            if edits.is_empty() {
                next.pages.remove(&page);
            }
        }
        next
    }

    /// Edits on a page, in z-order.
    pub fn edits_on(&self, page: u32) -> &[Edit] {
        self.pages.get(&page).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up one edit by page and id.
    pub fn find(&self, page: u32, edit_id: EditId) -> Option<&Edit> {
        self.edits_on(page).iter().find(|edit| edit.id() == edit_id)
    }

    /// Pages that carry at least one edit, with their sequences.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[Edit])> {
        self.pages.iter().map(|(page, edits)| (*page, edits.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Total edit count across all pages.
    pub fn len(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }
}
