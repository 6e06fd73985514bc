//! Display and export ordering of document pages.

use serde::{Deserialize, Serialize};

/// Permutation of the original 1-based page numbers.
///
/// Governs both the thumbnail sidebar and the export page sequence. Only an
/// explicit reorder action changes it; edit actions never do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOrder(Vec<u32>);

impl PageOrder {
    /// Identity order `1..=page_count`.
    pub fn for_page_count(page_count: u32) -> Self {
        Self((1..=page_count).collect())
    }

    pub fn from_pages(pages: Vec<u32>) -> Self {
        Self(pages)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pages(&self) -> &[u32] {
        &self.0
    }

    /// Index an original page number now occupies, if it is present at all.
    pub fn position_of(&self, page: u32) -> Option<usize> {
        self.0.iter().position(|&candidate| candidate == page)
    }

    /// Move the entry at `from` so it lands at index `to` (both 0-based),
    /// keeping the relative order of everything else. Silent no-op when
    /// either index is out of bounds.
    pub fn reorder(&mut self, from: usize, to: usize) {
        if from >= self.0.len() || to >= self.0.len() {
            return;
        }
        let page = self.0.remove(from);
        self.0.insert(to, page);
    }
}
