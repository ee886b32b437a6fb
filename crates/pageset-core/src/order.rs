//! User-ordered list of sources
//!
//! List order is output page order. Reordering is a permutation: nothing is
//! added, dropped or deduplicated.

use crate::error::{PageSetError, Result};
use crate::source::SourceDocument;

#[derive(Debug, Clone, Default)]
pub struct OrderedFileList {
    items: Vec<SourceDocument>,
}

impl OrderedFileList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, document: SourceDocument) {
        self.items.push(document);
    }

    pub fn remove(&mut self, index: usize) -> Result<SourceDocument> {
        if index >= self.items.len() {
            return Err(PageSetError::Operation(
                "Document index out of bounds".into(),
            ));
        }
        Ok(self.items.remove(index))
    }

    /// Apply a permutation: `new_order[i]` is the current index of the
    /// document that should end up at position `i`
    pub fn reorder(&mut self, new_order: &[usize]) -> Result<()> {
        if new_order.len() != self.items.len() {
            return Err(PageSetError::Operation(
                "Invalid order: wrong number of indices".into(),
            ));
        }

        let mut seen = vec![false; self.items.len()];
        for &idx in new_order {
            if idx >= self.items.len() {
                return Err(PageSetError::Operation(
                    "Invalid order: index out of bounds".into(),
                ));
            }
            if seen[idx] {
                return Err(PageSetError::Operation(
                    "Invalid order: duplicate index".into(),
                ));
            }
            seen[idx] = true;
        }

        let mut slots: Vec<Option<SourceDocument>> = self.items.drain(..).map(Some).collect();
        self.items = new_order
            .iter()
            .filter_map(|&idx| slots[idx].take())
            .collect();

        Ok(())
    }

    /// Drag-and-drop move: take the item at `from` and insert it at `to`
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
        if from >= self.items.len() || to >= self.items.len() {
            return Err(PageSetError::Operation(
                "Document index out of bounds".into(),
            ));
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SourceDocument> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SourceDocument> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[SourceDocument] {
        &self.items
    }

    pub fn total_pages(&self) -> u32 {
        self.items.iter().map(|d| d.page_count()).sum()
    }
}

impl FromIterator<SourceDocument> for OrderedFileList {
    fn from_iter<I: IntoIterator<Item = SourceDocument>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
