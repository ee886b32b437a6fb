//! Page selection over a single document
//!
//! Only the removed pages are stored. Keep is the complement over
//! `1..=page_count`, so a page is always in exactly one of the two states.

use crate::error::{PageSetError, Result};
use crate::parse_ranges;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSelection {
    page_count: u32,
    removed: BTreeSet<u32>,
}

impl PageSelection {
    /// Every page kept
    pub fn all(page_count: u32) -> Self {
        Self {
            page_count,
            removed: BTreeSet::new(),
        }
    }

    /// Every page removed
    pub fn none(page_count: u32) -> Self {
        Self {
            page_count,
            removed: (1..=page_count).collect(),
        }
    }

    /// Keep exactly the given pages
    pub fn from_pages(page_count: u32, pages: &[u32]) -> Result<Self> {
        let mut selection = Self::none(page_count);
        for &page in pages {
            selection.keep(page)?;
        }
        Ok(selection)
    }

    /// Keep the pages named by a range string like "1-3, 5, 8-10"
    pub fn from_ranges(page_count: u32, ranges: &str) -> Result<Self> {
        let pages = parse_ranges(ranges, page_count)?;
        Self::from_pages(page_count, &pages)
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn keep(&mut self, page: u32) -> Result<()> {
        self.check(page)?;
        self.removed.remove(&page);
        Ok(())
    }

    pub fn remove(&mut self, page: u32) -> Result<()> {
        self.check(page)?;
        self.removed.insert(page);
        Ok(())
    }

    /// Flip a page between keep and remove; returns whether it is now kept
    pub fn toggle(&mut self, page: u32) -> Result<bool> {
        self.check(page)?;
        if self.removed.remove(&page) {
            Ok(true)
        } else {
            self.removed.insert(page);
            Ok(false)
        }
    }

    pub fn is_kept(&self, page: u32) -> bool {
        (1..=self.page_count).contains(&page) && !self.removed.contains(&page)
    }

    /// Kept pages in ascending order
    pub fn kept(&self) -> Vec<u32> {
        (1..=self.page_count)
            .filter(|p| !self.removed.contains(p))
            .collect()
    }

    /// Removed pages in ascending order
    pub fn removed(&self) -> Vec<u32> {
        self.removed.iter().copied().collect()
    }

    pub fn kept_count(&self) -> u32 {
        self.page_count - self.removed.len() as u32
    }

    /// True when no page is kept
    pub fn is_empty(&self) -> bool {
        self.kept_count() == 0
    }

    fn check(&self, page: u32) -> Result<()> {
        check_span(page, page, self.page_count)
    }
}

/// Validate an inclusive span against `1..=page_count` without expanding it
pub(crate) fn check_span(start: u32, end: u32, page_count: u32) -> Result<()> {
    if start > end {
        return Err(PageSetError::InvalidRange(format!(
            "Start {} > end {}",
            start, end
        )));
    }
    let outside = if start == 0 {
        Some(start)
    } else if end > page_count {
        Some(end)
    } else {
        None
    };
    match outside {
        Some(page) => Err(PageSetError::InvalidRange(format!(
            "Page {} is out of range (1-{})",
            page, page_count
        ))),
        None => Ok(()),
    }
}
