//! Page-set transforms for PDFs and page images
//!
//! Builds a new PDF from an ordered set of sources using lopdf:
//! - `merge_documents`: concatenate whole documents in list order
//! - `extract_pages` / `split_ranges`: keep a subset of one document's pages
//! - `images_to_document`: one full-bleed page per image
//!
//! Inputs are immutable value objects ([`SourceDocument`], [`PageSelection`],
//! [`OrderedFileList`]); every transform is a pure function returning a fresh
//! [`OutputDocument`].

pub mod accept;
pub mod command;
pub mod config;
pub mod error;
pub mod extract;
pub mod images;
pub mod inspect;
pub mod merge;
pub mod order;
pub mod output;
pub mod selection;
pub mod source;

mod tree;

#[cfg(test)]
mod fixtures;

pub use accept::AcceptList;
pub use command::{execute, execute_timed, Command, InputFile, ProcessMetrics, ProcessResult};
pub use config::TransformOptions;
pub use error::{PageSetError, Result};
pub use extract::{extract_pages, split_ranges};
pub use images::{images_to_document, ImageBatch, SkippedImage};
pub use inspect::{inspect, quick_validate, DocumentInfo, PageInfo, PageOrientation};
pub use merge::merge_documents;
pub use order::OrderedFileList;
pub use output::OutputDocument;
pub use selection::PageSelection;
pub use source::{ImageKind, SourceDocument, SourceKind};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32> {
    let doc = source::load_pdf("document", bytes)?;
    Ok(doc.get_pages().len() as u32)
}

/// Parse page range string like "1-3, 5, 8-10" into sorted unique page numbers.
///
/// Every page must lie in `1..=page_count`; bounds are checked before a range
/// is expanded.
pub fn parse_ranges(input: &str, page_count: u32) -> Result<Vec<u32>> {
    use std::collections::BTreeSet;

    let mut pages = BTreeSet::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            // Range like "1-3"
            let start: u32 = start
                .trim()
                .parse()
                .map_err(|_| PageSetError::InvalidRange(format!("Invalid start: {}", start)))?;
            let end: u32 = end
                .trim()
                .parse()
                .map_err(|_| PageSetError::InvalidRange(format!("Invalid end: {}", end)))?;

            selection::check_span(start, end, page_count)?;
            pages.extend(start..=end);
        } else {
            // Single page like "5"
            let page: u32 = part
                .parse()
                .map_err(|_| PageSetError::InvalidRange(format!("Invalid page: {}", part)))?;
            selection::check_span(page, page, page_count)?;
            pages.insert(page);
        }
    }

    Ok(pages.into_iter().collect())
}
