//! Page extraction
//!
//! Extracts pages from a PDF using "Construction by Whitelist": the kept
//! pages become the whole page tree and everything no longer reachable is
//! pruned. Pages are copied, never re-rendered.

use crate::config::TransformOptions;
use crate::error::{PageSetError, Result};
use crate::output::{suffixed_filename, OutputDocument};
use crate::selection::{check_span, PageSelection};
use crate::source::SourceDocument;
use crate::tree::{
    detach_removed_pages, finish, flatten_inherited_attributes, rebuild_page_tree, strip_outlines,
};
use lopdf::ObjectId;
use std::collections::BTreeSet;
use tracing::{info, instrument};

/// Keep only the selected pages, in ascending original order
///
/// 1. Identify target page objects
/// 2. Pull inherited attributes down onto them
/// 3. Rebuild the page tree from the whitelist
/// 4. Cut links, named destinations and structure entries that still
///    reach a removed page
/// 5. Prune everything unreachable and serialize
#[instrument(skip_all, fields(name = source.name(), kept = selection.kept_count()))]
pub fn extract_pages(
    source: &SourceDocument,
    selection: &PageSelection,
    options: &TransformOptions,
) -> Result<OutputDocument> {
    extract_into(source, selection, options, suffixed_filename(source.stem(), "pages"))
}

/// Split into one document per inclusive range, e.g. `[(1, 3), (4, 4)]`
#[instrument(skip_all, fields(name = source.name(), ranges = ranges.len()))]
pub fn split_ranges(
    source: &SourceDocument,
    ranges: &[(u32, u32)],
    options: &TransformOptions,
) -> Result<Vec<OutputDocument>> {
    if ranges.is_empty() {
        return Err(PageSetError::EmptySelection("No page ranges specified".into()));
    }

    ranges
        .iter()
        .map(|&(start, end)| {
            check_span(start, end, source.page_count())?;
            let pages: Vec<u32> = (start..=end).collect();
            let selection = PageSelection::from_pages(source.page_count(), &pages)?;
            let filename = if start == end {
                suffixed_filename(source.stem(), &start.to_string())
            } else {
                suffixed_filename(source.stem(), &format!("{}-{}", start, end))
            };
            extract_into(source, &selection, options, filename)
        })
        .collect()
}

fn extract_into(
    source: &SourceDocument,
    selection: &PageSelection,
    options: &TransformOptions,
    filename: String,
) -> Result<OutputDocument> {
    if selection.page_count() != source.page_count() {
        return Err(PageSetError::InvalidRange(format!(
            "Selection covers {} pages but \"{}\" has {}",
            selection.page_count(),
            source.name(),
            source.page_count()
        )));
    }
    if selection.is_empty() {
        return Err(PageSetError::EmptySelection("No pages selected".into()));
    }

    let mut doc = source.load()?;
    flatten_inherited_attributes(&mut doc);

    let pages = doc.get_pages();
    let keep: Vec<ObjectId> = selection
        .kept()
        .iter()
        .map(|page| {
            pages.get(page).copied().ok_or_else(|| {
                PageSetError::InvalidRange(format!(
                    "Page {} does not exist (document has {} pages)",
                    page,
                    pages.len()
                ))
            })
        })
        .collect::<Result<_>>()?;

    let removed: BTreeSet<ObjectId> = pages
        .values()
        .copied()
        .filter(|id| !keep.contains(id))
        .collect();

    rebuild_page_tree(&mut doc, &keep)?;
    strip_outlines(&mut doc);
    detach_removed_pages(&mut doc, &removed);

    let bytes = finish(doc, options)?;
    info!(pages = keep.len(), output_bytes = bytes.len(), "extraction complete");

    Ok(OutputDocument::new(bytes, filename, keep.len() as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{
        create_nested_pdf, create_test_pdf, page_labels, with_references_to_last_page,
    };
    use crate::inspect::PageInfo;
    use lopdf::{Document, Object};
    use pretty_assertions::assert_eq;

    fn source(pages: u32) -> SourceDocument {
        SourceDocument::pdf("book.pdf", create_test_pdf(pages, "Book")).unwrap()
    }

    fn extract(doc: &SourceDocument, pages: &[u32]) -> Result<OutputDocument> {
        let selection = PageSelection::from_pages(doc.page_count(), pages)?;
        extract_pages(doc, &selection, &TransformOptions::default())
    }

    #[test]
    fn test_extract_empty_selection_fails() {
        let doc = source(5);
        let result = extract(&doc, &[]);
        assert!(matches!(result, Err(PageSetError::EmptySelection(_))));
    }

    #[test]
    fn test_extract_single_page() {
        let doc = source(5);
        let out = extract(&doc, &[1]).unwrap();
        assert_eq!(out.page_count(), 1);
        assert_eq!(page_labels(out.bytes()), vec!["Book-Page-1"]);
    }

    #[test]
    fn test_extract_even_pages_of_ten() {
        let doc = source(10);
        let out = extract(&doc, &[2, 4, 6]).unwrap();

        assert_eq!(out.page_count(), 3);
        assert_eq!(out.filename(), "book-pages.pdf");
        assert_eq!(
            page_labels(out.bytes()),
            vec!["Book-Page-2", "Book-Page-4", "Book-Page-6"]
        );
    }

    #[test]
    fn test_extract_ignores_click_order() {
        let doc = source(6);
        let out = extract(&doc, &[5, 1, 3]).unwrap();
        assert_eq!(
            page_labels(out.bytes()),
            vec!["Book-Page-1", "Book-Page-3", "Book-Page-5"]
        );
    }

    #[test]
    fn test_extract_full_range_is_a_copy() {
        let doc = source(4);
        let out = extract_pages(&doc, &PageSelection::all(4), &TransformOptions::default()).unwrap();
        assert_eq!(page_labels(out.bytes()), page_labels(doc.bytes()));
    }

    #[test]
    fn test_extract_prunes_removed_pages() {
        let doc = source(5);
        let out = extract(&doc, &[2]).unwrap();
        let saved = Document::load_mem(out.bytes()).unwrap();
        let page_objects = saved
            .objects
            .values()
            .filter(|obj| {
                obj.as_dict()
                    .ok()
                    .and_then(|d| d.get(b"Type").ok())
                    .and_then(|t| t.as_name().ok())
                    == Some(b"Page".as_slice())
            })
            .count();
        assert_eq!(page_objects, 1);
    }

    fn page_objects(doc: &Document) -> usize {
        doc.objects
            .values()
            .filter(|obj| {
                obj.as_dict()
                    .ok()
                    .and_then(|d| d.get(b"Type").ok())
                    .and_then(|t| t.as_name().ok())
                    == Some(b"Page".as_slice())
            })
            .count()
    }

    #[test]
    fn test_extract_drops_pages_still_referenced_elsewhere() {
        let bytes = with_references_to_last_page(&create_test_pdf(2, "Book"));
        let doc = SourceDocument::pdf("book.pdf", bytes).unwrap();
        let selection = PageSelection::from_pages(2, &[1]).unwrap();
        let options = TransformOptions {
            compress: false,
            ..TransformOptions::default()
        };

        let out = extract_pages(&doc, &selection, &options).unwrap();

        let raw = String::from_utf8_lossy(out.bytes());
        assert!(!raw.contains("Book-Page-2"));
        assert!(!raw.contains("hidden-field-value"));
        assert_eq!(page_labels(out.bytes()), vec!["Book-Page-1"]);

        let saved = Document::load_mem(out.bytes()).unwrap();
        assert_eq!(page_objects(&saved), 1);
        let catalog = saved.catalog().unwrap();
        assert!(!catalog.has(b"StructTreeRoot"));
        let page_id = *saved.get_pages().get(&1).unwrap();
        let annots = saved
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Annots")
            .and_then(Object::as_array)
            .unwrap();
        assert!(annots.is_empty());
    }

    #[test]
    fn test_extract_keeps_links_between_kept_pages() {
        let bytes = with_references_to_last_page(&create_test_pdf(3, "Book"));
        let doc = SourceDocument::pdf("book.pdf", bytes).unwrap();
        let selection = PageSelection::from_pages(3, &[1, 3]).unwrap();

        let out = extract_pages(&doc, &selection, &TransformOptions::default()).unwrap();

        let saved = Document::load_mem(out.bytes()).unwrap();
        let page_id = *saved.get_pages().get(&1).unwrap();
        let annots = saved
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Annots")
            .and_then(Object::as_array)
            .unwrap();
        assert_eq!(annots.len(), 1);
    }

    #[test]
    fn test_extract_from_nested_tree_keeps_inherited_attributes() {
        let doc = SourceDocument::pdf("nested.pdf", create_nested_pdf("N")).unwrap();
        let selection = PageSelection::from_pages(3, &[2, 3]).unwrap();

        let out = extract_pages(&doc, &selection, &TransformOptions::default()).unwrap();

        assert_eq!(page_labels(out.bytes()), vec!["N-Page-2", "N-Page-3"]);
        let saved = Document::load_mem(out.bytes()).unwrap();
        let rotated = PageInfo::from_document(&saved, 1).unwrap();
        assert_eq!(rotated.rotation, 90);
        assert_eq!((rotated.width, rotated.height), (612.0, 792.0));
        let small = PageInfo::from_document(&saved, 2).unwrap();
        assert_eq!(small.rotation, 0);
        assert_eq!((small.width, small.height), (300.0, 400.0));

        let first = saved.get_dictionary(*saved.get_pages().get(&1).unwrap()).unwrap();
        let fonts = first
            .get(b"Resources")
            .and_then(Object::as_dict)
            .and_then(|r| r.get(b"Font"))
            .and_then(Object::as_dict)
            .unwrap();
        assert!(fonts.has(b"F1"));
    }

    #[test]
    fn test_extract_rejects_mismatched_selection() {
        let doc = source(3);
        let selection = PageSelection::all(7);
        let result = extract_pages(&doc, &selection, &TransformOptions::default());
        assert!(matches!(result, Err(PageSetError::InvalidRange(_))));
    }

    #[test]
    fn test_split_ranges_produces_one_document_per_range() {
        let doc = source(10);
        let parts = split_ranges(&doc, &[(1, 3), (5, 5), (8, 10)], &TransformOptions::default())
            .unwrap();

        let counts: Vec<u32> = parts.iter().map(|p| p.page_count()).collect();
        assert_eq!(counts, vec![3, 1, 3]);
        let names: Vec<&str> = parts.iter().map(|p| p.filename()).collect();
        assert_eq!(names, vec!["book-1-3.pdf", "book-5.pdf", "book-8-10.pdf"]);
    }

    #[test]
    fn test_split_ranges_rejects_bad_ranges() {
        let doc = source(5);
        let options = TransformOptions::default();
        assert!(split_ranges(&doc, &[], &options).is_err());
        assert!(split_ranges(&doc, &[(4, 2)], &options).is_err());
        assert!(split_ranges(&doc, &[(1, 9)], &options).is_err());
        assert!(split_ranges(&doc, &[(0, 1)], &options).is_err());
    }

    #[test]
    fn test_split_ranges_rejects_huge_range_before_expanding() {
        let doc = source(3);
        let result = split_ranges(&doc, &[(1, u32::MAX)], &TransformOptions::default());
        assert!(matches!(result, Err(PageSetError::InvalidRange(_))));
    }
}
