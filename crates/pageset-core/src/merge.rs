//! PDF Merge algorithm
//!
//! Combines multiple PDFs into a single document. All-or-nothing: the first
//! source that fails to load aborts the merge and is named in the error.

use crate::config::TransformOptions;
use crate::error::{PageSetError, Result};
use crate::output::OutputDocument;
use crate::source::{load_pdf, SourceDocument, SourceKind};
use crate::tree::{finish, flatten_inherited_attributes, rebuild_page_tree, strip_outlines};
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, info, instrument};

/// Merge multiple PDFs into one
///
/// The algorithm:
/// 1. If empty, return error
/// 2. If single document, return it as-is
/// 3. Load every source, copying inherited page attributes onto the pages
/// 4. For each source after the first:
///    a. Calculate ID offset to avoid conflicts
///    b. Import all objects with remapped IDs
///    c. Append pages to the destination
/// 5. Re-parent every page under the first document's page tree
/// 6. Prune, compress and serialize
#[instrument(skip_all, fields(documents = documents.len()))]
pub fn merge_documents(
    documents: &[SourceDocument],
    options: &TransformOptions,
) -> Result<OutputDocument> {
    if documents.is_empty() {
        return Err(PageSetError::EmptySelection("No documents to merge".into()));
    }

    for doc in documents {
        if doc.kind() != SourceKind::Pdf {
            return Err(PageSetError::UnsupportedFormat {
                name: doc.name().to_string(),
                mime: doc.kind().mime().to_string(),
            });
        }
    }

    // Single document - return as-is once we know it parses
    if let [only] = documents {
        only.load()?;
        return Ok(OutputDocument::new(
            only.bytes().to_vec(),
            options.merged_filename.clone(),
            only.page_count(),
        ));
    }

    // Load all documents first
    let mut loaded_docs = Vec::with_capacity(documents.len());
    for source in documents {
        let mut doc = load_pdf(source.name(), source.bytes())?;
        flatten_inherited_attributes(&mut doc);
        debug!(name = source.name(), pages = source.page_count(), "loaded source");
        loaded_docs.push(doc);
    }

    // Start with the first document as the base
    let mut dest = loaded_docs.remove(0);
    let mut dest_max_id = dest.max_id;

    let mut dest_page_refs = get_page_references(&dest);

    for source in loaded_docs.into_iter() {
        // Get source pages before we start moving objects out
        let source_pages = get_page_references(&source);

        let id_offset = dest_max_id;

        for (old_id, object) in source.objects.into_iter() {
            let new_id = (old_id.0 + id_offset, old_id.1);
            dest.objects.insert(new_id, remap_object_refs(object, id_offset));
        }

        dest_page_refs.extend(
            source_pages
                .into_iter()
                .map(|(num, generation)| (num + id_offset, generation)),
        );

        dest_max_id = (source.max_id + id_offset).max(dest_max_id);
    }

    dest.max_id = dest_max_id;
    rebuild_page_tree(&mut dest, &dest_page_refs)?;
    strip_outlines(&mut dest);

    let page_count = dest_page_refs.len() as u32;
    let bytes = finish(dest, options)?;

    info!(page_count, output_bytes = bytes.len(), "merge complete");

    Ok(OutputDocument::new(
        bytes,
        options.merged_filename.clone(),
        page_count,
    ))
}

/// Page object references in page order
fn get_page_references(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Recursively shift every object reference by `offset`
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}
