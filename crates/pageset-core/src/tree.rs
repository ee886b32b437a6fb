//! Page tree surgery shared by merge and extract

use crate::config::TransformOptions;
use crate::error::{PageSetError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeSet;

/// Page attributes that may be inherited from an ancestor Pages node
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guards against Parent cycles in malformed files
const MAX_TREE_DEPTH: usize = 64;

/// Copy inherited attributes onto each page so the page survives being
/// re-parented into a different tree
pub(crate) fn flatten_inherited_attributes(doc: &mut Document) {
    let mut updates = Vec::new();

    for page_id in doc.get_pages().into_values() {
        let Ok(page) = doc.get_dictionary(page_id) else {
            continue;
        };
        let missing: Vec<(&[u8], Object)> = INHERITABLE
            .into_iter()
            .filter(|key| !page.has(key))
            .filter_map(|key| inherited(doc, page, key).map(|value| (key, value.clone())))
            .collect();
        if !missing.is_empty() {
            updates.push((page_id, missing));
        }
    }

    for (page_id, missing) in updates {
        if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            for (key, value) in missing {
                page.set(key, value);
            }
        }
    }
}

fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(id) = parent {
        if depth == MAX_TREE_DEPTH {
            return None;
        }
        depth += 1;

        let dict = doc.get_dictionary(id).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        parent = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Object id of the root Pages node
pub(crate) fn pages_root_id(doc: &Document) -> Result<ObjectId> {
    doc.catalog()
        .map_err(|_| PageSetError::Operation("Catalog not found".into()))?
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|_| PageSetError::Operation("No Pages in catalog".into()))
}

/// Replace the page tree with a flat list of `page_refs`, in order
pub(crate) fn rebuild_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> Result<()> {
    let pages_id = pages_root_id(doc)?;

    match doc.objects.get_mut(&pages_id) {
        Some(Object::Dictionary(pages_dict)) => {
            let kids = page_refs
                .iter()
                .map(|&id| Object::Reference(id))
                .collect::<Vec<_>>();
            pages_dict.set("Kids", Object::Array(kids));
            pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
            pages_dict.remove(b"Parent");
        }
        _ => {
            return Err(PageSetError::Operation(
                "Invalid pages dictionary".into(),
            ))
        }
    }

    for &page_id in page_refs {
        let page = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|_| PageSetError::Operation(format!("Page object {:?} missing", page_id)))?;
        page.set("Parent", Object::Reference(pages_id));
    }

    Ok(())
}

/// Drop the outline tree; its entries point at pages that may be gone
pub(crate) fn strip_outlines(doc: &mut Document) {
    let Ok(root_id) = doc.trailer.get(b"Root").and_then(Object::as_reference) else {
        return;
    };
    if let Ok(catalog) = doc.get_object_mut(root_id).and_then(Object::as_dict_mut) {
        catalog.remove(b"Outlines");
    }
}

/// Cut every remaining path to `removed` pages so pruning drops them and
/// their content.
///
/// Annotations owned by a removed page go with it, as do link annotations
/// on kept pages that jump to one. Named destinations and the structure tree
/// are dropped from the catalog. Any other reference to a dropped object is
/// removed from arrays and nulled in dictionaries.
pub(crate) fn detach_removed_pages(doc: &mut Document, removed: &BTreeSet<ObjectId>) {
    if removed.is_empty() {
        return;
    }

    let mut dropped = removed.clone();
    for &page_id in removed {
        if let Ok(page) = doc.get_dictionary(page_id) {
            dropped.extend(annotation_refs(doc, page));
        }
    }
    for (&id, object) in &doc.objects {
        if let Ok(dict) = object.as_dict() {
            if is_link(dict) && links_to(doc, dict, removed) {
                dropped.insert(id);
            }
        }
    }

    if let Ok(root_id) = doc.trailer.get(b"Root").and_then(Object::as_reference) {
        let catalog = doc.get_dictionary(root_id).ok();
        let open_action_hits = catalog
            .and_then(|catalog| catalog.get(b"OpenAction").ok())
            .is_some_and(|action| destination_hits(doc, action, removed));
        let names_id = catalog
            .and_then(|catalog| catalog.get(b"Names").ok())
            .and_then(|names| names.as_reference().ok());

        if let Ok(catalog) = doc.get_object_mut(root_id).and_then(Object::as_dict_mut) {
            catalog.remove(b"Dests");
            catalog.remove(b"StructTreeRoot");
            catalog.remove(b"MarkInfo");
            if open_action_hits {
                catalog.remove(b"OpenAction");
            }
            if let Ok(names) = catalog.get_mut(b"Names").and_then(Object::as_dict_mut) {
                names.remove(b"Dests");
            }
        }
        if let Some(names_id) = names_id {
            if let Ok(names) = doc.get_object_mut(names_id).and_then(Object::as_dict_mut) {
                names.remove(b"Dests");
            }
        }
    }

    for object in doc.objects.values_mut() {
        unlink(object, &dropped);
    }
}

fn annotation_refs(doc: &Document, page: &Dictionary) -> Vec<ObjectId> {
    let annots = match page.get(b"Annots") {
        Ok(Object::Reference(id)) => doc.get_object(*id).and_then(Object::as_array).ok(),
        Ok(Object::Array(array)) => Some(array),
        _ => None,
    };
    annots
        .into_iter()
        .flatten()
        .filter_map(|annot| annot.as_reference().ok())
        .collect()
}

fn is_link(dict: &Dictionary) -> bool {
    dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Link".as_slice())
}

fn links_to(doc: &Document, annot: &Dictionary, removed: &BTreeSet<ObjectId>) -> bool {
    let via_dest = annot
        .get(b"Dest")
        .is_ok_and(|dest| destination_hits(doc, dest, removed));
    let via_action = annot
        .get(b"A")
        .is_ok_and(|action| destination_hits(doc, action, removed));
    via_dest || via_action
}

/// Whether an explicit destination `[page ...]`, or a GoTo action holding
/// one in `/D`, targets a removed page
fn destination_hits(doc: &Document, target: &Object, removed: &BTreeSet<ObjectId>) -> bool {
    let target = match target {
        Object::Reference(id) if !removed.contains(id) => match doc.get_object(*id) {
            Ok(object) => object,
            Err(_) => return false,
        },
        other => other,
    };
    match target {
        Object::Array(dest) => dest
            .first()
            .and_then(|page| page.as_reference().ok())
            .is_some_and(|page| removed.contains(&page)),
        Object::Dictionary(action) => action
            .get(b"D")
            .is_ok_and(|dest| matches!(dest, Object::Array(_)) && destination_hits(doc, dest, removed)),
        _ => false,
    }
}

fn unlink(object: &mut Object, dropped: &BTreeSet<ObjectId>) {
    match object {
        Object::Array(items) => {
            items.retain(|item| !matches!(item, Object::Reference(id) if dropped.contains(id)));
            for item in items.iter_mut() {
                unlink(item, dropped);
            }
        }
        Object::Dictionary(dict) => unlink_dict(dict, dropped),
        Object::Stream(stream) => unlink_dict(&mut stream.dict, dropped),
        _ => {}
    }
}

fn unlink_dict(dict: &mut Dictionary, dropped: &BTreeSet<ObjectId>) {
    for (_, value) in dict.iter_mut() {
        match value {
            Object::Reference(id) if dropped.contains(id) => *value = Object::Null,
            other => unlink(other, dropped),
        }
    }
}

fn stamp_producer(doc: &mut Document, producer: &str) {
    let existing = doc
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .ok();

    if let Some(info_id) = existing {
        if let Ok(info) = doc.get_object_mut(info_id).and_then(Object::as_dict_mut) {
            info.set("Producer", Object::string_literal(producer));
            return;
        }
    }

    let info = Dictionary::from_iter(vec![("Producer", Object::string_literal(producer))]);
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", Object::Reference(info_id));
}

/// Prune, optionally compress, and serialize
pub(crate) fn finish(mut doc: Document, options: &TransformOptions) -> Result<Vec<u8>> {
    if let Some(producer) = &options.producer {
        stamp_producer(&mut doc, producer);
    }

    doc.prune_objects();
    if options.compress {
        doc.compress();
    }

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PageSetError::Operation(format!("Failed to save PDF: {}", e)))?;

    Ok(buffer)
}
