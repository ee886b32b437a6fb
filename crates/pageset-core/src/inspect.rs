//! PDF validation and info extraction
//!
//! Cheap checks and metadata shown to the user before they commit to a
//! transform.

use crate::error::{PageSetError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;

/// PDF file information extracted during validation
#[derive(Debug, Clone, Serialize, Default)]
pub struct DocumentInfo {
    /// Number of pages in the document
    pub page_count: u32,
    /// PDF version string (e.g., "1.7")
    pub version: String,
    /// Whether the document is encrypted
    pub encrypted: bool,
    /// File size in bytes
    pub size_bytes: usize,
    /// Document title from metadata (if available)
    pub title: Option<String>,
    /// Document author from metadata (if available)
    pub author: Option<String>,
}

/// Information about a single PDF page
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    /// Page number (1-indexed)
    pub page_num: u32,
    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Page rotation in degrees (0, 90, 180, 270)
    pub rotation: i32,
    /// Whether the page has a content stream (not blank)
    pub has_content: bool,
    /// Orientation as displayed, i.e. after rotation
    pub orientation: PageOrientation,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub enum PageOrientation {
    Portrait,
    Landscape,
    Square,
}

/// Parse a PDF and collect its info
pub fn inspect(name: &str, bytes: &[u8]) -> Result<DocumentInfo> {
    quick_header_check(bytes).map_err(|reason| PageSetError::unreadable(name, reason))?;

    let document = Document::load_mem(bytes).map_err(|e| PageSetError::unreadable(name, e))?;

    let page_count = document.get_pages().len() as u32;
    if page_count == 0 {
        return Err(PageSetError::unreadable(name, "PDF has no pages"));
    }

    Ok(DocumentInfo {
        page_count,
        version: extract_version(bytes),
        encrypted: document.is_encrypted(),
        size_bytes: bytes.len(),
        title: info_string(&document, b"Title"),
        author: info_string(&document, b"Author"),
    })
}

/// Quick validation without full parsing (for large files)
pub fn quick_validate(bytes: &[u8]) -> std::result::Result<(), String> {
    quick_header_check(bytes)?;

    // EOF marker should be near the end
    let tail = if bytes.len() > 1024 {
        &bytes[bytes.len() - 1024..]
    } else {
        bytes
    };

    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err("PDF appears truncated (missing %%EOF marker)".to_string());
    }

    Ok(())
}

fn quick_header_check(bytes: &[u8]) -> std::result::Result<(), String> {
    if bytes.len() < 8 {
        return Err("File too small to be a valid PDF".to_string());
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err("Not a valid PDF file (missing %PDF- header)".to_string());
    }
    Ok(())
}

/// Header format: %PDF-1.7
fn extract_version(bytes: &[u8]) -> String {
    if bytes.len() >= 8 && bytes.starts_with(b"%PDF-") {
        if let Ok(version) = std::str::from_utf8(&bytes[5..8]) {
            return version.trim().to_string();
        }
    }
    "1.4".to_string()
}

fn info_string(document: &Document, key: &[u8]) -> Option<String> {
    let info_id = document.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let value = document.get_dictionary(info_id).ok()?.get(key).ok()?;
    let decoded = String::from_utf8_lossy(value.as_str().ok()?).into_owned();
    (!decoded.is_empty()).then_some(decoded)
}

impl PageInfo {
    /// Extract page info from a parsed document
    pub fn from_document(doc: &Document, page_num: u32) -> Result<Self> {
        let pages = doc.get_pages();
        let page_id = pages.get(&page_num).ok_or_else(|| {
            PageSetError::InvalidRange(format!(
                "Page {} is out of range (1-{})",
                page_num,
                pages.len()
            ))
        })?;
        Self::of_page(doc, page_num, *page_id)
    }

    /// Info for every page, in page order, walking the tree once
    pub fn all(doc: &Document) -> Result<Vec<Self>> {
        doc.get_pages()
            .into_iter()
            .map(|(page_num, page_id)| Self::of_page(doc, page_num, page_id))
            .collect()
    }

    fn of_page(doc: &Document, page_num: u32, page_id: ObjectId) -> Result<Self> {
        let page_dict = doc
            .get_dictionary(page_id)
            .map_err(|_| PageSetError::Operation(format!("Page {} is not a dictionary", page_num)))?;

        let media_box = inherited_attr(doc, page_dict, b"MediaBox")
            .and_then(|obj| parse_box(doc, obj))
            .unwrap_or([0.0, 0.0, 612.0, 792.0]);
        let (width, height) = (media_box[2] - media_box[0], media_box[3] - media_box[1]);

        let rotation = inherited_attr(doc, page_dict, b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .map(|angle| normalize_rotation(angle as i32))
            .unwrap_or(0);

        let has_content = page_dict.get(b"Contents").is_ok();

        let (effective_width, effective_height) = if rotation == 90 || rotation == 270 {
            (height, width)
        } else {
            (width, height)
        };

        let orientation = if (effective_width - effective_height).abs() < 1.0 {
            PageOrientation::Square
        } else if effective_width > effective_height {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        };

        Ok(Self {
            page_num,
            width: width as f32,
            height: height as f32,
            rotation,
            has_content,
            orientation,
        })
    }
}

/// Look up an attribute on the page, then up its Parent chain
fn inherited_attr<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut dict = page;
    for _ in 0..64 {
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        let parent_id = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
        dict = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

/// Parse a box array [x1, y1, x2, y2], following a reference if needed
fn parse_box(doc: &Document, obj: &Object) -> Option<[f64; 4]> {
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let array = obj.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }

    let mut result = [0.0; 4];
    for (slot, obj) in result.iter_mut().zip(array) {
        *slot = match obj {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => *n as f64,
            _ => return None,
        };
    }
    Some(result)
}

/// Normalize rotation to 0, 90, 180, or 270
fn normalize_rotation(angle: i32) -> i32 {
    angle.rem_euclid(360)
}
