//! Source documents and the closed set of input kinds
//!
//! MIME strings are resolved to a [`SourceKind`] once, at the boundary.
//! Past that point every transform matches on the enum, so an unsupported
//! type can never reach a stage that assumed it was valid.

use crate::error::{PageSetError, Result};
use crate::inspect::PageInfo;
use lopdf::Document;
use serde::Serialize;
use std::path::Path;

/// Raster formats accepted for image-to-PDF conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    pub fn mime(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Webp => "image/webp",
        }
    }

    pub(crate) fn image_format(self) -> image::ImageFormat {
        match self {
            ImageKind::Jpeg => image::ImageFormat::Jpeg,
            ImageKind::Png => image::ImageFormat::Png,
            ImageKind::Webp => image::ImageFormat::WebP,
        }
    }
}

/// What a source file is, as far as the transformer cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SourceKind {
    Pdf,
    Image(ImageKind),
}

impl SourceKind {
    /// Resolve a MIME type. Parameters (`; charset=...`) and case are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match normalize_mime(mime).as_str() {
            "application/pdf" | "application/x-pdf" => Some(SourceKind::Pdf),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(SourceKind::Image(ImageKind::Jpeg)),
            "image/png" => Some(SourceKind::Image(ImageKind::Png)),
            "image/webp" => Some(SourceKind::Image(ImageKind::Webp)),
            _ => None,
        }
    }

    /// Resolve from a filename extension
    pub fn from_extension(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(SourceKind::Pdf),
            "jpg" | "jpeg" | "jfif" => Some(SourceKind::Image(ImageKind::Jpeg)),
            "png" => Some(SourceKind::Image(ImageKind::Png)),
            "webp" => Some(SourceKind::Image(ImageKind::Webp)),
            _ => None,
        }
    }

    /// Resolve from magic bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF-") {
            Some(SourceKind::Pdf)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(SourceKind::Image(ImageKind::Jpeg))
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(SourceKind::Image(ImageKind::Png))
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(SourceKind::Image(ImageKind::Webp))
        } else {
            None
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            SourceKind::Pdf => "application/pdf",
            SourceKind::Image(kind) => kind.mime(),
        }
    }

    pub fn is_pdf(self) -> bool {
        matches!(self, SourceKind::Pdf)
    }
}

pub(crate) fn normalize_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// One uploaded file, immutable once loaded
#[derive(Debug, Clone)]
pub struct SourceDocument {
    name: String,
    kind: SourceKind,
    bytes: Vec<u8>,
    page_count: u32,
    /// Per-page geometry, filled while the PDF is parsed; empty for images
    pages: Vec<PageInfo>,
}

impl SourceDocument {
    /// Open a file selected by the user.
    ///
    /// The declared MIME type wins; an empty one (browsers leave it blank for
    /// unknown extensions) falls back to the extension, then to magic bytes.
    /// PDFs are parsed here, once, so the page count and page geometry are
    /// known up front.
    pub fn open(name: &str, mime: &str, bytes: Vec<u8>) -> Result<Self> {
        let kind = if normalize_mime(mime).is_empty() {
            SourceKind::from_extension(name).or_else(|| SourceKind::sniff(&bytes))
        } else {
            SourceKind::from_mime(mime)
        }
        .ok_or_else(|| PageSetError::UnsupportedFormat {
            name: name.to_string(),
            mime: mime.to_string(),
        })?;

        let pages = match kind {
            SourceKind::Pdf => PageInfo::all(&load_pdf(name, &bytes)?)
                .map_err(|e| PageSetError::unreadable(name, e))?,
            SourceKind::Image(_) => Vec::new(),
        };
        let page_count = match kind {
            SourceKind::Pdf => pages.len() as u32,
            SourceKind::Image(_) => 1,
        };

        if page_count == 0 {
            return Err(PageSetError::unreadable(name, "PDF has no pages"));
        }

        Ok(Self {
            name: name.to_string(),
            kind,
            bytes,
            page_count,
            pages,
        })
    }

    /// Open a PDF, inferring nothing from the name
    pub fn pdf(name: &str, bytes: Vec<u8>) -> Result<Self> {
        Self::open(name, SourceKind::Pdf.mime(), bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Pages this source contributes (1 for images)
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Geometry of one PDF page (1-indexed), without re-parsing
    pub fn page_info(&self, page_num: u32) -> Result<&PageInfo> {
        if !self.kind.is_pdf() {
            return Err(PageSetError::UnsupportedFormat {
                name: self.name.clone(),
                mime: self.kind.mime().to_string(),
            });
        }
        page_num
            .checked_sub(1)
            .and_then(|index| self.pages.get(index as usize))
            .ok_or_else(|| {
                PageSetError::InvalidRange(format!(
                    "Page {} is out of range (1-{})",
                    page_num, self.page_count
                ))
            })
    }

    /// Filename without its extension, for building output names
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("document")
    }

    /// Parse the PDF content
    pub fn load(&self) -> Result<Document> {
        match self.kind {
            SourceKind::Pdf => load_pdf(&self.name, &self.bytes),
            SourceKind::Image(_) => Err(PageSetError::UnsupportedFormat {
                name: self.name.clone(),
                mime: self.kind.mime().to_string(),
            }),
        }
    }
}

/// Parse PDF bytes, rejecting documents that are still encrypted afterwards
pub(crate) fn load_pdf(name: &str, bytes: &[u8]) -> Result<Document> {
    let doc = Document::load_mem(bytes).map_err(|e| PageSetError::unreadable(name, e))?;
    if doc.is_encrypted() {
        return Err(PageSetError::unreadable(name, "document is password-protected"));
    }
    Ok(doc)
}
