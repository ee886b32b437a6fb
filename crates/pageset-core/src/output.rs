//! Transform output

use serde::Serialize;

/// Serialized PDF plus the name offered for download. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputDocument {
    #[serde(skip)]
    bytes: Vec<u8>,
    filename: String,
    page_count: u32,
}

impl OutputDocument {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>, page_count: u32) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            page_count,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// "report" + "pages" -> "report-pages.pdf"
pub(crate) fn suffixed_filename(stem: &str, suffix: &str) -> String {
    format!("{}-{}.pdf", stem, suffix)
}
