use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PageSetError {
    /// The source could not be parsed (corrupt or password-protected)
    #[error("Cannot read \"{name}\": {reason}")]
    UnreadableSource { name: String, reason: String },

    #[error("Nothing selected: {0}")]
    EmptySelection(String),

    #[error("Unsupported file type for \"{name}\": {mime}")]
    UnsupportedFormat { name: String, mime: String },

    #[error("Invalid page range: {0}")]
    InvalidRange(String),

    #[error("PDF operation failed: {0}")]
    Operation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PageSetError {
    pub(crate) fn unreadable(name: &str, reason: impl ToString) -> Self {
        Self::UnreadableSource {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PageSetError>;
