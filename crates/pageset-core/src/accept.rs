//! File-picker accept lists
//!
//! Mirrors the HTML `accept` attribute for MIME types: entries are exact
//! types (`application/pdf`) or wildcard prefixes (`image/*`). Files that do
//! not match are dropped from the selection without any error.

use crate::source::normalize_mime;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AcceptEntry {
    Exact(String),
    /// Major type of a `major/*` entry
    Prefix(String),
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AcceptList {
    entries: Vec<AcceptEntry>,
}

impl AcceptList {
    /// Parse a comma-separated list like `"application/pdf, image/*"`
    pub fn parse(accept: &str) -> Self {
        let entries = accept
            .split(',')
            .map(normalize_mime)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.as_str() {
                "*" | "*/*" => AcceptEntry::Any,
                _ => match entry.strip_suffix("/*") {
                    Some(major) => AcceptEntry::Prefix(major.to_string()),
                    None => AcceptEntry::Exact(entry),
                },
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a file with this MIME type may be selected
    pub fn matches(&self, mime: &str) -> bool {
        let mime = normalize_mime(mime);
        if mime.is_empty() {
            return false;
        }
        self.entries.iter().any(|entry| match entry {
            AcceptEntry::Any => true,
            AcceptEntry::Exact(exact) => *exact == mime,
            AcceptEntry::Prefix(major) => mime
                .split_once('/')
                .is_some_and(|(m, sub)| m == major && !sub.is_empty()),
        })
    }

    /// Keep the candidates whose MIME type matches, preserving order
    pub fn filter<T, F>(&self, candidates: impl IntoIterator<Item = T>, mime_of: F) -> Vec<T>
    where
        F: Fn(&T) -> &str,
    {
        candidates
            .into_iter()
            .filter(|candidate| self.matches(mime_of(candidate)))
            .collect()
    }
}
