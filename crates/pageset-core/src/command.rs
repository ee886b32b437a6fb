//! JSON command boundary
//!
//! Every transform can be driven by one serialized [`Command`]. Errors never
//! escape [`execute`]: they become the `error` string of a failed
//! [`ProcessResult`].

use crate::config::TransformOptions;
use crate::error::{PageSetError, Result};
use crate::extract::{extract_pages, split_ranges};
use crate::images::{images_to_document_with_skips, SkippedImage};
use crate::merge::merge_documents;
use crate::output::OutputDocument;
use crate::selection::PageSelection;
use crate::source::SourceDocument;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A file as it arrives from the picker
#[derive(Debug, Clone, Deserialize)]
pub struct InputFile {
    pub name: String,
    #[serde(default)]
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    Merge {
        files: Vec<InputFile>,
    },
    Extract {
        file: InputFile,
        pages: Vec<u32>,
    },
    Split {
        file: InputFile,
        ranges: Vec<(u32, u32)>,
    },
    ImagesToPdf {
        images: Vec<InputFile>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub success: bool,
    /// Base64-encoded PDF data, one entry per output document
    pub data: Vec<EncodedDocument>,
    pub error: Option<String>,
    /// Inputs left out of an image conversion
    pub skipped: Vec<SkippedImage>,
    pub metrics: Option<ProcessMetrics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EncodedDocument {
    pub filename: String,
    pub page_count: u32,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessMetrics {
    pub input_size_bytes: usize,
    pub output_size_bytes: usize,
    pub page_count: u32,
    /// Only set when the caller supplied a clock
    pub processing_time_ms: Option<u64>,
}

impl Command {
    /// Parse a command from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PageSetError::Serialization(format!("Invalid command: {}", e)))
    }

    fn input_size(&self) -> usize {
        match self {
            Command::Merge { files } | Command::ImagesToPdf { images: files } => {
                files.iter().map(|f| f.bytes.len()).sum()
            }
            Command::Extract { file, .. } | Command::Split { file, .. } => file.bytes.len(),
        }
    }
}

/// Run a command, folding any failure into the result
pub fn execute(command: Command, options: &TransformOptions) -> ProcessResult {
    execute_with_clock(command, options, None)
}

/// Same as [`execute`], timing the run with `now_ms` (milliseconds since any
/// fixed origin). `std::time::Instant` panics on wasm32, so the clock comes
/// from the caller.
pub fn execute_timed(
    command: Command,
    options: &TransformOptions,
    now_ms: impl Fn() -> f64,
) -> ProcessResult {
    execute_with_clock(command, options, Some(&now_ms))
}

fn execute_with_clock(
    command: Command,
    options: &TransformOptions,
    now_ms: Option<&dyn Fn() -> f64>,
) -> ProcessResult {
    let started = now_ms.map(|now| now());
    let input_size_bytes = command.input_size();

    match run(command, options) {
        Ok((outputs, skipped)) => {
            let processing_time_ms = now_ms
                .zip(started)
                .map(|(now, started)| (now() - started).max(0.0) as u64);
            let metrics = ProcessMetrics {
                input_size_bytes,
                output_size_bytes: outputs.iter().map(OutputDocument::size_bytes).sum(),
                page_count: outputs.iter().map(OutputDocument::page_count).sum(),
                processing_time_ms,
            };
            ProcessResult {
                success: true,
                data: outputs
                    .into_iter()
                    .map(|out| EncodedDocument {
                        filename: out.filename().to_string(),
                        page_count: out.page_count(),
                        data: STANDARD.encode(out.bytes()),
                    })
                    .collect(),
                error: None,
                skipped,
                metrics: Some(metrics),
            }
        }
        Err(e) => {
            warn!(error = %e, "command failed");
            ProcessResult {
                success: false,
                data: Vec::new(),
                error: Some(e.to_string()),
                skipped: Vec::new(),
                metrics: None,
            }
        }
    }
}

fn run(
    command: Command,
    options: &TransformOptions,
) -> Result<(Vec<OutputDocument>, Vec<SkippedImage>)> {
    options.validate()?;

    match command {
        Command::Merge { files } => {
            let documents = files
                .into_iter()
                .map(open)
                .collect::<Result<Vec<_>>>()?;
            Ok((vec![merge_documents(&documents, options)?], Vec::new()))
        }
        Command::Extract { file, pages } => {
            let document = open(file)?;
            let selection = PageSelection::from_pages(document.page_count(), &pages)?;
            Ok((
                vec![extract_pages(&document, &selection, options)?],
                Vec::new(),
            ))
        }
        Command::Split { file, ranges } => {
            let document = open(file)?;
            Ok((split_ranges(&document, &ranges, options)?, Vec::new()))
        }
        Command::ImagesToPdf { images } => {
            let mut documents = Vec::with_capacity(images.len());
            let mut skipped = Vec::new();
            for file in images {
                let name = file.name.clone();
                match open(file) {
                    Ok(doc) => documents.push(doc),
                    Err(e) => skipped.push(SkippedImage {
                        name,
                        reason: e.to_string(),
                    }),
                }
            }
            let batch = images_to_document_with_skips(&documents, skipped, options)?;
            Ok((vec![batch.output], batch.skipped))
        }
    }
}

fn open(file: InputFile) -> Result<SourceDocument> {
    SourceDocument::open(&file.name, &file.mime, file.bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{create_test_pdf, encrypted, png_bytes};
    use pretty_assertions::assert_eq;

    fn pdf_file(name: &str, pages: u32) -> InputFile {
        InputFile {
            name: name.into(),
            mime: "application/pdf".into(),
            bytes: create_test_pdf(pages, name),
        }
    }

    #[test]
    fn test_command_deserializes_merge() {
        let json = r#"{"type":"Merge","files":[]}"#;
        let cmd = Command::from_json(json).unwrap();
        assert!(matches!(cmd, Command::Merge { .. }));
    }

    #[test]
    fn test_command_deserializes_split() {
        let json = r#"{"type":"Split","file":{"name":"a.pdf","bytes":[]},"ranges":[[1,3],[5,5]]}"#;
        let cmd = Command::from_json(json).unwrap();
        assert!(matches!(cmd, Command::Split { .. }));
    }

    #[test]
    fn test_command_rejects_unknown_type() {
        assert!(Command::from_json(r#"{"type":"Compress"}"#).is_err());
    }

    #[test]
    fn test_execute_merge_reports_metrics() {
        let cmd = Command::Merge {
            files: vec![pdf_file("a", 3), pdf_file("b", 2)],
        };

        let result = execute(cmd, &TransformOptions::default());

        assert!(result.success);
        assert_eq!(result.data.len(), 1);
        assert_eq!(result.data[0].filename, "merged.pdf");
        let metrics = result.metrics.unwrap();
        assert_eq!(metrics.page_count, 5);
        assert!(metrics.output_size_bytes > 0);

        let bytes = STANDARD.decode(&result.data[0].data).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_execute_timed_uses_caller_clock() {
        let ticks = std::cell::Cell::new(0.0);
        let clock = || {
            ticks.set(ticks.get() + 250.0);
            ticks.get()
        };
        let cmd = Command::Extract {
            file: pdf_file("a", 3),
            pages: vec![2],
        };

        let result = execute_timed(cmd, &TransformOptions::default(), clock);

        assert!(result.success);
        assert_eq!(result.metrics.unwrap().processing_time_ms, Some(250));
    }

    #[test]
    fn test_execute_without_clock_leaves_time_unset() {
        let cmd = Command::Merge {
            files: vec![pdf_file("a", 1), pdf_file("b", 1)],
        };
        let result = execute(cmd, &TransformOptions::default());
        assert_eq!(result.metrics.unwrap().processing_time_ms, None);
    }

    #[test]
    fn test_execute_merge_failure_becomes_message() {
        let broken = InputFile {
            name: "broken.pdf".into(),
            mime: "application/pdf".into(),
            bytes: b"not a pdf at all".to_vec(),
        };
        let cmd = Command::Merge {
            files: vec![pdf_file("a", 1), broken],
        };

        let result = execute(cmd, &TransformOptions::default());

        assert!(!result.success);
        assert!(result.data.is_empty());
        assert!(result.error.unwrap().contains("broken.pdf"));
    }

    #[test]
    fn test_execute_merge_with_encrypted_source_produces_nothing() {
        let locked = InputFile {
            name: "locked.pdf".into(),
            mime: "application/pdf".into(),
            bytes: encrypted(&create_test_pdf(2, "L")),
        };
        let cmd = Command::Merge {
            files: vec![pdf_file("a", 2), locked, pdf_file("b", 1)],
        };

        let result = execute(cmd, &TransformOptions::default());

        assert!(!result.success);
        assert!(result.data.is_empty());
        assert!(result.metrics.is_none());
        let error = result.error.unwrap();
        assert!(error.contains("locked.pdf"));
        assert!(error.contains("password"));
    }

    #[test]
    fn test_execute_split_huge_range_fails_fast() {
        let cmd = Command::from_json(
            r#"{"type":"Split","file":{"name":"a.pdf","mime":"application/pdf","bytes":[]},"ranges":[[1,4294967295]]}"#,
        )
        .unwrap();
        let cmd = match cmd {
            Command::Split { ranges, .. } => Command::Split {
                file: pdf_file("a", 3),
                ranges,
            },
            other => other,
        };

        let result = execute(cmd, &TransformOptions::default());

        assert!(!result.success);
        assert!(result.error.unwrap().contains("out of range"));
    }

    #[test]
    fn test_execute_extract_empty_selection_fails() {
        let cmd = Command::Extract {
            file: pdf_file("a", 3),
            pages: vec![],
        };
        let result = execute(cmd, &TransformOptions::default());
        assert!(!result.success);
    }

    #[test]
    fn test_execute_split() {
        let cmd = Command::Split {
            file: pdf_file("doc", 6),
            ranges: vec![(1, 2), (3, 6)],
        };
        let result = execute(cmd, &TransformOptions::default());
        let counts: Vec<u32> = result.data.iter().map(|d| d.page_count).collect();
        assert_eq!(counts, vec![2, 4]);
    }

    #[test]
    fn test_execute_images_reports_unsupported_files() {
        let cmd = Command::ImagesToPdf {
            images: vec![
                InputFile {
                    name: "clip.gif".into(),
                    mime: "image/gif".into(),
                    bytes: b"GIF89a".to_vec(),
                },
                InputFile {
                    name: "shot.png".into(),
                    mime: "image/png".into(),
                    bytes: png_bytes(8, 8),
                },
            ],
        };

        let result = execute(cmd, &TransformOptions::default());

        assert!(result.success);
        assert_eq!(result.data[0].filename, "shot.pdf");
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].name, "clip.gif");
    }
}
