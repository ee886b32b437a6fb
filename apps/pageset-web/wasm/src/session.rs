//! Stateful page-set session
//!
//! Holds the user's file list, page selection and options in Rust memory.
//! JavaScript only forwards picker events and downloads the result.

use pageset_core::{
    extract_pages, images_to_document, merge_documents, OrderedFileList, OutputDocument,
    PageInfo, PageSelection, PageSetError, SkippedImage, SourceDocument, SourceKind,
    TransformOptions,
};
use serde::Serialize;
use tracing::{debug, info};
use wasm_bindgen::prelude::*;

type SessionResult<T> = Result<T, PageSetError>;

/// Session mode determines which files are accepted and what `execute` does
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Concatenate two or more PDFs
    Merge,
    /// Keep a subset of one PDF's pages
    Extract,
    /// One page per image
    Images,
}

#[wasm_bindgen]
pub struct PageSetSession {
    mode: SessionMode,
    files: OrderedFileList,
    selection: Option<PageSelection>,
    options: TransformOptions,
    last_filename: Option<String>,
    last_skipped: Vec<SkippedImage>,
    progress_callback: Option<js_sys::Function>,
}

/// Document summary for the file list UI
#[derive(Debug, Serialize)]
struct DocumentSummary {
    name: String,
    mime: &'static str,
    page_count: u32,
    size_bytes: usize,
}

impl DocumentSummary {
    fn of(source: &SourceDocument) -> Self {
        Self {
            name: source.name().to_string(),
            mime: source.kind().mime(),
            page_count: source.page_count(),
            size_bytes: source.bytes().len(),
        }
    }
}

fn to_js_error(error: PageSetError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn to_js_value<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[wasm_bindgen]
impl PageSetSession {
    /// Create a new session in the specified mode
    #[wasm_bindgen(constructor)]
    pub fn new(mode: SessionMode) -> Self {
        Self {
            mode,
            files: OrderedFileList::new(),
            selection: None,
            options: TransformOptions::default(),
            last_filename: None,
            last_skipped: Vec::new(),
            progress_callback: None,
        }
    }

    #[wasm_bindgen(getter)]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Set a progress callback function
    /// Callback signature: (current: number, total: number, message: string) => void
    #[wasm_bindgen(js_name = setProgressCallback)]
    pub fn set_progress_callback(&mut self, callback: js_sys::Function) {
        self.progress_callback = Some(callback);
    }

    /// Replace the transform options with a JS object (missing fields keep defaults)
    #[wasm_bindgen(js_name = setOptions)]
    pub fn set_options(&mut self, options: JsValue) -> Result<(), JsValue> {
        let options: TransformOptions = serde_wasm_bindgen::from_value(options)
            .map_err(|e| JsValue::from_str(&format!("Invalid options: {}", e)))?;
        self.set_options_internal(options).map_err(to_js_error)
    }

    /// Add a file to the session
    /// Returns the document summary on success
    #[wasm_bindgen(js_name = addDocument)]
    pub fn add_document(&mut self, name: &str, mime: &str, bytes: &[u8]) -> Result<JsValue, JsValue> {
        let index = self
            .add_document_internal(name, mime, bytes)
            .map_err(to_js_error)?;
        match self.files.get(index) {
            Some(source) => to_js_value(&DocumentSummary::of(source)),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = removeDocument)]
    pub fn remove_document(&mut self, index: usize) -> Result<(), JsValue> {
        self.remove_document_internal(index).map_err(to_js_error)
    }

    /// Reorder files; new_order lists current indices in the desired order
    #[wasm_bindgen(js_name = reorderDocuments)]
    pub fn reorder_documents(&mut self, new_order: &[usize]) -> Result<(), JsValue> {
        self.reorder_documents_internal(new_order)
            .map_err(to_js_error)
    }

    /// Drag-and-drop style move of a single file
    #[wasm_bindgen(js_name = moveDocument)]
    pub fn move_document(&mut self, from: usize, to: usize) -> Result<(), JsValue> {
        self.move_document_internal(from, to).map_err(to_js_error)
    }

    /// Set page selection for extract mode
    /// Input: "1-3, 5, 8-10" format
    #[wasm_bindgen(js_name = setPageSelection)]
    pub fn set_page_selection(&mut self, range_str: &str) -> Result<(), JsValue> {
        self.set_page_selection_internal(range_str)
            .map_err(to_js_error)
    }

    /// Flip one page between kept and removed; returns true if now kept
    #[wasm_bindgen(js_name = togglePage)]
    pub fn toggle_page(&mut self, page: u32) -> Result<bool, JsValue> {
        self.toggle_page_internal(page).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = selectAll)]
    pub fn select_all(&mut self) {
        if let Some(selection) = self.selection.as_mut() {
            *selection = PageSelection::all(selection.page_count());
        }
    }

    #[wasm_bindgen(js_name = clearSelection)]
    pub fn clear_selection(&mut self) {
        if let Some(selection) = self.selection.as_mut() {
            *selection = PageSelection::none(selection.page_count());
        }
    }

    /// Kept pages in ascending order
    #[wasm_bindgen(js_name = getSelectedPages)]
    pub fn get_selected_pages(&self) -> Vec<u32> {
        self.selection
            .as_ref()
            .map(PageSelection::kept)
            .unwrap_or_default()
    }

    /// Get info for a specific page
    #[wasm_bindgen(js_name = getPageInfo)]
    pub fn get_page_info(&self, doc_index: usize, page_num: u32) -> Result<JsValue, JsValue> {
        let info = self
            .page_info_internal(doc_index, page_num)
            .map_err(to_js_error)?;
        to_js_value(&info)
    }

    #[wasm_bindgen(js_name = getDocumentInfos)]
    pub fn get_document_infos(&self) -> Result<JsValue, JsValue> {
        to_js_value(&self.document_summaries())
    }

    /// Get total page count across all files
    #[wasm_bindgen(js_name = getTotalPageCount)]
    pub fn get_total_page_count(&self) -> u32 {
        self.files.total_pages()
    }

    #[wasm_bindgen(js_name = getDocumentCount)]
    pub fn get_document_count(&self) -> usize {
        self.files.len()
    }

    /// Check if session is ready for execution
    #[wasm_bindgen(js_name = canExecute)]
    pub fn can_execute(&self) -> bool {
        match self.mode {
            SessionMode::Merge => self.files.len() >= 2,
            SessionMode::Extract => {
                self.files.len() == 1 && self.selection.as_ref().is_some_and(|s| !s.is_empty())
            }
            SessionMode::Images => !self.files.is_empty(),
        }
    }

    /// Execute the operation and return the PDF as Uint8Array
    pub fn execute(&mut self) -> Result<js_sys::Uint8Array, JsValue> {
        let output = self.execute_internal().map_err(to_js_error)?;

        let array = js_sys::Uint8Array::new_with_length(output.size_bytes() as u32);
        array.copy_from(output.bytes());
        Ok(array)
    }

    /// Filename for the last result, if any
    #[wasm_bindgen(js_name = suggestedFilename)]
    pub fn suggested_filename(&self) -> Option<String> {
        self.last_filename.clone()
    }

    /// Images left out of the last conversion, with reasons
    #[wasm_bindgen(js_name = getSkipped)]
    pub fn get_skipped(&self) -> Result<JsValue, JsValue> {
        to_js_value(&self.last_skipped)
    }

    /// Drop every file and the selection; options and callback survive
    pub fn reset(&mut self) {
        self.files.clear();
        self.selection = None;
        self.last_filename = None;
        self.last_skipped.clear();
    }
}

impl PageSetSession {
    fn set_options_internal(&mut self, options: TransformOptions) -> SessionResult<()> {
        options.validate()?;
        self.options = options;
        Ok(())
    }

    /// Returns the index the file landed at
    fn add_document_internal(&mut self, name: &str, mime: &str, bytes: &[u8]) -> SessionResult<usize> {
        if self.mode == SessionMode::Extract && !self.files.is_empty() {
            return Err(PageSetError::Operation(
                "Extract mode only allows one document. Remove existing document first."
                    .to_string(),
            ));
        }

        let source = SourceDocument::open(name, mime, bytes.to_vec())?;
        let accepted = match self.mode {
            SessionMode::Merge | SessionMode::Extract => source.kind().is_pdf(),
            SessionMode::Images => matches!(source.kind(), SourceKind::Image(_)),
        };
        if !accepted {
            return Err(PageSetError::UnsupportedFormat {
                name: name.to_string(),
                mime: source.kind().mime().to_string(),
            });
        }

        debug!(name, pages = source.page_count(), "document added");
        if self.mode == SessionMode::Extract {
            self.selection = Some(PageSelection::all(source.page_count()));
        }
        self.files.push(source);
        Ok(self.files.len() - 1)
    }

    fn remove_document_internal(&mut self, index: usize) -> SessionResult<()> {
        self.files.remove(index)?;
        if self.files.is_empty() {
            self.selection = None;
        }
        Ok(())
    }

    fn reorder_documents_internal(&mut self, new_order: &[usize]) -> SessionResult<()> {
        self.ensure_ordered_mode("Reorder")?;
        self.files.reorder(new_order)
    }

    fn move_document_internal(&mut self, from: usize, to: usize) -> SessionResult<()> {
        self.ensure_ordered_mode("Move")?;
        self.files.move_item(from, to)
    }

    fn ensure_ordered_mode(&self, action: &str) -> SessionResult<()> {
        if self.mode == SessionMode::Extract {
            return Err(PageSetError::Operation(format!(
                "{} is not available in extract mode",
                action
            )));
        }
        Ok(())
    }

    fn selection_mut(&mut self) -> SessionResult<&mut PageSelection> {
        if self.mode != SessionMode::Extract {
            return Err(PageSetError::Operation(
                "Page selection only available in extract mode".to_string(),
            ));
        }
        self.selection
            .as_mut()
            .ok_or_else(|| PageSetError::Operation("No document loaded".to_string()))
    }

    fn set_page_selection_internal(&mut self, range_str: &str) -> SessionResult<()> {
        let selection = self.selection_mut()?;
        *selection = PageSelection::from_ranges(selection.page_count(), range_str)?;
        Ok(())
    }

    fn toggle_page_internal(&mut self, page: u32) -> SessionResult<bool> {
        self.selection_mut()?.toggle(page)
    }

    fn page_info_internal(&self, doc_index: usize, page_num: u32) -> SessionResult<PageInfo> {
        let source = self
            .files
            .get(doc_index)
            .ok_or_else(|| PageSetError::Operation("Document index out of bounds".to_string()))?;
        source.page_info(page_num).cloned()
    }

    fn document_summaries(&self) -> Vec<DocumentSummary> {
        self.files.iter().map(DocumentSummary::of).collect()
    }

    fn execute_internal(&mut self) -> SessionResult<OutputDocument> {
        self.last_filename = None;
        self.last_skipped.clear();

        if !self.can_execute() {
            return Err(PageSetError::EmptySelection(
                "Session not ready for execution".to_string(),
            ));
        }

        self.report_progress(0, 100, "Starting...");

        let output = match self.mode {
            SessionMode::Merge => {
                self.report_progress(10, 100, "Merging...");
                merge_documents(self.files.as_slice(), &self.options)?
            }
            SessionMode::Extract => {
                self.report_progress(10, 100, "Extracting pages...");
                let selection = self
                    .selection
                    .as_ref()
                    .ok_or_else(|| PageSetError::EmptySelection("No pages selected".to_string()))?;
                let source = self
                    .files
                    .get(0)
                    .ok_or_else(|| PageSetError::Operation("No document loaded".to_string()))?;
                extract_pages(source, selection, &self.options)?
            }
            SessionMode::Images => {
                self.report_progress(10, 100, "Converting images...");
                let batch = images_to_document(self.files.as_slice(), &self.options)?;
                self.last_skipped = batch.skipped;
                batch.output
            }
        };

        self.report_progress(100, 100, "Complete");
        info!(
            filename = output.filename(),
            pages = output.page_count(),
            bytes = output.size_bytes(),
            "session output ready"
        );
        self.last_filename = Some(output.filename().to_string());
        Ok(output)
    }

    /// Report progress to JavaScript callback
    fn report_progress(&self, current: u32, total: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            let this = JsValue::null();
            let _ = callback.call3(
                &this,
                &JsValue::from(current),
                &JsValue::from(total),
                &JsValue::from_str(message),
            );
        }
    }
}
