//! WASM bindings for the page-set tools
//!
//! Stateful, session-based API over `pageset-core`. All state is held in
//! Rust; JavaScript handles DOM events, file I/O and object-URL cleanup.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { PageSetSession, SessionMode, filterAccepted } from './pkg/pageset_wasm.js';
//!
//! await init();
//! initLogging("info");
//!
//! // Merge mode
//! const files = [...input.files];
//! const keep = filterAccepted(input.accept, files.map(f => f.type));
//! const session = new PageSetSession(SessionMode.Merge);
//! for (const i of keep) {
//!   const f = files[i];
//!   session.addDocument(f.name, f.type, new Uint8Array(await f.arrayBuffer()));
//! }
//! session.moveDocument(1, 0);
//! const result = session.execute();
//! downloadBlob(result, session.suggestedFilename());
//!
//! // Extract mode
//! const extract = new PageSetSession(SessionMode.Extract);
//! extract.addDocument("file.pdf", "application/pdf", bytes);
//! extract.setPageSelection("2, 4, 6");
//! downloadBlob(extract.execute(), extract.suggestedFilename());
//!
//! // One-shot, no session
//! const { success, data, metrics } = executeCommand(JSON.stringify(command));
//! ```

pub mod logging;
pub mod session;

use pageset_core::{AcceptList, Command, PageSetError, ProcessResult, TransformOptions};
use wasm_bindgen::prelude::*;

pub use session::{PageSetSession, SessionMode};

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Route `tracing` output to the browser console ("info" when unset)
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: Option<String>) {
    let level = level
        .as_deref()
        .map(logging::parse_level)
        .unwrap_or(tracing::Level::INFO);
    logging::init_logging(level);
}

/// Get the library version
#[wasm_bindgen(js_name = getVersion)]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Quick validation check for a PDF file
/// Returns Ok(()) if valid, Err with message if not
#[wasm_bindgen(js_name = quickValidate)]
pub fn quick_validate(bytes: &[u8]) -> Result<(), JsValue> {
    pageset_core::quick_validate(bytes).map_err(|e| JsValue::from_str(&e))
}

/// Get detailed PDF info without creating a session
#[wasm_bindgen(js_name = getPdfInfo)]
pub fn get_pdf_info(name: &str, bytes: &[u8]) -> Result<JsValue, JsValue> {
    let info =
        pageset_core::inspect(name, bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&info)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Get page count from PDF bytes (convenience function)
#[wasm_bindgen(js_name = getPageCount)]
pub fn get_page_count(bytes: &[u8]) -> Result<u32, JsValue> {
    pageset_core::get_page_count(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Indices of the files whose MIME type passes the picker's `accept` list.
/// Rejected files are dropped without an error.
#[wasm_bindgen(js_name = filterAccepted)]
pub fn filter_accepted(accept: &str, mimes: Vec<String>) -> Vec<u32> {
    accepted_indices(&AcceptList::parse(accept), &mimes)
}

fn accepted_indices(accept: &AcceptList, mimes: &[String]) -> Vec<u32> {
    accept
        .filter(mimes.iter().enumerate(), |(_, mime)| mime.as_str())
        .into_iter()
        .map(|(index, _)| index as u32)
        .collect()
}

/// Run one JSON command without a session.
///
/// `options_json` may be omitted for defaults. Transform failures come back
/// as `{ success: false, error }`; only malformed JSON is thrown.
#[wasm_bindgen(js_name = executeCommand)]
pub fn execute_command(command_json: &str, options_json: Option<String>) -> Result<JsValue, JsValue> {
    let result = run_command(command_json, options_json.as_deref(), js_sys::Date::now)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&result)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn run_command(
    command_json: &str,
    options_json: Option<&str>,
    now_ms: impl Fn() -> f64,
) -> Result<ProcessResult, PageSetError> {
    let options = match options_json {
        Some(json) if !json.trim().is_empty() => TransformOptions::from_json(json)?,
        _ => TransformOptions::default(),
    };
    let command = Command::from_json(command_json)?;
    Ok(pageset_core::execute_timed(command, &options, now_ms))
}

/// Format bytes as human-readable string
#[wasm_bindgen(js_name = formatBytes)]
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}
