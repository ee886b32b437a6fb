//! Transform options
//!
//! Every field has a default so callers can pass a partial JSON object
//! (or nothing at all) from the web layer.

use crate::error::{PageSetError, Result};
use serde::{Deserialize, Serialize};

/// Knobs shared by every transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Flate-compress unfiltered streams before saving
    pub compress: bool,
    /// Header version for documents built from scratch (image conversion)
    pub pdf_version: String,
    /// Resolution used to map image pixels to page points (72 = 1px per pt)
    pub image_dpi: f32,
    /// Written to the Info dictionary's /Producer entry when set
    pub producer: Option<String>,
    /// Suggested download name for merge output
    pub merged_filename: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            compress: true,
            pdf_version: "1.7".to_string(),
            image_dpi: 72.0,
            producer: None,
            merged_filename: "merged.pdf".to_string(),
        }
    }
}

impl TransformOptions {
    /// Parse options from JSON, filling in defaults for missing fields
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| PageSetError::Serialization(format!("Invalid options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.image_dpi.is_finite() && self.image_dpi > 0.0) {
            return Err(PageSetError::Serialization(format!(
                "image_dpi must be positive, got {}",
                self.image_dpi
            )));
        }
        if self.merged_filename.trim().is_empty() {
            return Err(PageSetError::Serialization(
                "merged_filename cannot be empty".into(),
            ));
        }
        Ok(())
    }

    /// Points per image pixel at the configured resolution
    pub fn points_per_pixel(&self) -> f32 {
        72.0 / self.image_dpi
    }
}
