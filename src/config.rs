use serde::Deserialize;

use std::fs;
use std::path::Path;

use crate::error::LprError;

/// Characters the OCR engine is allowed to emit.
pub const PLATE_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Tunables of the recognition pipeline.
/// Defaults are the values the pipeline was tuned with on frontal photos.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub bilateral_diameter: u32,
    pub sigma_color: f32,
    pub sigma_space: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// only the largest N contours are approximated
    pub max_candidates: usize,
    /// approximation epsilon as a fraction of the contour perimeter
    pub epsilon_ratio: f64,
    pub threshold_block_size: u32,
    pub threshold_offset: i32,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub lang: String,
    pub data_path: Option<String>,
    /// tesseract page segmentation mode, 7 treats the image as a single text line
    pub page_seg_mode: u32,
    pub whitelist: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bilateral_diameter: 11,
            sigma_color: 17.0,
            sigma_space: 17.0,
            canny_low: 30.0,
            canny_high: 200.0,
            max_candidates: 10,
            epsilon_ratio: 0.02,
            threshold_block_size: 11,
            threshold_offset: 2,
            ocr: OcrConfig::default(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            lang: "eng".to_string(),
            data_path: None,
            page_seg_mode: 7,
            whitelist: PLATE_WHITELIST.to_string(),
        }
    }
}

impl PipelineConfig {

    /// Read a JSON config, missing fields fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LprError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LprError> {
        if self.bilateral_diameter == 0 {
            return Err(LprError::config("bilateral_diameter must be positive"));
        }
        if self.canny_low > self.canny_high {
            return Err(LprError::config("canny_low must not exceed canny_high"));
        }
        if self.max_candidates == 0 {
            return Err(LprError::config("max_candidates must be positive"));
        }
        if !(self.epsilon_ratio > 0.0) {
            return Err(LprError::config("epsilon_ratio must be positive"));
        }
        if self.threshold_block_size < 3 || self.threshold_block_size % 2 == 0 {
            return Err(LprError::config("threshold_block_size must be odd and at least 3"));
        }
        if self.ocr.whitelist.is_empty() {
            return Err(LprError::config("ocr whitelist is empty"));
        }
        Ok(())
    }
}
