//! Text recognition on a plate raster.

use image::{ DynamicImage, GenericImageView, GrayImage };
use log::{ debug, info };

use crate::config::{ OcrConfig, PipelineConfig };
use crate::error::LprError;
use crate::image_process;

#[cfg(feature = "tesseract")]
pub use self::tesseract::TesseractEngine;

/// Confidence reported for tokens the engine could not score.
pub const NO_CONFIDENCE: f32 = -1.0;

/// Raw engine output: the text and one confidence per token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrOutput {
    pub text: String,
    pub confidences: Vec<f32>,
}

/// An OCR engine. Implementations receive an already binarized image.
pub trait TextEngine {
    fn recognize_text(&mut self, image: &GrayImage, config: &OcrConfig) -> Result<OcrOutput, LprError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    /// None when there was no image to read from
    pub text: Option<String>,
    pub confidence: f32,
}

impl Recognition {
    pub fn nothing() -> Self {
        Self { text: None, confidence: 0.0 }
    }
}

/// Mean of the scored tokens, 0 when none was scored.
pub fn mean_confidence(confidences: &[f32]) -> f32 {
    let (sum, count) = confidences.iter()
        .filter(|c| **c != NO_CONFIDENCE)
        .fold((0.0f32, 0usize), |(sum, count), c| (sum + c, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

pub fn clean_text(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Per-token confidences out of tesseract's TSV dump (11th column).
/// Lines without a numeric confidence, such as the header, are skipped.
pub fn parse_tsv_confidences(tsv: &str) -> Vec<f32> {
    tsv.lines()
        .filter_map(|line| line.split('\t').nth(10))
        .filter_map(|conf| conf.trim().parse::<f32>().ok())
        .collect()
}

/// Binarize `img` and read it. An empty image yields no text at all.
pub fn recognize<E: TextEngine + ?Sized>(engine: &mut E, img: &DynamicImage, config: &PipelineConfig) -> Result<Recognition, LprError> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        debug!("nothing to recognize, image is empty");
        return Ok(Recognition::nothing());
    }
    let gray = img.to_luma8();
    let binary = image_process::binarize(&gray, config.threshold_block_size, config.threshold_offset);
    let output = engine.recognize_text(&binary, &config.ocr)?;

    let text = clean_text(&output.text);
    let confidence = mean_confidence(&output.confidences);
    info!("ocr read {:?} on {}x{} with confidence {:.2}", text, width, height, confidence);
    Ok(Recognition { text: Some(text), confidence })
}

#[cfg(feature = "tesseract")]
mod tesseract {
    use image::{ GrayImage, ImageFormat };
    use leptess::{ LepTess, Variable };

    use std::io::Cursor;

    use super::{ parse_tsv_confidences, OcrOutput, TextEngine };
    use crate::config::OcrConfig;
    use crate::error::LprError;

    /// Tesseract through leptess, using the default engine mode.
    pub struct TesseractEngine {
        api: LepTess,
    }

    impl TesseractEngine {
        pub fn new(config: &OcrConfig) -> Result<Self, LprError> {
            let api = LepTess::new(config.data_path.as_deref(), &config.lang)
                .map_err(|e| LprError::ocr(format!("failed to initialize tesseract: {}", e)))?;
            Ok(Self { api })
        }
    }

    impl TextEngine for TesseractEngine {
        fn recognize_text(&mut self, image: &GrayImage, config: &OcrConfig) -> Result<OcrOutput, LprError> {
            self.api.set_variable(Variable::TesseditCharWhitelist, &config.whitelist)
                .map_err(|e| LprError::ocr(format!("failed to set whitelist: {}", e)))?;
            self.api.set_variable(Variable::TesseditPagesegMode, &config.page_seg_mode.to_string())
                .map_err(|e| LprError::ocr(format!("failed to set page segmentation mode: {}", e)))?;

            // leptess only reads encoded images
            let mut png = Vec::new();
            image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
            self.api.set_image_from_mem(&png)
                .map_err(|e| LprError::ocr(format!("failed to load image: {}", e)))?;

            let text = self.api.get_utf8_text()
                .map_err(|e| LprError::ocr(format!("failed to read text: {}", e)))?;
            let tsv = self.api.get_tsv_text(0)
                .map_err(|e| LprError::ocr(format!("failed to read token data: {}", e)))?;
            Ok(OcrOutput { text, confidences: parse_tsv_confidences(&tsv) })
        }
    }
}
