//! License plate reading from a single still image.
//!
//! The pipeline turns a photo into a [`PlateRecord`]:
//! grayscale + edge map, greedy quadrilateral search over the largest contours,
//! masked crop of the candidate, adaptive binarization, OCR, and finally
//! validation against the legacy (`ABC1234`) and Mercosul (`ABC1D23`) plate
//! grammars with repair of letters misread as digits.

use image::DynamicImage;
use log::{ info, warn };

use std::path::Path;

use error::LprError;
use ocr::Recognition;

pub mod cli;
pub mod config;
pub mod error;
pub mod image_process;
pub mod locate;
pub mod ocr;
pub mod record;
pub mod utils;
pub mod validate;

pub use config::{ OcrConfig, PipelineConfig };
pub use image_process::{ ImageprocVision, Vision };
pub use ocr::{ OcrOutput, TextEngine };
pub use record::PlateRecord;
pub use validate::{ PlateFormat, Validation };

/// The recognition pipeline. Holds no state between runs besides its
/// collaborators, every call works on its own rasters.
pub struct Lpr<E, V = ImageprocVision> {
    config: PipelineConfig,
    vision: V,
    engine: E,
}

impl<E: TextEngine> Lpr<E, ImageprocVision> {
    pub fn new(engine: E, config: PipelineConfig) -> Result<Self, LprError> {
        Self::with_vision(engine, ImageprocVision, config)
    }
}

impl<E: TextEngine, V: Vision> Lpr<E, V> {

    pub fn with_vision(engine: E, vision: V, config: PipelineConfig) -> Result<Self, LprError> {
        config.validate()?;
        Ok(Lpr { config, vision, engine })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load and recognize one image file. Never fails: every error becomes
    /// a failure record.
    pub fn recognize_path(&mut self, path: impl AsRef<Path>) -> PlateRecord {
        let path = path.as_ref();
        let res = image_process::load_image(path)
            .and_then(|img| self.recognize(&img));
        match res {
            Ok(record) => record,
            Err(e) if e.is_load_error() => {
                warn!("could not load {}: {}", path.display(), e);
                PlateRecord::failure(record::MSG_LOAD_FAILED)
            }
            Err(e) => {
                warn!("recognition of {} failed: {}", path.display(), e);
                PlateRecord::unexpected(e)
            }
        }
    }

    /// Recognize one decoded image.
    pub fn recognize(&mut self, img: &DynamicImage) -> Result<PlateRecord, LprError> {
        let pre = image_process::preprocess(&self.vision, img, &self.config);

        let region = locate::find_plate(&pre.edges, &self.config)
            .and_then(|quad| image_process::extract_region(&img.to_rgb8(), &quad));
        let recognition = match region {
            Some(plate) => ocr::recognize(&mut self.engine, &DynamicImage::ImageRgb8(plate), &self.config)?,
            None => {
                info!("no plate region found, reading the whole frame");
                ocr::recognize(&mut self.engine, &DynamicImage::ImageLuma8(pre.gray), &self.config)?
            }
        };

        Ok(judge(recognition))
    }
}

/// Turn an OCR reading into the final record. A rejected reading always
/// carries its raw text, empty when there was nothing to read.
fn judge(recognition: Recognition) -> PlateRecord {
    let text = recognition.text.unwrap_or_default();
    match validate::validate(&text) {
        Validation::Valid { plate, format, corrected } => {
            info!("{} plate {} (corrected: {})", format, plate, corrected);
            PlateRecord::success(plate, recognition.confidence)
        }
        Validation::Invalid => {
            info!("rejected ocr text {:?}", text);
            PlateRecord::not_recognized(text, recognition.confidence)
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;

    use image::{ GrayImage, Luma, Rgb, RgbImage };
    use imageproc::{ drawing, rect::Rect };
    use serde_json::json;

    use std::cell::RefCell;
    use std::error::Error;
    use std::fs;

    /// Engine returning a canned answer and remembering the sizes it was shown.
    struct ScriptedEngine {
        reply: Result<OcrOutput, String>,
        seen: Vec<(u32, u32)>,
    }

    impl ScriptedEngine {
        fn reading(text: &str, confidences: &[f32]) -> Self {
            let reply = Ok(OcrOutput { text: text.to_string(), confidences: confidences.to_vec() });
            Self { reply, seen: Vec::new() }
        }

        fn broken(msg: &str) -> Self {
            Self { reply: Err(msg.to_string()), seen: Vec::new() }
        }
    }

    impl TextEngine for ScriptedEngine {
        fn recognize_text(&mut self, image: &GrayImage, _config: &OcrConfig) -> Result<OcrOutput, LprError> {
            self.seen.push(image.dimensions());
            self.reply.clone().map_err(LprError::ocr)
        }
    }

    /// Vision stub that reports a fixed edge map.
    struct FixedEdges(GrayImage);

    impl Vision for FixedEdges {
        fn smooth(&self, gray: &GrayImage, _: u32, _: f32, _: f32) -> GrayImage {
            gray.clone()
        }

        fn detect_edges(&self, _gray: &GrayImage, _: f32, _: f32) -> GrayImage {
            self.0.clone()
        }
    }

    /// Vision stub that remembers the parameters of every call.
    #[derive(Default)]
    struct RecordingVision {
        smoothed: RefCell<Vec<(u32, f32, f32)>>,
        edged: RefCell<Vec<(f32, f32)>>,
    }

    impl Vision for RecordingVision {
        fn smooth(&self, gray: &GrayImage, diameter: u32, sigma_color: f32, sigma_space: f32) -> GrayImage {
            self.smoothed.borrow_mut().push((diameter, sigma_color, sigma_space));
            gray.clone()
        }

        fn detect_edges(&self, gray: &GrayImage, low: f32, high: f32) -> GrayImage {
            self.edged.borrow_mut().push((low, high));
            GrayImage::new(gray.width(), gray.height())
        }
    }

    fn car_photo() -> DynamicImage {
        let mut img = RgbImage::from_pixel(160, 120, Rgb([90, 90, 90]));
        drawing::draw_filled_rect_mut(&mut img, Rect::at(40, 70).of_size(80, 26), Rgb([235, 235, 235]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn valid_reading_is_a_success() -> Result<(), Box<dyn Error>> {
        let engine = ScriptedEngine::reading("ABC 1D23\n", &[-1.0, 91.0, 89.0]);
        let mut lpr = Lpr::new(engine, PipelineConfig::default())?;
        let record = lpr.recognize(&car_photo())?;
        assert_eq!(record, PlateRecord::success("ABC1D23", 90.0));
        assert_eq!(lpr.engine.seen.len(), 1);
        Ok(())
    }

    #[test]
    fn misread_digit_is_repaired() -> Result<(), Box<dyn Error>> {
        let engine = ScriptedEngine::reading("ABC12O4", &[75.0]);
        let mut lpr = Lpr::new(engine, PipelineConfig::default())?;
        assert_eq!(lpr.recognize(&car_photo())?, PlateRecord::success("ABC1204", 75.0));
        Ok(())
    }

    #[test]
    fn empty_reading_keeps_raw_text() -> Result<(), Box<dyn Error>> {
        let engine = ScriptedEngine::reading("", &[-1.0]);
        let mut lpr = Lpr::new(engine, PipelineConfig::default())?;
        let record = lpr.recognize(&car_photo())?;
        assert_eq!(serde_json::to_value(&record)?, json!({
            "success": false,
            "message": crate::record::MSG_NOT_RECOGNIZED,
            "rawText": "",
            "confidence": 0.0,
        }));
        Ok(())
    }

    #[test]
    fn whole_frame_is_read_without_a_candidate() -> Result<(), Box<dyn Error>> {
        let engine = ScriptedEngine::reading("ABC1234", &[60.0]);
        let vision = FixedEdges(GrayImage::new(160, 120));
        let mut lpr = Lpr::with_vision(engine, vision, PipelineConfig::default())?;
        lpr.recognize(&car_photo())?;
        assert_eq!(lpr.engine.seen, vec![(160, 120)]);
        Ok(())
    }

    #[test]
    fn candidate_region_is_cropped_before_reading() -> Result<(), Box<dyn Error>> {
        let mut edges = GrayImage::new(160, 120);
        drawing::draw_hollow_rect_mut(&mut edges, Rect::at(40, 70).of_size(80, 26), Luma([255]));
        let engine = ScriptedEngine::reading("ABC1234", &[60.0]);
        let mut lpr = Lpr::with_vision(engine, FixedEdges(edges), PipelineConfig::default())?;
        lpr.recognize(&car_photo())?;
        let (w, h) = lpr.engine.seen[0];
        assert!((w as i32 - 80).abs() <= 2 && (h as i32 - 26).abs() <= 2, "read a {}x{} region", w, h);
        Ok(())
    }

    #[test]
    fn engine_errors_are_reported() -> Result<(), Box<dyn Error>> {
        let dir = std::env::temp_dir().join(format!("plate-recognition-engine-{}", std::process::id()));
        fs::create_dir_all(&dir)?;
        let path = dir.join("car.png");
        car_photo().save(&path)?;

        let mut lpr = Lpr::new(ScriptedEngine::broken("no tessdata"), PipelineConfig::default())?;
        let record = lpr.recognize_path(&path);
        fs::remove_dir_all(&dir)?;
        assert_eq!(record, PlateRecord::failure("Erro ao processar imagem: ocr engine: no tessdata"));
        Ok(())
    }

    #[test]
    fn undecodable_file_is_a_load_failure() -> Result<(), Box<dyn Error>> {
        let dir = std::env::temp_dir().join(format!("plate-recognition-load-{}", std::process::id()));
        fs::create_dir_all(&dir)?;
        let path = dir.join("not-an-image.png");
        fs::write(&path, b"definitely not a png")?;

        let mut lpr = Lpr::new(ScriptedEngine::reading("ABC1234", &[]), PipelineConfig::default())?;
        let record = lpr.recognize_path(&path);
        fs::remove_dir_all(&dir)?;
        assert_eq!(record, PlateRecord::failure(crate::record::MSG_LOAD_FAILED));
        assert!(lpr.engine.seen.is_empty());
        Ok(())
    }

    #[test]
    fn filter_parameters_reach_vision() -> Result<(), Box<dyn Error>> {
        let engine = ScriptedEngine::reading("ABC1234", &[60.0]);
        let mut lpr = Lpr::with_vision(engine, RecordingVision::default(), PipelineConfig::default())?;
        lpr.recognize(&car_photo())?;
        assert_eq!(*lpr.vision.smoothed.borrow(), vec![(11, 17.0, 17.0)]);
        assert_eq!(*lpr.vision.edged.borrow(), vec![(30.0, 200.0)]);

        let config = PipelineConfig { bilateral_diameter: 9, canny_low: 50.0, canny_high: 150.0, ..PipelineConfig::default() };
        let mut lpr = Lpr::with_vision(ScriptedEngine::reading("", &[]), RecordingVision::default(), config)?;
        lpr.recognize(&car_photo())?;
        assert_eq!(lpr.vision.smoothed.borrow()[0].0, 9);
        assert_eq!(*lpr.vision.edged.borrow(), vec![(50.0, 150.0)]);
        Ok(())
    }

    #[test]
    fn file_without_extension_is_decoded() -> Result<(), Box<dyn Error>> {
        let dir = std::env::temp_dir().join(format!("plate-recognition-media-{}", std::process::id()));
        fs::create_dir_all(&dir)?;
        let path = dir.join("media_000123");
        car_photo().save_with_format(&path, image::ImageFormat::Jpeg)?;

        let mut lpr = Lpr::new(ScriptedEngine::reading("ABC1234", &[80.0]), PipelineConfig::default())?;
        let record = lpr.recognize_path(&path);
        fs::remove_dir_all(&dir)?;
        assert_eq!(record, PlateRecord::success("ABC1234", 80.0));
        Ok(())
    }

    #[test]
    fn nothing_read_still_reports_raw_text() -> Result<(), Box<dyn Error>> {
        let record = judge(Recognition::nothing());
        assert_eq!(serde_json::to_value(&record)?, json!({
            "success": false,
            "message": crate::record::MSG_NOT_RECOGNIZED,
            "rawText": "",
            "confidence": 0.0,
        }));
        Ok(())
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PipelineConfig { max_candidates: 0, ..PipelineConfig::default() };
        assert!(Lpr::new(ScriptedEngine::reading("", &[]), config).is_err());
    }
}
