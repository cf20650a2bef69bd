//! Raster stages of the pipeline: grayscale + edge map, plate cropping and
//! binarization before OCR. None of these stages mutate their input.

use image::{ DynamicImage, GrayImage, ImageBuffer, ImageError, ImageReader, Luma, Rgb, RgbImage, imageops };
use imageproc::{ drawing, edges, filter };
use log::debug;

use std::path::Path;

use crate::config::PipelineConfig;
use crate::error::LprError;
use crate::locate::Quad;
use crate::utils;

/// Vision primitives the pipeline consumes but does not implement itself.
pub trait Vision {
    /// Edge preserving smoothing, `diameter` is the full filter window.
    fn smooth(&self, gray: &GrayImage, diameter: u32, sigma_color: f32, sigma_space: f32) -> GrayImage;

    /// Binary edge map, edge pixels are 255.
    fn detect_edges(&self, gray: &GrayImage, low: f32, high: f32) -> GrayImage;
}

/// `Vision` backed by imageproc's bilateral filter and canny detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageprocVision;

impl Vision for ImageprocVision {
    fn smooth(&self, gray: &GrayImage, diameter: u32, sigma_color: f32, sigma_space: f32) -> GrayImage {
        filter::bilateral_filter(gray, diameter, sigma_color, sigma_space)
    }

    fn detect_edges(&self, gray: &GrayImage, low: f32, high: f32) -> GrayImage {
        edges::canny(gray, low, high)
    }
}

/// Decode an image file. The format is sniffed from the content, so files
/// without an extension or with a misleading one still load.
pub fn load_image(path: &Path) -> Result<DynamicImage, LprError> {
    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| LprError::load(ImageError::IoError(e)))?;
    reader.decode().map_err(LprError::load)
}

pub struct Preprocessed {
    pub gray: GrayImage,
    pub edges: GrayImage,
}

pub fn preprocess<V: Vision + ?Sized>(vision: &V, img: &DynamicImage, config: &PipelineConfig) -> Preprocessed {
    let gray = img.to_luma8();
    let smoothed = vision.smooth(&gray, config.bilateral_diameter, config.sigma_color, config.sigma_space);
    let edges = vision.detect_edges(&smoothed, config.canny_low, config.canny_high);
    debug!("edge map {}x{}", edges.width(), edges.height());
    Preprocessed { gray, edges }
}

/// Cut the plate polygon out of `img`.
/// Pixels inside the bounding box but outside the polygon are zeroed.
/// Returns None when the polygon leaves no pixels to crop.
pub fn extract_region(img: &RgbImage, quad: &Quad) -> Option<RgbImage> {
    let (width, height) = img.dimensions();
    let points = quad.points();
    if points[0] == points[3] {
        return None;
    }
    let rect = utils::bounding_rect(points, width, height)?;

    let mut mask = GrayImage::new(width, height);
    drawing::draw_polygon_mut(&mut mask, points, Luma([255u8]));
    let masked: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
        if mask.get_pixel(x, y)[0] > 0 {
            *img.get_pixel(x, y)
        } else {
            Rgb([0, 0, 0])
        }
    });

    let roi = imageops::crop_imm(&masked, rect.left() as u32, rect.top() as u32, rect.width(), rect.height()).to_image();
    debug!("plate region {}x{} at ({}, {})", roi.width(), roi.height(), rect.left(), rect.top());
    Some(roi)
}

/// Gaussian weights for a `size` tap window, with the sigma derived from the size.
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f32;
    let raw: Vec<f32> = (0..size).map(|i| {
        let d = i as f32 - center;
        (-(d * d) / (2.0 * sigma * sigma)).exp()
    }).collect();
    let sum: f32 = raw.iter().sum();
    raw.into_iter().map(|w| w / sum).collect()
}

/// Adaptive binary threshold: a pixel turns white when it is brighter than its
/// gaussian weighted neighbourhood minus `offset`, black otherwise.
pub fn binarize(gray: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let kernel = gaussian_kernel(block_size);
    let local: GrayImage = filter::separable_filter_equal(gray, &kernel);
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let threshold = local.get_pixel(x, y)[0] as i32 - offset;
        if gray.get_pixel(x, y)[0] as i32 > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}
