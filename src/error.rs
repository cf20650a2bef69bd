use image::ImageError;
use serde_json::Error as JsonError;

use std::error::Error;
use std::fmt;
use std::io::Error as IOError;

#[derive(Debug)]
pub struct LprError(LprErrorKind);

#[derive(Debug)]
pub enum LprErrorKind {
    IOError(IOError),
    /// The input could not be decoded into a raster.
    ImageLoadError(ImageError),
    ImageError(ImageError),
    JsonError(JsonError),
    OcrError(String),
    ConfigError(String),
}

impl LprError {
    pub fn kind(&self) -> &LprErrorKind {
        &self.0
    }

    pub fn load(e: ImageError) -> Self {
        Self(LprErrorKind::ImageLoadError(e))
    }

    pub fn ocr(msg: impl Into<String>) -> Self {
        Self(LprErrorKind::OcrError(msg.into()))
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self(LprErrorKind::ConfigError(msg.into()))
    }

    pub fn is_load_error(&self) -> bool {
        matches!(self.kind(), LprErrorKind::ImageLoadError(_))
    }
}

impl<T> From<T> for LprError
where T: Into<LprErrorKind>
{
    fn from(e: T) -> Self {
        Self(e.into())
    }
}

impl fmt::Display for LprError {

    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            LprErrorKind::IOError(e) => e.fmt(f),
            LprErrorKind::ImageLoadError(e) => e.fmt(f),
            LprErrorKind::ImageError(e) => e.fmt(f),
            LprErrorKind::JsonError(e) => e.fmt(f),
            LprErrorKind::OcrError(msg) => write!(f, "ocr engine: {}", msg),
            LprErrorKind::ConfigError(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl Error for LprError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self.kind() {
            LprErrorKind::IOError(e) => Some(e),
            LprErrorKind::ImageLoadError(e) => Some(e),
            LprErrorKind::ImageError(e) => Some(e),
            LprErrorKind::JsonError(e) => Some(e),
            LprErrorKind::OcrError(_) | LprErrorKind::ConfigError(_) => None,
        }
    }
}

impl From<IOError> for LprErrorKind {
    fn from(e: IOError) -> Self {
        Self::IOError(e)
    }
}

impl From<ImageError> for LprErrorKind {
    fn from(e: ImageError) -> Self {
        Self::ImageError(e)
    }
}

impl From<JsonError> for LprErrorKind {
    fn from(e: JsonError) -> Self {
        Self::JsonError(e)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn load_errors_are_distinguished() {
        let io = IOError::new(std::io::ErrorKind::NotFound, "gone");
        let err = LprError::load(ImageError::IoError(io));
        assert!(err.is_load_error());

        let io = IOError::new(std::io::ErrorKind::Other, "boom");
        let err: LprError = ImageError::IoError(io).into();
        assert!(!err.is_load_error());
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn ocr_error_message() {
        let err = LprError::ocr("tessdata missing");
        assert_eq!(err.to_string(), "ocr engine: tessdata missing");
        assert!(err.source().is_none());
    }
}
