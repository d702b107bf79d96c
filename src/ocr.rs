//! OCR collaborator interface consumed by the document loader.
//!
//! The loader treats OCR as a black box: any `image → text` engine can be
//! injected via [`crate::config::QaConfigBuilder::ocr`]. The bundled
//! implementation ([`TesseractOcr`], feature `tesseract`) wraps the leptess
//! Tesseract bindings; without the feature (and with no injected engine)
//! pages still load, their OCR sections simply stay empty.
//!
//! Recognition is synchronous on purpose — the loader already runs the whole
//! per-page extraction inside `spawn_blocking`, so an async OCR seam would
//! buy nothing.

use image::DynamicImage;
use thiserror::Error;

/// Error from an OCR engine. Per-image failures are logged and skipped by the
/// loader; they never fail a document load.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine initialisation failed: {0}")]
    Init(String),

    #[error("OCR recognition failed: {0}")]
    Recognition(String),

    #[error("Image could not be prepared for OCR: {0}")]
    Image(String),
}

/// An `image → text` engine.
///
/// Implementations must be `Send + Sync`; the loader calls `recognize` once
/// per embedded image, in encounter order, from a blocking task.
pub trait OcrEngine: Send + Sync {
    /// Recognize all text in the image. An empty string is a valid result
    /// (an image with no legible text).
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

#[cfg(feature = "tesseract")]
pub use tesseract::TesseractOcr;

#[cfg(feature = "tesseract")]
mod tesseract {
    use super::{OcrEngine, OcrError};
    use image::DynamicImage;
    use leptess::LepTess;
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Tesseract-backed OCR via leptess.
    ///
    /// `LepTess` holds raw C pointers and is not `Sync`, so the handle lives
    /// behind a `Mutex`. The loader is strictly sequential per session, so
    /// the lock is uncontended in practice.
    pub struct TesseractOcr {
        inner: Mutex<LepTess>,
    }

    impl TesseractOcr {
        /// Initialise the engine for the given language (e.g. `"eng"`),
        /// using the system `tessdata` location.
        pub fn new(lang: &str) -> Result<Self, OcrError> {
            let lt = LepTess::new(None, lang).map_err(|e| OcrError::Init(format!("{e}")))?;
            Ok(Self {
                inner: Mutex::new(lt),
            })
        }
    }

    impl OcrEngine for TesseractOcr {
        fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
            // Hand the image to leptonica as an in-memory PNG; leptess has no
            // raw-pixel-buffer entry point.
            let mut buf = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                .map_err(|e| OcrError::Image(format!("{e}")))?;

            let mut lt = self
                .inner
                .lock()
                .map_err(|_| OcrError::Recognition("OCR engine mutex poisoned".into()))?;
            lt.set_image_from_mem(&buf)
                .map_err(|e| OcrError::Image(format!("{e}")))?;
            lt.get_utf8_text()
                .map_err(|e| OcrError::Recognition(format!("{e}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocr_error_display() {
        let e = OcrError::Recognition("empty page segmentation".into());
        assert!(e.to_string().contains("empty page segmentation"));
    }
}
