use std::path::{Path, PathBuf};

use log::debug;

use crate::utils::{ExtractionError, Result};

/// Image-to-text engine used for both card sides.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image_path: &Path) -> Result<String>;
}

/// Reads text produced ahead of time by an external OCR run, stored beside
/// the image as `front.jpg.txt` or `front.txt`.
pub struct SidecarTextRecognizer;

impl SidecarTextRecognizer {
    pub fn sidecar_candidates(image_path: &Path) -> Vec<PathBuf> {
        let mut appended = image_path.as_os_str().to_owned();
        appended.push(".txt");
        vec![PathBuf::from(appended), image_path.with_extension("txt")]
    }
}

impl TextRecognizer for SidecarTextRecognizer {
    fn recognize(&self, image_path: &Path) -> Result<String> {
        for candidate in Self::sidecar_candidates(image_path) {
            if candidate.is_file() {
                debug!("Reading recognized text from {}", candidate.display());
                return Ok(std::fs::read_to_string(&candidate)?);
            }
        }
        Err(ExtractionError::Recognition(format!(
            "No recognized text found beside {}",
            image_path.display()
        )))
    }
}

#[cfg(feature = "tesseract")]
pub use self::engine::TesseractRecognizer;

#[cfg(feature = "tesseract")]
mod engine {
    use std::path::Path;

    use image::ImageFormat;
    use log::debug;
    use tesseract::Tesseract;

    use super::TextRecognizer;
    use crate::processing::image_processor::ImageProcessor;
    use crate::utils::{ExtractionError, Result};

    /// Runs Tesseract on a normalized PNG copy of the image.
    pub struct TesseractRecognizer {
        language: String,
    }

    impl TesseractRecognizer {
        pub fn new(language: impl Into<String>) -> Self {
            TesseractRecognizer {
                language: language.into(),
            }
        }
    }

    impl TextRecognizer for TesseractRecognizer {
        fn recognize(&self, image_path: &Path) -> Result<String> {
            let image = ImageProcessor::load(image_path)?;

            let temp_file = tempfile::Builder::new()
                .suffix(".png")
                .tempfile()
                .map_err(|e| {
                    ExtractionError::Recognition(format!("Failed to create temp file: {}", e))
                })?;
            image
                .save_with_format(temp_file.path(), ImageFormat::Png)
                .map_err(|e| {
                    ExtractionError::Recognition(format!("Failed to write temp image: {}", e))
                })?;
            let path_str = temp_file.path().to_str().ok_or_else(|| {
                ExtractionError::Recognition("Failed to convert path to string".to_string())
            })?;

            let text = Tesseract::new(None, Some(self.language.as_str()))
                .map_err(|e| {
                    ExtractionError::Recognition(format!("Tesseract init error: {}", e))
                })?
                .set_image(path_str)
                .map_err(|e| {
                    ExtractionError::Recognition(format!("Tesseract set image error: {}", e))
                })?
                .get_text()
                .map_err(|e| ExtractionError::Recognition(format!("Tesseract error: {}", e)))?;

            debug!("Tesseract returned {} characters", text.len());
            Ok(text)
        }
    }
}
