use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use log::{debug, warn};

use crate::config::FaceSettings;
use crate::utils::Result;

/// Axis-aligned face rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceBox {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Crops the holder's photo out of the front side.
pub trait FaceCropper: Send + Sync {
    fn crop_largest_face(&self, image: &DynamicImage) -> Result<Option<DynamicImage>>;
}

/// Finds face rectangles on a greyscale image.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, gray: &GrayImage) -> Vec<FaceBox>;
}

/// Never finds a face.
pub struct NoFaceCropper;

impl FaceCropper for NoFaceCropper {
    fn crop_largest_face(&self, _image: &DynamicImage) -> Result<Option<DynamicImage>> {
        Ok(None)
    }
}

/// Runs a detector on a downscaled copy, maps the largest box back to the
/// original resolution, adds a margin and crops.
pub struct DetectorFaceCropper<D: FaceDetector> {
    detector: D,
    settings: FaceSettings,
}

impl<D: FaceDetector> DetectorFaceCropper<D> {
    pub fn new(detector: D, settings: FaceSettings) -> Self {
        DetectorFaceCropper { detector, settings }
    }
}

impl<D: FaceDetector> FaceCropper for DetectorFaceCropper<D> {
    fn crop_largest_face(&self, image: &DynamicImage) -> Result<Option<DynamicImage>> {
        let (width, height) = (image.width(), image.height());
        let scale = if width > self.settings.resize_width && self.settings.resize_width > 0 {
            self.settings.resize_width as f32 / width as f32
        } else {
            1.0
        };

        let small = if scale < 1.0 {
            let w = ((width as f32) * scale).max(1.0) as u32;
            let h = ((height as f32) * scale).max(1.0) as u32;
            image.resize_exact(w, h, FilterType::Triangle)
        } else {
            image.clone()
        };

        let Some(face) = largest_face(&self.detector.detect(&small.to_luma8())) else {
            debug!("No face detected");
            return Ok(None);
        };

        let face = if scale < 1.0 {
            let inv = 1.0 / scale;
            FaceBox {
                x: (face.x as f32 * inv) as u32,
                y: (face.y as f32 * inv) as u32,
                width: (face.width as f32 * inv) as u32,
                height: (face.height as f32 * inv) as u32,
            }
        } else {
            face
        };

        let crop = expand_face_box(face, self.settings.margin_ratio, width, height);
        if crop.width == 0 || crop.height == 0 {
            return Ok(None);
        }
        Ok(Some(image.crop_imm(crop.x, crop.y, crop.width, crop.height)))
    }
}

#[cfg(feature = "face-detection")]
mod seeta {
    use std::io::Cursor;
    use std::path::Path;

    use image::GrayImage;
    use log::{debug, warn};
    use rustface::ImageData;

    use super::{FaceBox, FaceDetector};
    use crate::utils::{ExtractionError, Result};

    /// SeetaFace frontal cascade via `rustface`. Detection mutates the
    /// detector, so each call parses the model bytes into a fresh one.
    pub struct SeetaFaceDetector {
        model: Vec<u8>,
        min_face_size: u32,
    }

    impl SeetaFaceDetector {
        pub fn from_file(path: &Path, min_face_size: u32) -> Result<Self> {
            let model = std::fs::read(path).map_err(|e| {
                ExtractionError::Config(format!(
                    "Failed to read face model {}: {}",
                    path.display(),
                    e
                ))
            })?;
            rustface::read_model(Cursor::new(&model)).map_err(|e| {
                ExtractionError::Config(format!("Invalid face model {}: {}", path.display(), e))
            })?;
            Ok(SeetaFaceDetector {
                model,
                min_face_size,
            })
        }
    }

    impl FaceDetector for SeetaFaceDetector {
        fn detect(&self, gray: &GrayImage) -> Vec<FaceBox> {
            let model = match rustface::read_model(Cursor::new(&self.model)) {
                Ok(model) => model,
                Err(e) => {
                    warn!("Face model could not be parsed: {}", e);
                    return Vec::new();
                }
            };
            let mut detector = rustface::create_detector_with_model(model);
            detector.set_min_face_size(self.min_face_size.max(20));
            detector.set_score_thresh(2.0);
            detector.set_pyramid_scale_factor(0.8);
            detector.set_slide_window_step(4, 4);

            let (width, height) = gray.dimensions();
            let faces = detector.detect(&ImageData::new(gray.as_raw(), width, height));
            debug!("SeetaFace found {} faces", faces.len());

            faces
                .iter()
                .map(|face| {
                    let bbox = face.bbox();
                    FaceBox {
                        x: bbox.x().max(0) as u32,
                        y: bbox.y().max(0) as u32,
                        width: bbox.width(),
                        height: bbox.height(),
                    }
                })
                .collect()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_missing_model_is_config_error() {
            let result = SeetaFaceDetector::from_file(Path::new("no/such/model.bin"), 30);
            assert!(matches!(result, Err(ExtractionError::Config(_))));
        }

        #[test]
        fn test_garbage_model_rejected() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("model.bin");
            std::fs::write(&path, b"xx").unwrap();
            assert!(SeetaFaceDetector::from_file(&path, 30).is_err());
        }
    }
}

#[cfg(feature = "face-detection")]
pub use seeta::SeetaFaceDetector;

/// Cropper described by `settings`: SeetaFace when a model is configured
/// and loadable, otherwise one that never finds a face.
pub fn face_cropper_from_settings(settings: &FaceSettings) -> Box<dyn FaceCropper> {
    match settings.model_path.as_deref() {
        Some(path) => model_cropper(path, settings),
        None => Box::new(NoFaceCropper),
    }
}

#[cfg(feature = "face-detection")]
fn model_cropper(path: &Path, settings: &FaceSettings) -> Box<dyn FaceCropper> {
    match SeetaFaceDetector::from_file(path, settings.min_face_size) {
        Ok(detector) => Box::new(DetectorFaceCropper::new(detector, settings.clone())),
        Err(e) => {
            warn!("Face cropping disabled: {}", e);
            Box::new(NoFaceCropper)
        }
    }
}

#[cfg(not(feature = "face-detection"))]
fn model_cropper(path: &Path, _settings: &FaceSettings) -> Box<dyn FaceCropper> {
    warn!(
        "Face model {} ignored: built without the face-detection feature",
        path.display()
    );
    Box::new(NoFaceCropper)
}

pub fn largest_face(faces: &[FaceBox]) -> Option<FaceBox> {
    faces.iter().copied().max_by_key(FaceBox::area)
}

/// Grows `face` by `margin_ratio` of its larger side on every edge, clamped
/// to the image bounds.
pub fn expand_face_box(
    face: FaceBox,
    margin_ratio: f32,
    image_width: u32,
    image_height: u32,
) -> FaceBox {
    let margin = (margin_ratio * face.width.max(face.height) as f32) as u32;
    let x1 = face.x.saturating_sub(margin);
    let y1 = face.y.saturating_sub(margin);
    let x2 = (face.x + face.width + margin).min(image_width);
    let y2 = (face.y + face.height + margin).min(image_height);
    FaceBox {
        x: x1.min(image_width),
        y: y1.min(image_height),
        width: x2.saturating_sub(x1),
        height: y2.saturating_sub(y1),
    }
}
