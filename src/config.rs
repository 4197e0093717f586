use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::utils::{ExtractionError, Result};

/// Tunables for the barcode locate-and-decode chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarcodeSettings {
    /// Scale factors tried on a rectified crop, in order.
    pub rectified_scales: Vec<f32>,
    /// How many of the largest contours are tested for a quadrilateral.
    pub max_contours: usize,
    /// Polygon approximation tolerance as a fraction of contour perimeter.
    pub polygon_tolerance: f64,
    pub canny_low: f32,
    pub canny_high: f32,
    pub bilateral_window: u32,
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_spatial: f32,
    /// Radius of the adaptive threshold block (radius 5 = 11x11 block).
    pub threshold_block_radius: u32,
}

impl Default for BarcodeSettings {
    fn default() -> Self {
        BarcodeSettings {
            rectified_scales: vec![1.0, 1.5, 2.0],
            max_contours: 10,
            polygon_tolerance: 0.02,
            canny_low: 50.0,
            canny_high: 200.0,
            bilateral_window: 9,
            bilateral_sigma_color: 75.0,
            bilateral_sigma_spatial: 75.0,
            threshold_block_radius: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionSettings {
    /// Tesseract language string, e.g. `"eng"` or `"eng+hin"`.
    pub language: String,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        RecognitionSettings {
            language: "eng".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationSettings {
    pub enabled: bool,
    /// Longer inputs are truncated before being handed to the translator.
    pub max_chars: usize,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        TranslationSettings {
            enabled: true,
            max_chars: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceSettings {
    /// SeetaFace model file. Face cropping is off when unset or when the
    /// crate is built without `face-detection`.
    pub model_path: Option<PathBuf>,
    /// Images wider than this are downscaled before detection.
    pub resize_width: u32,
    /// Smallest face side in pixels, measured on the downscaled image.
    pub min_face_size: u32,
    /// Margin added around the detected face, relative to its larger side.
    pub margin_ratio: f32,
}

impl Default for FaceSettings {
    fn default() -> Self {
        FaceSettings {
            model_path: None,
            resize_width: 400,
            min_face_size: 30,
            margin_ratio: 0.15,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub barcode: BarcodeSettings,
    pub recognition: RecognitionSettings,
    pub translation: TranslationSettings,
    pub face: FaceSettings,
}

impl PipelineConfig {
    /// Loads a JSON config file. Missing sections and fields keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ExtractionError::Config(format!(
                "Failed to read config {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(contents)
            .map_err(|e| ExtractionError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.barcode.rectified_scales.iter().any(|s| *s <= 0.0) {
            return Err(ExtractionError::Config(
                "rectified_scales must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.face.margin_ratio) {
            return Err(ExtractionError::Config(
                "face margin_ratio must be between 0 and 1".to_string(),
            ));
        }
        if self.barcode.polygon_tolerance <= 0.0 {
            return Err(ExtractionError::Config(
                "polygon_tolerance must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
