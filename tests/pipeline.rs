use std::collections::HashMap;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use idfusion::config::FaceSettings;
use idfusion::models::{FieldSource, Status};
use idfusion::processing::{DecodeStrategy, SidecarTextRecognizer, TextRecognizer};
use idfusion::services::{DetectorFaceCropper, FaceBox, FaceCropper, FaceDetector, Translator};
use idfusion::utils::DocumentImages;
use idfusion::{DocumentPipeline, ExtractionError, PipelineConfig, Result, SummaryView};
use image::{DynamicImage, GrayImage, Luma, RgbImage};
use qrcode::{Color, QrCode};

const PAYLOAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?><PrintLetterBarcodeData uid="123456789012" name="Asha Devi" gender="F" yob="1992" house="12" street="Temple Street" loc="Kakkanad" vtc="Kochi" dist="Ernakulam" state="Kerala" pc="682030"/>"#;

const FRONT_TEXT: &str = "GOVERNMENT OF INDIA\nAsha D.\nDOB: 14/08/1992\nFEMALE\n1234 5678 9012";
const BACK_TEXT: &str = "Address:\nC/O: Ramesh Kumar\nMadurai\nTamil Nadu 625001";

struct FakeRecognizer {
    texts: HashMap<String, String>,
}

impl FakeRecognizer {
    fn new(pairs: &[(&str, &str)]) -> Self {
        FakeRecognizer {
            texts: pairs
                .iter()
                .map(|(name, text)| (name.to_string(), text.to_string()))
                .collect(),
        }
    }
}

impl TextRecognizer for FakeRecognizer {
    fn recognize(&self, image_path: &Path) -> Result<String> {
        let name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.texts
            .get(&name)
            .cloned()
            .ok_or_else(|| ExtractionError::Recognition(format!("engine crashed on {}", name)))
    }
}

struct FixedFace;

impl FaceCropper for FixedFace {
    fn crop_largest_face(&self, _image: &DynamicImage) -> Result<Option<DynamicImage>> {
        Ok(Some(DynamicImage::ImageRgb8(RgbImage::new(4, 4))))
    }
}

struct OneFace;

impl FaceDetector for OneFace {
    fn detect(&self, _gray: &GrayImage) -> Vec<FaceBox> {
        vec![FaceBox { x: 10, y: 5, width: 20, height: 16 }]
    }
}

struct UpperCaseTranslator;

impl Translator for UpperCaseTranslator {
    fn translate(&self, text: &str) -> Result<String> {
        Ok(text.to_uppercase())
    }
}

fn render_qr(payload: &str, module_px: u32) -> GrayImage {
    let code = QrCode::new(payload.as_bytes()).unwrap();
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let quiet = 4;
    let size = (modules + 2 * quiet) * module_px;
    GrayImage::from_fn(size, size, |x, y| {
        let mx = (x / module_px) as i64 - quiet as i64;
        let my = (y / module_px) as i64 - quiet as i64;
        let inside = mx >= 0 && my >= 0 && mx < modules as i64 && my < modules as i64;
        if inside && colors[(my as u32 * modules + mx as u32) as usize] == Color::Dark {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

fn write_images(dir: &Path, payload: &str) -> DocumentImages {
    let front = dir.join("front.png");
    let back = dir.join("back.png");
    GrayImage::from_pixel(64, 40, Luma([230])).save(&front).unwrap();
    render_qr(payload, 4).save(&back).unwrap();
    DocumentImages {
        front: Some(front),
        back: Some(back),
    }
}

#[test]
fn test_structured_record_wins_and_breakdown_is_masked() {
    let dir = tempfile::tempdir().unwrap();
    let images = write_images(dir.path(), PAYLOAD);
    let pipeline = DocumentPipeline::new(PipelineConfig::default())
        .with_recognizer(Box::new(FakeRecognizer::new(&[
            ("front.png", FRONT_TEXT),
            ("back.png", BACK_TEXT),
        ])))
        .with_face_cropper(Box::new(FixedFace));

    let report = pipeline.process(&images);
    let record = &report.record;

    assert_eq!(record.status, Status::Success);
    let personal = &record.final_data.personal_info;
    assert_eq!(personal.name.as_deref(), Some("Asha Devi"));
    assert_eq!(personal.gender.as_deref(), Some("Female"));
    assert_eq!(personal.identifier.as_deref(), Some("123456789012"));
    assert_eq!(personal.date_of_birth.as_deref(), Some("14/08/1992"));
    assert_eq!(record.source_of("personal_info.date_of_birth"), Some(FieldSource::FrontText));

    let address = &record.final_data.address;
    assert_eq!(address.state.as_deref(), Some("Kerala"));
    assert_eq!(address.city.as_deref(), Some("Ernakulam"));
    assert_eq!(record.source_of("address.state"), Some(FieldSource::Structured));
    assert_eq!(report.raw_sources.back.fields.state.as_deref(), Some("Tamil Nadu"));

    assert_eq!(report.raw_sources.barcode.strategy, Some(DecodeStrategy::Direct));
    assert!(report.raw_sources.barcode.error.is_none());
    assert!(record.final_data.photo.face_image_base64.is_some());

    let breakdown = serde_json::to_string(&record.detailed_breakdown).unwrap();
    let raw_sources = serde_json::to_string(&report.raw_sources).unwrap();
    for section in [&breakdown, &raw_sources] {
        assert!(!section.contains("123456789012"));
        assert!(!section.contains("1234 5678 9012"));
    }

    let summary = serde_json::to_string(&SummaryView::from_report(&report)).unwrap();
    assert!(!summary.contains("123456789012"));
    assert!(summary.contains("********9012"));
}

#[test]
fn test_non_record_payload_and_recognition_failure_are_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let images = write_images(dir.path(), "PLAIN-TEXT-SYMBOL");
    let pipeline = DocumentPipeline::new(PipelineConfig::default())
        .with_recognizer(Box::new(FakeRecognizer::new(&[("back.png", BACK_TEXT)])));

    let report = pipeline.process(&images);

    let barcode = &report.raw_sources.barcode;
    assert!(barcode.structured_record.is_none());
    assert!(barcode.error.as_deref().unwrap().contains("not an XML record"));
    assert_eq!(
        report.record.final_data.qr_and_xml.raw_payload.as_deref(),
        Some("PLAIN-TEXT-SYMBOL")
    );
    assert_eq!(
        report.record.final_data.qr_and_xml.masked_payload.as_deref(),
        Some("*****************")
    );

    assert!(report.raw_sources.front.error.as_deref().unwrap().contains("engine crashed"));
    assert_eq!(report.record.status, Status::Success);
    assert_eq!(report.record.final_data.address.state.as_deref(), Some("Tamil Nadu"));
    assert_eq!(report.record.final_data.address.pincode.as_deref(), Some("625001"));
    assert_eq!(report.record.source_of("address.state"), Some(FieldSource::BackText));
}

#[test]
fn test_no_images_gives_partial_success() {
    let pipeline = DocumentPipeline::new(PipelineConfig::default());
    let report = pipeline.process(&DocumentImages::default());

    assert_eq!(report.record.status, Status::PartialSuccess);
    assert!(report.record.detailed_breakdown.provenance.is_empty());
    assert_eq!(report.raw_sources.barcode.attempts, 0);
    assert!(chrono::DateTime::parse_from_rfc3339(&report.processed_at).is_ok());
}

#[test]
fn test_directory_run_with_sidecar_text() {
    let dir = tempfile::tempdir().unwrap();
    let images = write_images(dir.path(), PAYLOAD);
    std::fs::write(dir.path().join("front.png.txt"), FRONT_TEXT).unwrap();

    let pipeline = DocumentPipeline::new(PipelineConfig::default())
        .with_recognizer(Box::new(SidecarTextRecognizer));
    let report = pipeline.process_directory(dir.path()).unwrap();

    let paths: Vec<Option<PathBuf>> = vec![
        report.raw_sources.front.image_path.clone(),
        report.raw_sources.back.image_path.clone(),
    ];
    assert_eq!(paths, vec![images.front, images.back]);
    assert_eq!(
        report.record.final_data.personal_info.year_of_birth.as_deref(),
        Some("1992")
    );
    assert!(report.raw_sources.back.error.is_some());
}

#[test]
fn test_translation_applied_to_non_english_side() {
    let hindi = "मेरा नाम आशा देवी है और मैं केरल में रहती हूँ। यह मेरा पता है।";
    let dir = tempfile::tempdir().unwrap();
    let images = write_images(dir.path(), PAYLOAD);
    let pipeline = DocumentPipeline::new(PipelineConfig::default())
        .with_recognizer(Box::new(FakeRecognizer::new(&[
            ("front.png", hindi),
            ("back.png", BACK_TEXT),
        ])))
        .with_translator(Box::new(UpperCaseTranslator));

    let report = pipeline.process(&images);
    assert_eq!(report.translations.front.detected_language.as_deref(), Some("hin"));
    assert!(report.translations.front.full_text.is_some());
}

#[test]
fn test_face_settings_shape_the_photo_crop() {
    let dir = tempfile::tempdir().unwrap();
    let images = write_images(dir.path(), PAYLOAD);
    let config = PipelineConfig {
        face: FaceSettings {
            margin_ratio: 0.25,
            ..FaceSettings::default()
        },
        ..PipelineConfig::default()
    };
    let cropper = DetectorFaceCropper::new(OneFace, config.face.clone());
    let pipeline = DocumentPipeline::new(config)
        .with_recognizer(Box::new(FakeRecognizer::new(&[("front.png", FRONT_TEXT)])))
        .with_face_cropper(Box::new(cropper));

    let report = pipeline.process(&images);
    let encoded = report.record.final_data.photo.face_image_base64.unwrap();
    let photo = image::load_from_memory(&general_purpose::STANDARD.decode(encoded).unwrap()).unwrap();
    // 20x16 box grown by a quarter of its larger side on every edge.
    assert_eq!((photo.width(), photo.height()), (30, 26));
    assert!(report.raw_sources.face_error.is_none());
}

#[test]
fn test_unusable_face_model_leaves_photo_empty() {
    let dir = tempfile::tempdir().unwrap();
    let images = write_images(dir.path(), PAYLOAD);
    let config = PipelineConfig {
        face: FaceSettings {
            model_path: Some(dir.path().join("missing-model.bin")),
            ..FaceSettings::default()
        },
        ..PipelineConfig::default()
    };
    let pipeline = DocumentPipeline::new(config)
        .with_recognizer(Box::new(FakeRecognizer::new(&[("front.png", FRONT_TEXT)])));

    let report = pipeline.process(&images);
    assert!(report.record.final_data.photo.face_image_base64.is_none());
    assert_eq!(report.record.status, Status::Success);
}
