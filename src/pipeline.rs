use std::path::Path;

use log::{info, warn};

use crate::config::PipelineConfig;
use crate::fusion::FusionEngine;
use crate::models::{
    BarcodeSource, FieldMap, ProcessingReport, RawSide, RawSources, Side, SideSource,
    StructuredRecord, Translations,
};
use crate::processing::{
    parse_structured_record, BarcodeDecoder, ImageProcessor, TextFieldExtractor, TextRecognizer,
};
use crate::services::{
    face_cropper_from_settings, FaceCropper, PassthroughTranslator, TranslationService,
    Translator,
};
use crate::utils::{find_document_images, mask_payload, DocumentImages, Result};

struct FrontOutcome {
    raw: RawSide,
    fields: FieldMap,
    face_image_base64: Option<String>,
    face_error: Option<String>,
}

struct BackOutcome {
    raw: RawSide,
    fields: FieldMap,
    barcode: BarcodeSource,
    structured: Option<StructuredRecord>,
    payload: Option<String>,
}

/// Runs one front/back pair through decoding, recognition, extraction and
/// fusion. Collaborators are injected; every failure inside a run is
/// recorded in the report instead of being returned.
pub struct DocumentPipeline {
    barcode: BarcodeDecoder,
    recognizer: Box<dyn TextRecognizer>,
    translation: TranslationService,
    face: Box<dyn FaceCropper>,
    config: PipelineConfig,
}

impl DocumentPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        DocumentPipeline {
            barcode: BarcodeDecoder::new(config.barcode.clone()),
            recognizer: default_recognizer(&config),
            translation: TranslationService::new(
                Box::new(PassthroughTranslator),
                config.translation.clone(),
            ),
            face: face_cropper_from_settings(&config.face),
            config,
        }
    }

    pub fn with_barcode_decoder(mut self, barcode: BarcodeDecoder) -> Self {
        self.barcode = barcode;
        self
    }

    pub fn with_recognizer(mut self, recognizer: Box<dyn TextRecognizer>) -> Self {
        self.recognizer = recognizer;
        self
    }

    pub fn with_translator(mut self, translator: Box<dyn Translator>) -> Self {
        self.translation = TranslationService::new(translator, self.config.translation.clone());
        self
    }

    pub fn with_face_cropper(mut self, face: Box<dyn FaceCropper>) -> Self {
        self.face = face;
        self
    }

    /// Locates the images in `dir` and processes them.
    pub fn process_directory(&self, dir: &Path) -> Result<ProcessingReport> {
        let images = find_document_images(dir)?;
        Ok(self.process(&images))
    }

    pub fn process(&self, images: &DocumentImages) -> ProcessingReport {
        info!("Processing front={:?} back={:?}", images.front, images.back);

        let (front, back) = rayon::join(
            || self.process_front(images.front.as_deref()),
            || self.process_back(images.back.as_deref()),
        );

        let record = FusionEngine::fuse(
            back.structured.as_ref(),
            &front.fields,
            &back.fields,
            back.payload.as_deref(),
        )
        .with_photo(front.face_image_base64);

        let translations = Translations {
            front: self
                .translation
                .translate_side(front.raw.text.as_deref(), &front.fields),
            back: self
                .translation
                .translate_side(back.raw.text.as_deref(), &back.fields),
        };

        info!("Extraction finished with status {:?}", record.status);
        ProcessingReport {
            record,
            translations,
            raw_sources: RawSources {
                front: SideSource::new(&front.raw, &front.fields),
                back: SideSource::new(&back.raw, &back.fields),
                barcode: back.barcode,
                face_error: front.face_error,
            },
            processed_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn process_front(&self, path: Option<&Path>) -> FrontOutcome {
        let raw = self.recognize(Side::Front, path);
        let fields = extract_fields(&raw);

        let (face_image_base64, face_error) = match path {
            Some(path) => match self.crop_face(path) {
                Ok(face) => (face, None),
                Err(e) => {
                    warn!("Face crop failed: {}", e);
                    (None, Some(e.to_string()))
                }
            },
            None => (None, None),
        };

        FrontOutcome {
            raw,
            fields,
            face_image_base64,
            face_error,
        }
    }

    fn process_back(&self, path: Option<&Path>) -> BackOutcome {
        let mut barcode = BarcodeSource {
            image_path: path.map(Path::to_path_buf),
            ..BarcodeSource::default()
        };
        let mut payload = None;
        let mut structured = None;

        if let Some(path) = path {
            match ImageProcessor::load(path) {
                Ok(image) => {
                    let outcome = self.barcode.decode_detailed(&image);
                    barcode.strategy = outcome.strategy;
                    barcode.attempts = outcome.attempts;
                    payload = outcome.payload;
                }
                Err(e) => {
                    warn!("Back image unreadable for barcode decoding: {}", e);
                    barcode.error = Some(e.to_string());
                }
            }
        }

        if let Some(text) = payload.as_deref() {
            barcode.masked_payload = Some(mask_payload(text));
            match parse_structured_record(text) {
                Ok(record) => {
                    barcode.structured_record = Some(record.masked());
                    structured = Some(record);
                }
                Err(e) => {
                    warn!("Barcode payload is not a structured record: {}", e);
                    barcode.error = Some(e.to_string());
                }
            }
        }

        let raw = self.recognize(Side::Back, path);
        let fields = extract_fields(&raw);

        BackOutcome {
            raw,
            fields,
            barcode,
            structured,
            payload,
        }
    }

    fn recognize(&self, side: Side, path: Option<&Path>) -> RawSide {
        let Some(path) = path else {
            return RawSide::missing(side);
        };
        match self.recognizer.recognize(path) {
            Ok(text) => RawSide::recognized(side, Some(path.to_path_buf()), text),
            Err(e) => {
                warn!("Text recognition failed for {:?} side: {}", side, e);
                RawSide::failed(side, Some(path.to_path_buf()), e.to_string())
            }
        }
    }

    fn crop_face(&self, path: &Path) -> Result<Option<String>> {
        let image = ImageProcessor::load(path)?;
        match self.face.crop_largest_face(&image)? {
            Some(face) => Ok(Some(ImageProcessor::encode_png_base64(&face)?)),
            None => Ok(None),
        }
    }
}

fn extract_fields(raw: &RawSide) -> FieldMap {
    raw.text
        .as_deref()
        .map(TextFieldExtractor::extract)
        .unwrap_or_default()
}

#[cfg(feature = "tesseract")]
fn default_recognizer(config: &PipelineConfig) -> Box<dyn TextRecognizer> {
    Box::new(crate::processing::TesseractRecognizer::new(
        config.recognition.language.clone(),
    ))
}

#[cfg(not(feature = "tesseract"))]
fn default_recognizer(_config: &PipelineConfig) -> Box<dyn TextRecognizer> {
    Box::new(crate::processing::SidecarTextRecognizer)
}
