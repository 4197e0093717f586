use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use super::data::{FieldMap, RawSide, StructuredRecord};
use crate::processing::DecodeStrategy;
use crate::utils::redact_identifiers_in_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    PartialSuccess,
}

/// The input that supplied a fused field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldSource {
    #[serde(rename = "qr_xml")]
    Structured,
    #[serde(rename = "ocr_back")]
    BackText,
    #[serde(rename = "ocr_front")]
    FrontText,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersonalInfo {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub year_of_birth: Option<String>,
    pub identifier: Option<String>,
    pub identifier_masked: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddressInfo {
    pub house: Option<String>,
    pub street: Option<String>,
    pub locality: Option<String>,
    pub vtc: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub full_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QrAndXml {
    pub identifier: Option<String>,
    pub secondary_identifier: Option<String>,
    pub raw_payload: Option<String>,
    pub masked_payload: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Photo {
    pub face_image_base64: Option<String>,
}

/// The only section allowed to carry clear identifiers and payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FinalData {
    pub personal_info: PersonalInfo,
    pub address: AddressInfo,
    pub qr_and_xml: QrAndXml,
    pub photo: Photo,
}

/// Gazetteer check of the fused state and city. Never alters the fused values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeoValidation {
    pub state_valid: bool,
    pub district_valid: bool,
    pub matched_state: Option<String>,
    pub matched_district: Option<String>,
}

/// Masked copies of every input plus the winning source of each field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    pub qr_xml_extracted: Option<StructuredRecord>,
    pub ocr_front_extracted: FieldMap,
    pub ocr_back_extracted: FieldMap,
    pub provenance: BTreeMap<&'static str, FieldSource>,
    pub geo_validation: GeoValidation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FusedRecord {
    pub status: Status,
    pub final_data: FinalData,
    pub detailed_breakdown: Breakdown,
}

impl FusedRecord {
    /// Which input won `field` (e.g. `"address.state"`), if any did.
    pub fn source_of(&self, field: &str) -> Option<FieldSource> {
        self.detailed_breakdown.provenance.get(field).copied()
    }

    pub fn with_photo(mut self, face_image_base64: Option<String>) -> Self {
        self.final_data.photo.face_image_base64 = face_image_base64;
        self
    }
}

/// English renderings of one side's text. Fields stay absent when the text
/// was already English or translation is disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SideTranslation {
    pub detected_language: Option<String>,
    pub full_text: Option<String>,
    pub address: Option<String>,
    pub locality: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Translations {
    pub front: SideTranslation,
    pub back: SideTranslation,
}

impl Translations {
    pub fn detected_languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = [&self.front, &self.back]
            .into_iter()
            .filter_map(|side| side.detected_language.clone())
            .collect();
        languages.dedup();
        languages
    }
}

/// Audit copy of one side's recognition input and output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideSource {
    pub image_path: Option<PathBuf>,
    /// Recognized text with identifier-shaped digit runs redacted.
    pub text: Option<String>,
    pub fields: FieldMap,
    pub error: Option<String>,
}

impl SideSource {
    pub fn new(raw: &RawSide, fields: &FieldMap) -> Self {
        SideSource {
            image_path: raw.image_path.clone(),
            text: raw.text.as_deref().map(redact_identifiers_in_text),
            fields: fields.masked(),
            error: raw.error.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BarcodeSource {
    pub image_path: Option<PathBuf>,
    pub masked_payload: Option<String>,
    pub strategy: Option<DecodeStrategy>,
    pub attempts: usize,
    pub structured_record: Option<StructuredRecord>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawSources {
    pub front: SideSource,
    pub back: SideSource,
    pub barcode: BarcodeSource,
    pub face_error: Option<String>,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingReport {
    #[serde(flatten)]
    pub record: FusedRecord,
    pub translations: Translations,
    pub raw_sources: RawSources,
    /// RFC 3339 timestamp.
    pub processed_at: String,
}
