use serde::Serialize;

use crate::models::{
    AddressInfo, PersonalInfo, ProcessingReport, SideTranslation, Status, Translations,
};
use crate::processing::DecodeStrategy;
use crate::utils::mask_identifier;

const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryMetadata {
    pub status: Status,
    pub languages: Vec<String>,
    pub processing_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode_strategy: Option<DecodeStrategy>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersonalSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier_masked: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_of_birth: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddressSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_address_english: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub house: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality_english: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub village_town_city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_english: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QrSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid_masked: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vid_masked: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked_payload: Option<String>,
    pub qr_status: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagesSummary {
    pub face_image_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_image_preview: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryStats {
    pub fields_extracted: usize,
    pub confidence: Confidence,
}

/// Compact, display-oriented view of a report. Carries masked identifiers
/// only and drops every absent or blank value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryView {
    pub metadata: SummaryMetadata,
    pub personal_information: PersonalSummary,
    pub address_details: AddressSummary,
    pub qr_data: QrSummary,
    pub document_images: ImagesSummary,
    pub summary: SummaryStats,
}

impl SummaryView {
    pub fn from_report(report: &ProcessingReport) -> Self {
        let data = &report.record.final_data;
        let personal = &data.personal_info;
        let address = &data.address;
        let qr = &data.qr_and_xml;
        let translations = &report.translations;

        let face = present(&data.photo.face_image_base64);
        let face_image_preview = face.as_ref().map(|encoded| {
            let preview: String = encoded.chars().take(PREVIEW_CHARS).collect();
            format!("{}...", preview)
        });

        SummaryView {
            metadata: SummaryMetadata {
                status: report.record.status,
                languages: translations.detected_languages(),
                processing_type: "Identity card extraction with masking",
                barcode_strategy: report.raw_sources.barcode.strategy,
            },
            personal_information: PersonalSummary {
                identifier_masked: present(&personal.identifier_masked),
                name: present(&personal.name),
                gender: present(&personal.gender),
                date_of_birth: present(&personal.date_of_birth),
                year_of_birth: present(&personal.year_of_birth),
            },
            address_details: AddressSummary {
                full_address: present(&address.full_address),
                full_address_english: english(translations, |t| &t.address),
                house: present(&address.house),
                street: present(&address.street),
                locality: present(&address.locality),
                locality_english: english(translations, |t| &t.locality),
                village_town_city: present(&address.vtc),
                city: present(&address.city),
                city_english: english(translations, |t| &t.city),
                state: present(&address.state),
                pincode: present(&address.pincode),
            },
            qr_data: QrSummary {
                uid_masked: present(&qr.identifier).map(|uid| mask_identifier(&uid)),
                vid_masked: present(&qr.secondary_identifier).map(|vid| mask_identifier(&vid)),
                masked_payload: present(&qr.masked_payload),
                qr_status: if present(&qr.raw_payload).is_some() {
                    "Present"
                } else {
                    "Not Found"
                },
            },
            document_images: ImagesSummary {
                face_image_available: face.is_some(),
                face_image_preview,
            },
            summary: SummaryStats {
                fields_extracted: count_personal(personal) + count_address(address),
                confidence: if present(&personal.identifier).is_some() {
                    Confidence::High
                } else {
                    Confidence::Medium
                },
            },
        }
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// Back-side translation first, then front.
fn english(
    translations: &Translations,
    field: impl Fn(&SideTranslation) -> &Option<String>,
) -> Option<String> {
    present(field(&translations.back)).or_else(|| present(field(&translations.front)))
}

fn count_present(values: &[&Option<String>]) -> usize {
    values.iter().filter(|v| present(v).is_some()).count()
}

fn count_personal(p: &PersonalInfo) -> usize {
    count_present(&[
        &p.name,
        &p.gender,
        &p.date_of_birth,
        &p.year_of_birth,
        &p.identifier,
        &p.identifier_masked,
    ])
}

fn count_address(a: &AddressInfo) -> usize {
    count_present(&[
        &a.house,
        &a.street,
        &a.locality,
        &a.vtc,
        &a.city,
        &a.state,
        &a.pincode,
        &a.full_address,
    ])
}
