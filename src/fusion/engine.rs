use std::collections::BTreeMap;

use log::debug;

use crate::models::{
    AddressInfo, Breakdown, FieldMap, FieldSource, FinalData, FusedRecord, GeoValidation,
    PersonalInfo, QrAndXml, Status, StructuredRecord,
};
use crate::utils::{mask_identifier, mask_payload};
use crate::validation::Gazetteer;

/// Picks the first non-blank candidate per field and remembers who supplied it.
struct Resolver {
    provenance: BTreeMap<&'static str, FieldSource>,
}

impl Resolver {
    fn new() -> Self {
        Resolver {
            provenance: BTreeMap::new(),
        }
    }

    fn pick(
        &mut self,
        field: &'static str,
        candidates: &[(FieldSource, Option<&str>)],
    ) -> Option<String> {
        candidates.iter().find_map(|(source, value)| {
            let value = value.map(str::trim).filter(|v| !v.is_empty())?;
            self.provenance.insert(field, *source);
            Some(value.to_string())
        })
    }
}

/// Merges the structured record and both sides' field maps into one record.
///
/// Precedence per field, first non-absent value wins:
/// personal fields come from the structured record, then the front side;
/// address fields come from the structured record, then the back side,
/// then the front side.
pub struct FusionEngine;

impl FusionEngine {
    pub fn fuse(
        structured: Option<&StructuredRecord>,
        front: &FieldMap,
        back: &FieldMap,
        raw_payload: Option<&str>,
    ) -> FusedRecord {
        use FieldSource::{BackText, FrontText, Structured};

        let qr = structured.cloned().unwrap_or_default();
        let mut resolver = Resolver::new();

        let identifier = resolver.pick(
            "personal_info.identifier",
            &[
                (Structured, qr.uid.as_deref()),
                (FrontText, front.identifier_number.as_deref()),
            ],
        );
        let personal_info = PersonalInfo {
            name: resolver.pick(
                "personal_info.name",
                &[(Structured, qr.name.as_deref()), (FrontText, front.name.as_deref())],
            ),
            gender: resolver.pick(
                "personal_info.gender",
                &[
                    (Structured, qr.gender.as_deref().map(expand_gender)),
                    (FrontText, front.gender.as_deref()),
                ],
            ),
            date_of_birth: resolver.pick(
                "personal_info.date_of_birth",
                &[
                    (Structured, qr.dob.as_deref()),
                    (FrontText, front.date_of_birth.as_deref()),
                ],
            ),
            year_of_birth: resolver.pick(
                "personal_info.year_of_birth",
                &[
                    (Structured, qr.yob.as_deref()),
                    (FrontText, front.year_of_birth.as_deref()),
                ],
            ),
            identifier_masked: identifier.as_deref().map(mask_identifier),
            identifier,
        };

        let composed = qr.composed_address();
        let address = AddressInfo {
            house: resolver.pick("address.house", &[(Structured, qr.house.as_deref())]),
            street: resolver.pick("address.street", &[(Structured, qr.street.as_deref())]),
            vtc: resolver.pick("address.vtc", &[(Structured, qr.vtc.as_deref())]),
            locality: resolver.pick(
                "address.locality",
                &[
                    (Structured, qr.locality.as_deref()),
                    (BackText, back.locality.as_deref()),
                    (FrontText, front.locality.as_deref()),
                ],
            ),
            city: resolver.pick(
                "address.city",
                &[
                    (Structured, qr.district.as_deref()),
                    (BackText, back.city.as_deref()),
                    (FrontText, front.city.as_deref()),
                ],
            ),
            state: resolver.pick(
                "address.state",
                &[
                    (Structured, qr.state.as_deref()),
                    (BackText, back.state.as_deref()),
                    (FrontText, front.state.as_deref()),
                ],
            ),
            pincode: resolver.pick(
                "address.pincode",
                &[
                    (Structured, qr.pincode.as_deref()),
                    (BackText, back.pincode.as_deref()),
                    (FrontText, front.pincode.as_deref()),
                ],
            ),
            full_address: resolver.pick(
                "address.full_address",
                &[
                    (Structured, composed.as_deref()),
                    (BackText, back.address.as_deref()),
                    (FrontText, front.address.as_deref()),
                ],
            ),
        };

        let raw_payload = raw_payload.filter(|p| !p.is_empty());
        let qr_and_xml = QrAndXml {
            identifier: qr.uid.clone(),
            secondary_identifier: qr.vid.clone(),
            raw_payload: raw_payload.map(str::to_string),
            masked_payload: raw_payload.map(mask_payload),
        };

        let has_structured = structured.map_or(false, |r| !r.is_empty());
        let status = if has_structured || !front.is_empty() || !back.is_empty() {
            Status::Success
        } else {
            Status::PartialSuccess
        };

        let geo_validation = Self::validate_region(&address);
        debug!(
            "Fused {} fields, status {:?}",
            resolver.provenance.len(),
            status
        );

        FusedRecord {
            status,
            final_data: FinalData {
                personal_info,
                address,
                qr_and_xml,
                photo: Default::default(),
            },
            detailed_breakdown: Breakdown {
                qr_xml_extracted: structured.map(StructuredRecord::masked),
                ocr_front_extracted: front.masked(),
                ocr_back_extracted: back.masked(),
                provenance: resolver.provenance,
                geo_validation,
            },
        }
    }

    /// Checks the fused state and city against the gazetteer.
    pub fn validate_region(address: &AddressInfo) -> GeoValidation {
        let state = address.state.as_deref();
        let matched_state = state.and_then(Gazetteer::fuzzy_match_state);
        let region = address
            .city
            .as_deref()
            .map(|city| Gazetteer::fuzzy_match_district(city, matched_state))
            .unwrap_or_default();

        GeoValidation {
            state_valid: state.map_or(false, Gazetteer::validate_state),
            district_valid: match (address.city.as_deref(), matched_state) {
                (Some(city), Some(state)) => Gazetteer::validate_district(city, state),
                _ => false,
            },
            matched_state: matched_state.map(str::to_string),
            matched_district: region.district.map(str::to_string),
        }
    }
}

/// The structured record writes gender as a single letter.
fn expand_gender(code: &str) -> &str {
    match code.trim() {
        "M" | "m" => "Male",
        "F" | "f" => "Female",
        "T" | "t" => "Transgender",
        other => other,
    }
}
