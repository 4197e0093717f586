use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::utils::mask_identifier;

/// Which face of the card a piece of input came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Front,
    Back,
}

/// Recognition result for one side of the document.
#[derive(Debug, Clone, Serialize)]
pub struct RawSide {
    pub side: Side,
    pub image_path: Option<PathBuf>,
    pub text: Option<String>,
    pub error: Option<String>,
}

impl RawSide {
    pub fn recognized(side: Side, image_path: Option<PathBuf>, text: String) -> Self {
        RawSide {
            side,
            image_path,
            text: Some(text),
            error: None,
        }
    }

    pub fn failed(side: Side, image_path: Option<PathBuf>, error: impl Into<String>) -> Self {
        RawSide {
            side,
            image_path,
            text: None,
            error: Some(error.into()),
        }
    }

    pub fn missing(side: Side) -> Self {
        RawSide {
            side,
            image_path: None,
            text: None,
            error: None,
        }
    }
}

/// Fields pulled out of one side's recognized text by the heuristics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    pub name: Option<String>,
    pub date_of_birth: Option<String>,
    pub year_of_birth: Option<String>,
    pub guardian_name: Option<String>,
    pub gender: Option<String>,
    pub identifier_number: Option<String>,
    pub address: Option<String>,
    pub locality: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

impl FieldMap {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.date_of_birth.is_none()
            && self.year_of_birth.is_none()
            && self.guardian_name.is_none()
            && self.gender.is_none()
            && self.identifier_number.is_none()
            && self.address.is_none()
            && self.locality.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.pincode.is_none()
    }

    /// Copy safe to emit: the identifier number is masked.
    pub fn masked(&self) -> FieldMap {
        FieldMap {
            identifier_number: self.identifier_number.as_deref().map(mask_identifier),
            ..self.clone()
        }
    }
}

/// Attribute set carried by the XML record inside the QR payload.
///
/// Serialized names follow the attribute names of the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredRecord {
    pub uid: Option<String>,
    pub name: Option<String>,
    pub gender: Option<String>,
    pub yob: Option<String>,
    pub dob: Option<String>,
    #[serde(rename = "co")]
    pub care_of: Option<String>,
    pub house: Option<String>,
    pub street: Option<String>,
    #[serde(rename = "lm")]
    pub landmark: Option<String>,
    #[serde(rename = "loc")]
    pub locality: Option<String>,
    pub vtc: Option<String>,
    #[serde(rename = "po")]
    pub post_office: Option<String>,
    #[serde(rename = "dist")]
    pub district: Option<String>,
    #[serde(rename = "subdist")]
    pub sub_district: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "pc")]
    pub pincode: Option<String>,
    pub vid: Option<String>,
}

impl StructuredRecord {
    pub fn is_empty(&self) -> bool {
        *self == StructuredRecord::default()
    }

    /// Copy safe to emit: both identifiers are masked.
    pub fn masked(&self) -> StructuredRecord {
        StructuredRecord {
            uid: self.uid.as_deref().map(mask_identifier),
            vid: self.vid.as_deref().map(mask_identifier),
            ..self.clone()
        }
    }

    /// Joins the address attributes in postal order, skipping absent ones.
    pub fn composed_address(&self) -> Option<String> {
        let parts: Vec<&str> = [
            &self.house,
            &self.street,
            &self.landmark,
            &self.locality,
            &self.vtc,
            &self.post_office,
            &self.district,
            &self.state,
            &self.pincode,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}
