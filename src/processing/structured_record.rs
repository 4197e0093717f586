use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::models::StructuredRecord;
use crate::utils::{ExtractionError, Result};

/// Reads the attributes of the first XML element in a QR payload.
///
/// The payload is typically a single `<PrintLetterBarcodeData .../>` element
/// preceded by an XML declaration. Unknown attributes are ignored and empty
/// values are treated as absent.
pub fn parse_structured_record(payload: &str) -> Result<StructuredRecord> {
    let mut reader = Reader::from_str(payload.trim());

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                return record_from_element(&element);
            }
            Ok(Event::Eof) => {
                return Err(ExtractionError::RecordParse(
                    "Payload contains no XML element".to_string(),
                ))
            }
            Ok(Event::Text(text)) if !text.iter().all(u8::is_ascii_whitespace) => {
                return Err(ExtractionError::RecordParse(
                    "Payload is not an XML record".to_string(),
                ))
            }
            Ok(_) => {}
            Err(e) => {
                return Err(ExtractionError::RecordParse(format!(
                    "Malformed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }
}

fn record_from_element(element: &BytesStart) -> Result<StructuredRecord> {
    let mut record = StructuredRecord::default();

    for attr in element.attributes() {
        let attr = attr
            .map_err(|e| ExtractionError::RecordParse(format!("Bad attribute: {}", e)))?;
        let value = attr
            .unescape_value()
            .map_err(|e| ExtractionError::RecordParse(format!("Bad attribute value: {}", e)))?
            .trim()
            .to_string();
        if value.is_empty() {
            continue;
        }

        let slot = match attr.key.as_ref() {
            b"uid" => &mut record.uid,
            b"name" => &mut record.name,
            b"gender" => &mut record.gender,
            b"yob" => &mut record.yob,
            b"dob" => &mut record.dob,
            b"co" => &mut record.care_of,
            b"house" => &mut record.house,
            b"street" => &mut record.street,
            b"lm" => &mut record.landmark,
            b"loc" => &mut record.locality,
            b"vtc" => &mut record.vtc,
            b"po" => &mut record.post_office,
            b"dist" => &mut record.district,
            b"subdist" => &mut record.sub_district,
            b"state" => &mut record.state,
            b"pc" => &mut record.pincode,
            b"vid" => &mut record.vid,
            _ => continue,
        };
        *slot = Some(value);
    }

    Ok(record)
}
