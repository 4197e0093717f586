//! Redaction helpers applied to every emitted copy of a sensitive value.

use lazy_static::lazy_static;
use regex::Regex;

const PAYLOAD_MASK_MARKER: &str = "**[MASKED]**";
const PAYLOAD_VISIBLE_CHARS: usize = 10;

lazy_static! {
    static ref GROUPED_IDENTIFIER: Regex = Regex::new(r"\b\d{4} ?\d{4} ?\d{4}\b").unwrap();
}

/// Masks an identifier so only its last four characters stay visible.
///
/// Anything shorter than four characters is masked entirely as `"****"`.
pub fn mask_identifier(identifier: &str) -> String {
    let chars: Vec<char> = identifier.chars().collect();
    if chars.len() < 4 {
        return "****".to_string();
    }
    let hidden = chars.len() - 4;
    let mut masked = "*".repeat(hidden);
    masked.extend(&chars[hidden..]);
    masked
}

/// Masks a raw barcode payload, keeping the first and last ten characters
/// of payloads that are at least twenty characters long.
pub fn mask_payload(payload: &str) -> String {
    let chars: Vec<char> = payload.chars().collect();
    if chars.is_empty() {
        return "****".to_string();
    }
    if chars.len() < 2 * PAYLOAD_VISIBLE_CHARS {
        return "*".repeat(chars.len());
    }

    let head: String = chars[..PAYLOAD_VISIBLE_CHARS].iter().collect();
    let tail: String = chars[chars.len() - PAYLOAD_VISIBLE_CHARS..].iter().collect();
    format!("{}{}{}", head, PAYLOAD_MASK_MARKER, tail)
}

/// Masks every 4-4-4 digit group found in free text.
pub fn redact_identifiers_in_text(text: &str) -> String {
    GROUPED_IDENTIFIER
        .replace_all(text, |caps: &regex::Captures| {
            let digits: String = caps[0].chars().filter(|c| !c.is_whitespace()).collect();
            mask_identifier(&digits)
        })
        .into_owned()
}
