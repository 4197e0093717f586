// Heuristic field extraction from one side's recognized text
use lazy_static::lazy_static;
use regex::Regex;

use super::text_cleaner::TextCleaner;
use crate::models::FieldMap;
use crate::validation::Gazetteer;

lazy_static! {
    static ref DATE_PATTERN: Regex = Regex::new(r"(\d{2}[/-]\d{2}[/-]\d{4})").unwrap();
    static ref YEAR_PATTERN: Regex = Regex::new(r"\b(19\d{2}|20\d{2})\b").unwrap();
    static ref BARE_YEAR: Regex = Regex::new(r"^\d{4}$").unwrap();
    static ref BIRTH_LABEL: Regex = Regex::new(r"(?i)\b(?:dob|yob|birth)\b").unwrap();

    static ref MALE: Regex = Regex::new(r"(?i)\bMALE\b").unwrap();
    static ref FEMALE: Regex = Regex::new(r"(?i)\bFEMALE\b").unwrap();

    static ref GROUPED_IDENTIFIER: Regex = Regex::new(r"\b(\d{4} ?\d{4} ?\d{4})\b").unwrap();
    static ref BARE_IDENTIFIER: Regex = Regex::new(r"\b(\d{12})\b").unwrap();

    // Guardian labels, in priority order
    static ref GUARDIAN_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?im)\bC/O[: \t]+([A-Za-z][A-Za-z \t.]*?)[ \t]*(?:,|$)").unwrap(),
        Regex::new(r"(?im)\bCARE[ \t]+OF[: \t]+([A-Za-z][A-Za-z \t.]*?)[ \t]*(?:,|$)").unwrap(),
        Regex::new(r"(?im)\bF/O[: \t]+([A-Za-z][A-Za-z \t.]*?)[ \t]*(?:,|$)").unwrap(),
        Regex::new(r"(?im)\bFATHER[: \t]+([A-Za-z][A-Za-z \t.]*?)[ \t]*(?:,|$)").unwrap(),
    ];

    // Words that never occur in a holder's name line
    static ref NAME_NOISE: Regex = Regex::new(
        r"(?i)\b(?:government|india|aadhaa?r|uidai|authority|unique|identification|issued?|dob|date|birth|yob|year|vid|address|dist(?:rict)?|number|no|male|female|gender|help|www|enrol?ment|enrollment|download|mobile|phone|email|signature|registration)\b"
    ).unwrap();
    static ref URL_LIKE: Regex = Regex::new(r"(?i)https?://|www\.|\.(?:com|in|org|gov)\b").unwrap();

    static ref ADDRESS_LABEL: Regex = Regex::new(r"(?i)\baddress\s*:\s*(.*)$").unwrap();
    static ref PINCODE: Regex = Regex::new(r"\b(\d{6})\b").unwrap();
    static ref DISTRICT_LABEL: Regex =
        Regex::new(r"(?i)\bDIST(?:RICT)?\b\.?[: \t-]*([A-Za-z][A-Za-z \t-]*)").unwrap();
}

/// Address-class fields found by one of the address strategies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressParts {
    pub address: Option<String>,
    pub locality: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

/// Turns the free text of one card side into a [`FieldMap`].
///
/// Every rule is a best-effort heuristic: a rule that finds nothing leaves
/// its field absent, and no input makes extraction fail.
pub struct TextFieldExtractor;

impl TextFieldExtractor {
    /// Cleans `raw_text` and runs every field rule over the result.
    pub fn extract(raw_text: &str) -> FieldMap {
        let text = TextCleaner::clean(raw_text);
        let date_of_birth = Self::extract_date_of_birth(&text);
        let year_of_birth = Self::extract_year_of_birth(&text, date_of_birth.as_deref());
        let address = Self::extract_address(&text);

        FieldMap {
            name: Self::extract_name(&text),
            date_of_birth,
            year_of_birth,
            guardian_name: Self::extract_guardian_name(&text),
            gender: Self::extract_gender(&text),
            identifier_number: Self::extract_identifier(&text),
            address: address.address,
            locality: address.locality,
            city: address.city,
            state: address.state,
            pincode: address.pincode,
        }
    }

    pub fn extract_date_of_birth(text: &str) -> Option<String> {
        DATE_PATTERN
            .captures(text)
            .or_else(|| YEAR_PATTERN.captures(text))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    pub fn extract_year_of_birth(text: &str, date_of_birth: Option<&str>) -> Option<String> {
        if let Some(dob) = date_of_birth {
            if BARE_YEAR.is_match(dob) {
                return Some(dob.to_string());
            }
        }
        YEAR_PATTERN
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// MALE is tested first; both tests are whole-word so FEMALE never reads as MALE.
    pub fn extract_gender(text: &str) -> Option<String> {
        if MALE.is_match(text) {
            Some("Male".to_string())
        } else if FEMALE.is_match(text) {
            Some("Female".to_string())
        } else {
            None
        }
    }

    /// Twelve digits, optionally grouped 4-4-4; returned without spaces.
    pub fn extract_identifier(text: &str) -> Option<String> {
        if let Some(m) = GROUPED_IDENTIFIER.captures(text).and_then(|c| c.get(1)) {
            return Some(m.as_str().replace(' ', ""));
        }
        BARE_IDENTIFIER
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    pub fn extract_guardian_name(text: &str) -> Option<String> {
        GUARDIAN_PATTERNS.iter().find_map(|pattern| {
            pattern
                .captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|name| name.chars().count() > 2)
        })
    }

    /// Name line: first plausible line above the birth-date line, else the
    /// best plausible line anywhere.
    pub fn extract_name(text: &str) -> Option<String> {
        let lines = Self::lines(text);
        Self::name_above_birth_line(&lines).or_else(|| Self::name_from_candidates(&lines))
    }

    fn name_above_birth_line(lines: &[&str]) -> Option<String> {
        let birth_idx = lines
            .iter()
            .position(|l| DATE_PATTERN.is_match(l) || BIRTH_LABEL.is_match(l))?;

        lines[..birth_idx]
            .iter()
            .rev()
            .find(|l| Self::is_name_candidate(l) && Self::has_name_shape(l))
            .map(|l| l.to_string())
    }

    fn name_from_candidates(lines: &[&str]) -> Option<String> {
        let candidates: Vec<&str> = lines
            .iter()
            .copied()
            .filter(|l| Self::is_name_candidate(l))
            .collect();

        candidates
            .iter()
            .find(|l| Self::has_name_shape(l))
            .or_else(|| candidates.first())
            .map(|l| l.to_string())
    }

    fn is_name_candidate(line: &str) -> bool {
        if NAME_NOISE.is_match(line) || line.contains('@') || URL_LIKE.is_match(line) {
            return false;
        }
        let digits = line.chars().filter(|c| c.is_ascii_digit()).count();
        let separators = line.chars().filter(|c| matches!(c, '|' | '&' | '/' | '~')).count();
        digits <= 1 && line.chars().count() <= 60 && separators <= 1
    }

    // 2 to 6 words, at least one of them alphabetic
    fn has_name_shape(line: &str) -> bool {
        let words: Vec<&str> = line.split_whitespace().collect();
        let alphabetic = words
            .iter()
            .any(|w| w.chars().any(|c| c.is_alphabetic()));
        (2..=6).contains(&words.len()) && alphabetic
    }

    /// Labelled address line first, then the lines ending at a postal code,
    /// then the first three lines.
    pub fn extract_address(text: &str) -> AddressParts {
        let lines = Self::lines(text);
        Self::labelled_address(&lines)
            .or_else(|| Self::address_ending_at_pincode(&lines, text))
            .unwrap_or_else(|| Self::leading_lines_address(&lines))
    }

    fn labelled_address(lines: &[&str]) -> Option<AddressParts> {
        let remainder = lines.iter().find_map(|l| {
            ADDRESS_LABEL
                .captures(l)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim())
                .filter(|rest| rest.chars().any(char::is_alphanumeric))
        })?;

        let segments: Vec<&str> = remainder
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        let locality = if segments.len() > 1 {
            segments.last().map(|s| s.to_string())
        } else {
            None
        };

        Some(AddressParts {
            address: Some(remainder.to_string()),
            locality,
            city: None,
            state: Gazetteer::find_state_in_text(remainder).map(str::to_string),
            pincode: Self::first_pincode(remainder),
        })
    }

    fn address_ending_at_pincode(lines: &[&str], text: &str) -> Option<AddressParts> {
        let (pin_idx, pincode) = lines
            .iter()
            .enumerate()
            .find_map(|(i, l)| Self::first_pincode(l).map(|pin| (i, pin)))?;

        let start = pin_idx.saturating_sub(4);
        let address = lines[start..=pin_idx].join(", ");
        let locality = pin_idx
            .checked_sub(1)
            .map(|prev| lines[prev].to_string());
        let city = lines.iter().find_map(|l| {
            DISTRICT_LABEL
                .captures(l)
                .and_then(|c| c.get(1))
                .map(|m| {
                    m.as_str()
                        .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '-' | '.'))
                        .to_string()
                })
                .filter(|city| !city.is_empty())
        });

        let mut state = Gazetteer::find_state_in_text(text).map(str::to_string);
        if state.is_none() {
            state = city
                .as_deref()
                .filter(|c| c.chars().count() >= 3)
                .and_then(|c| Gazetteer::fuzzy_match_district(c, None).state)
                .map(str::to_string);
        }

        Some(AddressParts {
            address: Some(address),
            locality,
            city,
            state,
            pincode: Some(pincode),
        })
    }

    fn leading_lines_address(lines: &[&str]) -> AddressParts {
        let address = if lines.is_empty() {
            None
        } else {
            Some(lines.iter().take(3).copied().collect::<Vec<_>>().join(", "))
        };
        AddressParts {
            address,
            ..AddressParts::default()
        }
    }

    fn first_pincode(text: &str) -> Option<String> {
        PINCODE
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn lines(text: &str) -> Vec<&str> {
        text.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
    }
}
