use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::regions::REGIONS;

lazy_static! {
    // Whole-word, case-insensitive pattern per state, in table order.
    static ref STATE_WORD_PATTERNS: Vec<(&'static str, Regex)> = REGIONS
        .iter()
        .map(|(state, _)| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(state));
            (*state, Regex::new(&pattern).unwrap())
        })
        .collect();
}

/// State/district pair from a district lookup. Both names are table entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegionMatch {
    pub state: Option<&'static str>,
    pub district: Option<&'static str>,
}

/// Read-only lookup over the static state -> district table.
pub struct Gazetteer;

impl Gazetteer {
    pub fn states() -> impl Iterator<Item = &'static str> {
        REGIONS.iter().map(|(state, _)| *state)
    }

    pub fn districts_for_state(state: &str) -> &'static [&'static str] {
        let state = state.trim();
        REGIONS
            .iter()
            .find(|(name, _)| *name == state)
            .map(|(_, districts)| *districts)
            .unwrap_or(&[])
    }

    pub fn validate_state(state: &str) -> bool {
        let state = state.trim();
        REGIONS.iter().any(|(name, _)| *name == state)
    }

    pub fn validate_district(district: &str, state: &str) -> bool {
        let district = district.trim();
        Self::districts_for_state(state).iter().any(|d| *d == district)
    }

    /// Exact case-insensitive match first, then the first state (in table
    /// order) that starts with or contains the input.
    pub fn fuzzy_match_state(input: &str) -> Option<&'static str> {
        let needle = input.trim().to_uppercase();
        if needle.is_empty() {
            return None;
        }

        Self::states()
            .find(|state| state.to_uppercase() == needle)
            .or_else(|| {
                Self::states().find(|state| {
                    let upper = state.to_uppercase();
                    upper.starts_with(&needle) || upper.contains(&needle)
                })
            })
    }

    /// Exact-or-prefix district match. A valid `state` is searched first,
    /// then every state in table order.
    pub fn fuzzy_match_district(input: &str, state: Option<&str>) -> RegionMatch {
        let needle = input.trim().to_uppercase();
        if needle.is_empty() {
            return RegionMatch::default();
        }
        let matches = |district: &&&str| {
            let upper = district.to_uppercase();
            upper == needle || upper.starts_with(&needle)
        };

        if let Some(state) = state.map(str::trim) {
            if let Some((name, districts)) = REGIONS.iter().find(|(name, _)| *name == state) {
                if let Some(district) = districts.iter().find(matches) {
                    return RegionMatch {
                        state: Some(*name),
                        district: Some(*district),
                    };
                }
            }
        }

        REGIONS
            .iter()
            .find_map(|(name, districts)| {
                districts.iter().find(matches).map(|district| RegionMatch {
                    state: Some(*name),
                    district: Some(*district),
                })
            })
            .unwrap_or_default()
    }

    /// Finds a state named anywhere in free text: whole-word mention first,
    /// then a fuzzy match of each individual line.
    pub fn find_state_in_text(text: &str) -> Option<&'static str> {
        STATE_WORD_PATTERNS
            .iter()
            .find(|(_, pattern)| pattern.is_match(text))
            .map(|(state, _)| *state)
            .or_else(|| {
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .find_map(Self::fuzzy_match_state)
            })
    }
}
