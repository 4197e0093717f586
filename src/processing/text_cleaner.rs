use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Issuer and slogan phrases printed on every card
    static ref BOILERPLATE_PHRASES: Vec<Regex> = vec![
        Regex::new(r"(?i)unique\s+identification\s+authority\s+of\s+india").unwrap(),
        Regex::new(r"(?i)government\s+of\s+india").unwrap(),
        Regex::new(r"(?i)\buidai\b").unwrap(),
        Regex::new(r"(?i)aam\s+aadmi\s+ka\s+adhikar").unwrap(),
        Regex::new(r"(?i)mera\s+aadhaa?r,?\s+meri\s+pehchaa?n").unwrap(),
        Regex::new(r"(?i)\benrol?ment\s+no\.?").unwrap(),
    ];

    // Lines dropped whole: web, email, helpline and postal-box footers
    static ref BOILERPLATE_LINES: Vec<Regex> = vec![
        Regex::new(r"(?i)\bwww\.|https?://|\.gov\.in\b").unwrap(),
        Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9-]+\.[a-z]").unwrap(),
        Regex::new(r"(?i)\bhelp(?:line)?\b|\btoll[\s-]?free\b|\bcontact\b").unwrap(),
        Regex::new(r"\b1800[\s-]?\d{3}[\s-]?\d{3,4}\b").unwrap(),
        Regex::new(r"(?i)\bp\.?\s?o\.?\s+box\b").unwrap(),
    ];

    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Removes printed boilerplate and footer/logo noise from recognized text.
///
/// Cleaning is idempotent: cleaning already-cleaned text returns it unchanged.
pub struct TextCleaner;

impl TextCleaner {
    pub fn clean(text: &str) -> String {
        text.lines()
            .filter_map(Self::clean_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn clean_line(line: &str) -> Option<String> {
        let mut current = line.to_string();
        loop {
            let mut next = current.clone();
            for pattern in BOILERPLATE_PHRASES.iter() {
                next = pattern.replace_all(&next, " ").into_owned();
            }
            if next == current {
                break;
            }
            current = next;
        }

        if BOILERPLATE_LINES.iter().any(|p| p.is_match(&current)) {
            return None;
        }

        let collapsed = WHITESPACE.replace_all(current.trim(), " ").into_owned();
        if Self::is_noise_line(&collapsed) {
            None
        } else {
            Some(collapsed)
        }
    }

    /// Short lines, email-ish or dotted runs, and lines that are mostly symbols.
    pub fn is_noise_line(line: &str) -> bool {
        let total = line.chars().count();
        if total < 3 {
            return true;
        }
        if line.matches('@').count() > 1 || line.matches('.').count() > 3 {
            return true;
        }
        let alnum = line.chars().filter(|c| c.is_alphanumeric()).count();
        (alnum as f32) / (total as f32) < 0.3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issuer_lines_removed() {
        let raw = "GOVERNMENT OF INDIA\nAsha Devi\nDOB: 12/05/1990\nwww.uidai.gov.in\nHelpline: 1800-300-1947";
        assert_eq!(TextCleaner::clean(raw), "Asha Devi\nDOB: 12/05/1990");
    }

    #[test]
    fn test_phrase_stripped_from_mixed_line() {
        let raw = "Unique Identification Authority of India   Address: 4 MG Road";
        assert_eq!(TextCleaner::clean(raw), "Address: 4 MG Road");
    }

    #[test]
    fn test_noise_lines_dropped() {
        assert!(TextCleaner::is_noise_line("ab"));
        assert!(TextCleaner::is_noise_line("~~~ -- || ~~"));
        assert!(TextCleaner::is_noise_line("a.b.c.d.e"));
        assert!(TextCleaner::is_noise_line("x@y @z"));
        assert!(!TextCleaner::is_noise_line("Ravi Kumar"));
    }

    #[test]
    fn test_email_line_dropped() {
        assert_eq!(TextCleaner::clean("Ravi Kumar\nhelp@uidai.gov.in"), "Ravi Kumar");
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let raw = "Government of India\n  Ravi   Kumar \nFather: Mohan Lal, \n@@@\nS/O Mohan, Kochi 682001\n";
        let once = TextCleaner::clean(raw);
        assert_eq!(TextCleaner::clean(&once), once);
        assert_eq!(once, "Ravi Kumar\nFather: Mohan Lal,\nS/O Mohan, Kochi 682001");
    }
}
