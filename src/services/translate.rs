use log::{debug, warn};
use whatlang::Lang;

use crate::config::TranslationSettings;
use crate::models::{FieldMap, SideTranslation};
use crate::utils::{redact_identifiers_in_text, Result};

/// Machine translation into English.
pub trait Translator: Send + Sync {
    fn translate(&self, text: &str) -> Result<String>;
}

/// Returns its input unchanged. Used when no translation backend is configured.
pub struct PassthroughTranslator;

impl Translator for PassthroughTranslator {
    fn translate(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

/// Best-effort translation: input is cut to `max_chars`, and any failure or
/// empty result yields the original text.
pub fn translate_or_passthrough(
    translator: &dyn Translator,
    text: &str,
    max_chars: usize,
) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }
    let input: String = text.chars().take(max_chars).collect();
    match translator.translate(&input) {
        Ok(translated) if !translated.trim().is_empty() => translated,
        Ok(_) => text.to_string(),
        Err(e) => {
            warn!("Translation failed, keeping original text: {}", e);
            text.to_string()
        }
    }
}

pub fn detect_language(text: &str) -> Option<Lang> {
    whatlang::detect(text).map(|info| info.lang())
}

/// Language detection plus translation of one side's text and address fields.
pub struct TranslationService {
    translator: Box<dyn Translator>,
    settings: TranslationSettings,
}

impl TranslationService {
    pub fn new(translator: Box<dyn Translator>, settings: TranslationSettings) -> Self {
        TranslationService {
            translator,
            settings,
        }
    }

    pub fn translate_side(&self, text: Option<&str>, fields: &FieldMap) -> SideTranslation {
        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            return SideTranslation::default();
        };

        let language = detect_language(text);
        let mut translation = SideTranslation {
            detected_language: language.map(|lang| lang.code().to_string()),
            ..SideTranslation::default()
        };

        if !self.settings.enabled || language == Some(Lang::Eng) {
            debug!("Skipping translation for {:?}", language);
            return translation;
        }

        let translate = |value: &str| {
            translate_or_passthrough(&*self.translator, value, self.settings.max_chars)
        };
        translation.full_text = Some(translate(redact_identifiers_in_text(text).as_str()));
        translation.address = fields.address.as_deref().map(translate);
        translation.locality = fields.locality.as_deref().map(translate);
        translation.city = fields.city.as_deref().map(translate);
        translation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ExtractionError;
    use std::sync::Mutex;

    struct Failing;

    impl Translator for Failing {
        fn translate(&self, _text: &str) -> Result<String> {
            Err(ExtractionError::Translation("service unavailable".to_string()))
        }
    }

    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    impl Translator for Recording {
        fn translate(&self, text: &str) -> Result<String> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(format!("EN[{}]", text))
        }
    }

    const HINDI: &str = "मेरा नाम आशा देवी है और मैं केरल में रहती हूँ। यह मेरा पता है।";

    #[test]
    fn test_failure_returns_original() {
        assert_eq!(translate_or_passthrough(&Failing, "नमस्ते", 5000), "नमस्ते");
    }

    #[test]
    fn test_input_truncated() {
        let recorder = Recording {
            seen: Mutex::new(Vec::new()),
        };
        translate_or_passthrough(&recorder, "abcdefgh", 3);
        assert_eq!(recorder.seen.lock().unwrap().as_slice(), ["abc"]);
    }

    #[test]
    fn test_empty_result_returns_original() {
        struct Empty;
        impl Translator for Empty {
            fn translate(&self, _text: &str) -> Result<String> {
                Ok("  ".to_string())
            }
        }
        assert_eq!(translate_or_passthrough(&Empty, "text", 10), "text");
    }

    #[test]
    fn test_english_text_not_translated() {
        let service = TranslationService::new(Box::new(Failing), TranslationSettings::default());
        let side = service.translate_side(
            Some("My name is Asha Devi and I live in the state of Kerala with my family."),
            &FieldMap::default(),
        );
        assert_eq!(side.detected_language.as_deref(), Some("eng"));
        assert_eq!(side.full_text, None);
    }

    #[test]
    fn test_non_english_side_translated() {
        let service = TranslationService::new(
            Box::new(Recording {
                seen: Mutex::new(Vec::new()),
            }),
            TranslationSettings::default(),
        );
        let fields = FieldMap {
            city: Some("कोच्चि".to_string()),
            ..FieldMap::default()
        };
        let side = service.translate_side(Some(HINDI), &fields);
        assert_eq!(side.detected_language.as_deref(), Some("hin"));
        assert_eq!(side.full_text, Some(format!("EN[{}]", HINDI)));
        assert_eq!(side.city.as_deref(), Some("EN[कोच्चि]"));
        assert_eq!(side.address, None);
    }

    #[test]
    fn test_disabled_translation_only_detects() {
        let settings = TranslationSettings {
            enabled: false,
            ..TranslationSettings::default()
        };
        let service = TranslationService::new(Box::new(PassthroughTranslator), settings);
        let side = service.translate_side(Some(HINDI), &FieldMap::default());
        assert_eq!(side.detected_language.as_deref(), Some("hin"));
        assert_eq!(side.full_text, None);
        assert_eq!(service.translate_side(None, &FieldMap::default()), SideTranslation::default());
    }
}
