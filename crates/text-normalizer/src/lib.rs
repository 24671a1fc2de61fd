//! # text-normalizer
//!
//! Text normalization pipeline for the TTS engine.
//!
//! Raw input is turned into a list of lowercase, punctuation-free words that
//! the tokenizer and the forced aligner both consume. The pipeline handles:
//! - Unicode cleanup (typographic quotes, dashes, full-width forms)
//! - English symbols and numbers (cardinal, ordinal, decimal)
//! - Romanization of kana and Hangul
//! - Word segmentation for Japanese and Chinese
//!
//! # Example
//!
//! ```
//! use text_normalizer::Normalizer;
//! use tts_core::{Lang, TextNormalizer};
//!
//! let normalizer = Normalizer::new();
//! let result = normalizer.normalize("I have 2 cats!", Some(Lang::En)).unwrap();
//! assert_eq!(result.words, vec!["i", "have", "two", "cats"]);
//! ```

pub mod num2words;
pub mod romanize;
mod rules;

use tracing::{debug, instrument};
use tts_core::{Lang, NormText, TextNormalizer, TtsError, TtsResult};

pub use rules::{
    NumberRule, PunctuationRule, RomanizationRule, Rule, SegmentationRule, SymbolRule,
    UnicodeCleanupRule, WhitespaceRule,
};

/// Text normalizer with configurable rule pipeline.
#[derive(Debug)]
pub struct Normalizer {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// Create a new normalizer with default rules.
    pub fn new() -> Self {
        Self {
            rules: rules::default_rules(),
        }
    }

    /// Create a normalizer with custom rules.
    pub fn with_rules(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    /// Add a rule to the end of the pipeline.
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    /// Names of the rules in application order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

/// Guess the language from the script of the input.
///
/// Any kana means Japanese (Japanese text mixes kana with Han characters);
/// otherwise the most frequent of Hangul, Han and Latin letters wins, with
/// ties going to English.
pub fn detect_language(input: &str) -> Lang {
    let mut hangul = 0usize;
    let mut han = 0usize;
    let mut latin = 0usize;

    for c in input.chars() {
        if romanize::is_kana(c) {
            return Lang::Ja;
        }
        if romanize::is_hangul_syllable(c) || is_hangul_jamo(c) {
            hangul += 1;
        } else if is_han(c) {
            han += 1;
        } else if c.is_ascii_alphabetic() {
            latin += 1;
        }
    }

    if hangul > han && hangul > latin {
        Lang::Ko
    } else if han > hangul && han > latin {
        Lang::Zh
    } else {
        Lang::En
    }
}

fn is_hangul_jamo(c: char) -> bool {
    matches!(c, '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}')
}

fn is_han(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}')
}

impl TextNormalizer for Normalizer {
    #[instrument(skip(self, input), fields(input_len = input.len()))]
    fn normalize(&self, input: &str, lang_hint: Option<Lang>) -> TtsResult<NormText> {
        if input.trim().is_empty() {
            return Err(TtsError::normalization("empty input text"));
        }

        let lang = lang_hint.unwrap_or_else(|| detect_language(input));
        let mut text = input.to_string();

        for rule in &self.rules {
            if rule.applies_to(lang) {
                text = rule.apply(&text, lang)?;
            }
        }

        let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        if words.is_empty() {
            return Err(TtsError::normalization(format!(
                "no speakable words in {input:?}"
            )));
        }

        debug!(lang = %lang, words = words.len(), "normalized text");
        Ok(NormText::from_words(words, lang))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizer_creation() {
        let normalizer = Normalizer::new();
        assert_eq!(normalizer.rule_names().first(), Some(&"unicode_cleanup"));
        assert_eq!(normalizer.rule_names().last(), Some(&"whitespace"));
    }

    #[test]
    fn test_language_detection() {
        assert_eq!(detect_language("Hello world"), Lang::En);
        assert_eq!(detect_language("こんにちは世界"), Lang::Ja);
        assert_eq!(detect_language("東京タワー"), Lang::Ja);
        assert_eq!(detect_language("안녕하세요"), Lang::Ko);
        assert_eq!(detect_language("你好世界"), Lang::Zh);
        assert_eq!(detect_language("1234"), Lang::En);
    }

    #[test]
    fn test_empty_input_error() {
        let normalizer = Normalizer::new();
        assert!(matches!(
            normalizer.normalize("", None),
            Err(TtsError::Normalization(_))
        ));
        assert!(normalizer.normalize("   ", None).is_err());
        assert!(normalizer.normalize("?!...", Some(Lang::En)).is_err());
    }

    #[test]
    fn test_basic_normalization() {
        let normalizer = Normalizer::new();
        let result = normalizer.normalize("Hello,   World!", None).unwrap();
        assert_eq!(result.lang, Lang::En);
        assert_eq!(result.words, vec!["hello", "world"]);
        assert_eq!(result.text, "hello world");
    }

    #[test]
    fn test_custom_rules() {
        let normalizer = Normalizer::with_rules(vec![Box::new(WhitespaceRule)]);
        let result = normalizer.normalize(" A  b ", Some(Lang::En)).unwrap();
        assert_eq!(result.words, vec!["A", "b"]);
    }
}
