//! Core data types for the TTS pipeline.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::TtsError;

/// Supported languages for TTS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    /// English.
    #[default]
    En,
    /// Japanese.
    Ja,
    /// Korean.
    Ko,
    /// Chinese.
    Zh,
}

impl Lang {
    /// All supported languages.
    pub const ALL: [Lang; 4] = [Lang::En, Lang::Ja, Lang::Ko, Lang::Zh];

    /// Lowercase language code.
    pub fn code(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Ja => "ja",
            Lang::Ko => "ko",
            Lang::Zh => "zh",
        }
    }

    /// Whether the script of this language is written with Latin letters.
    pub fn is_latin_script(&self) -> bool {
        matches!(self, Lang::En)
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Lang {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Lang::En),
            "ja" | "japanese" => Ok(Lang::Ja),
            "ko" | "korean" => Ok(Lang::Ko),
            "zh" | "chinese" => Ok(Lang::Zh),
            other => Err(TtsError::config(format!(
                "unsupported language: {other}, expected one of: en, ja, ko, zh"
            ))),
        }
    }
}

/// Normalized text split into words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormText {
    /// The normalized text, words joined by single spaces.
    pub text: String,
    /// Detected or specified language.
    pub lang: Lang,
    /// Words in reading order.
    pub words: Vec<String>,
}

impl NormText {
    /// Create normalized text from a list of words.
    pub fn from_words(words: Vec<String>, lang: Lang) -> Self {
        Self {
            text: words.join(" "),
            lang,
            words,
        }
    }

    /// Check if there are no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Token sequence with offset mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSeq {
    /// Token IDs.
    pub ids: Vec<u32>,
    /// Byte offsets mapping tokens to normalized text positions.
    pub offsets: Vec<(usize, usize)>,
}

impl TokenSeq {
    /// Create a new token sequence.
    pub fn new(ids: Vec<u32>, offsets: Vec<(usize, usize)>) -> Self {
        Self { ids, offsets }
    }

    /// Create an empty token sequence.
    pub fn empty() -> Self {
        Self {
            ids: Vec::new(),
            offsets: Vec::new(),
        }
    }

    /// Get the number of tokens.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Mono PCM waveform.
///
/// Immutable once created; clones share the sample buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl Waveform {
    /// Create a new waveform.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    /// PCM samples (f32, mono).
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of samples.
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    /// Check if the waveform has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the duration in milliseconds.
    pub fn duration_ms(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32 * 1000.0
    }

    /// Root-mean-square level of the whole waveform.
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = self.samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum_sq / self.samples.len() as f64).sqrt() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_display_and_parse() {
        assert_eq!(Lang::En.to_string(), "en");
        assert_eq!(Lang::Zh.to_string(), "zh");
        assert_eq!("JA".parse::<Lang>().unwrap(), Lang::Ja);
        assert_eq!(" korean ".parse::<Lang>().unwrap(), Lang::Ko);
        assert!("xx".parse::<Lang>().is_err());
    }

    #[test]
    fn test_lang_serde_lowercase() {
        let json = serde_json::to_string(&Lang::Ko).unwrap();
        assert_eq!(json, "\"ko\"");
        let lang: Lang = serde_json::from_str("\"zh\"").unwrap();
        assert_eq!(lang, Lang::Zh);
    }

    #[test]
    fn test_norm_text_from_words() {
        let text = NormText::from_words(vec!["hello".into(), "world".into()], Lang::En);
        assert_eq!(text.text, "hello world");
        assert!(!text.is_empty());
    }

    #[test]
    fn test_token_seq() {
        let seq = TokenSeq::new(vec![1, 2, 3], vec![(0, 1), (1, 2), (2, 3)]);
        assert_eq!(seq.len(), 3);
        assert!(!seq.is_empty());
        assert!(TokenSeq::empty().is_empty());
    }

    #[test]
    fn test_waveform() {
        let wav = Waveform::new(vec![0.5; 24000], 24000);
        assert_eq!(wav.num_samples(), 24000);
        assert_eq!(wav.duration_ms(), 1000.0);
        assert!((wav.rms() - 0.5).abs() < 1e-6);

        let shared = wav.clone();
        assert_eq!(shared, wav);
    }

    #[test]
    fn test_waveform_zero_rate_duration() {
        let wav = Waveform::new(vec![0.1; 10], 0);
        assert_eq!(wav.duration_ms(), 0.0);
    }
}
