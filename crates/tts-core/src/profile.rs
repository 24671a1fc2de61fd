//! Speaker profiles: a reusable voice reference for prompting.
//!
//! A profile is built once, validated on construction, and immutable
//! afterwards. The persisted form is a versioned JSON record.

use serde::{Deserialize, Serialize};

use crate::error::{TtsError, TtsResult};
use crate::token::{TokenKind, TokenLayout};
use crate::types::Lang;

/// Version written into every persisted profile.
pub const PROFILE_FORMAT_VERSION: u32 = 1;

/// A word and the inclusive range of acoustic tokens it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordSpan {
    pub word: String,
    /// First acoustic token index (inclusive).
    pub start: usize,
    /// Last acoustic token index (inclusive).
    pub end: usize,
}

impl WordSpan {
    pub fn new(word: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            word: word.into(),
            start,
            end,
        }
    }

    /// Number of acoustic tokens in the span.
    pub fn token_count(&self) -> usize {
        self.end + 1 - self.start
    }
}

/// Reference voice: transcript tokens, acoustic tokens and word timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerProfile {
    language: Lang,
    transcript: String,
    text_tokens: Vec<u32>,
    acoustic_tokens: Vec<u32>,
    words: Vec<WordSpan>,
}

impl SpeakerProfile {
    /// Create a profile, checking the word-alignment invariants.
    pub fn new(
        language: Lang,
        transcript: impl Into<String>,
        text_tokens: Vec<u32>,
        acoustic_tokens: Vec<u32>,
        words: Vec<WordSpan>,
    ) -> TtsResult<Self> {
        let profile = Self {
            language,
            transcript: transcript.into(),
            text_tokens,
            acoustic_tokens,
            words,
        };
        profile.check_alignment()?;
        Ok(profile)
    }

    pub fn language(&self) -> Lang {
        self.language
    }

    /// Normalized transcript of the reference recording.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn text_tokens(&self) -> &[u32] {
        &self.text_tokens
    }

    pub fn acoustic_tokens(&self) -> &[u32] {
        &self.acoustic_tokens
    }

    pub fn words(&self) -> &[WordSpan] {
        &self.words
    }

    /// Number of tokens the profile adds to a prompt, excluding markers.
    pub fn token_count(&self) -> usize {
        self.text_tokens.len() + self.acoustic_tokens.len()
    }

    /// Duration of the reference audio at the given token rate.
    pub fn duration_secs(&self, tokens_per_second: u32) -> f32 {
        if tokens_per_second == 0 {
            return 0.0;
        }
        self.acoustic_tokens.len() as f32 / tokens_per_second as f32
    }

    /// Check every token against the vocabulary it is supposed to belong to.
    pub fn validate_tokens(&self, layout: &TokenLayout) -> TtsResult<()> {
        for &id in &self.text_tokens {
            if !matches!(layout.classify(id), Some(TokenKind::Text(_))) {
                return Err(TtsError::invalid_token(format!(
                    "profile text token {id} is not a text token"
                )));
            }
        }
        for &id in &self.acoustic_tokens {
            if !matches!(layout.classify(id), Some(TokenKind::Acoustic(_))) {
                return Err(TtsError::invalid_token(format!(
                    "profile acoustic token {id} is not an acoustic token"
                )));
            }
        }
        Ok(())
    }

    fn check_alignment(&self) -> TtsResult<()> {
        if self.acoustic_tokens.is_empty() {
            return Err(TtsError::invalid_token("profile has no acoustic tokens"));
        }
        if self.words.is_empty() {
            return Err(TtsError::alignment("profile has no aligned words"));
        }

        let len = self.acoustic_tokens.len();
        let mut next_free = 0usize;
        for (i, span) in self.words.iter().enumerate() {
            if span.start > span.end {
                return Err(TtsError::alignment(format!(
                    "word {i} ({:?}) starts after it ends: {} > {}",
                    span.word, span.start, span.end
                )));
            }
            if span.start < next_free {
                return Err(TtsError::alignment(format!(
                    "word {i} ({:?}) overlaps the previous word",
                    span.word
                )));
            }
            if span.end >= len {
                return Err(TtsError::alignment(format!(
                    "word {i} ({:?}) ends at {} beyond {len} acoustic tokens",
                    span.word, span.end
                )));
            }
            next_free = span.end + 1;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct ProfileRecord {
    version: u32,
    language: Lang,
    transcript: String,
    text_tokens: Vec<u32>,
    acoustic_tokens: Vec<u32>,
    words: Vec<WordSpan>,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

/// Serialize a profile into its persisted JSON form.
pub fn serialize(profile: &SpeakerProfile) -> TtsResult<Vec<u8>> {
    let record = ProfileRecord {
        version: PROFILE_FORMAT_VERSION,
        language: profile.language,
        transcript: profile.transcript.clone(),
        text_tokens: profile.text_tokens.clone(),
        acoustic_tokens: profile.acoustic_tokens.clone(),
        words: profile.words.clone(),
    };
    serde_json::to_vec_pretty(&record)
        .map_err(|e| TtsError::serialization(format!("failed to encode profile: {e}")))
}

/// Parse a persisted profile, rejecting unknown versions and broken invariants.
pub fn deserialize(bytes: &[u8]) -> TtsResult<SpeakerProfile> {
    let header: VersionHeader = serde_json::from_slice(bytes)
        .map_err(|e| TtsError::serialization(format!("malformed profile: {e}")))?;
    if header.version != PROFILE_FORMAT_VERSION {
        return Err(TtsError::serialization(format!(
            "unsupported profile version {}, expected {PROFILE_FORMAT_VERSION}",
            header.version
        )));
    }

    let record: ProfileRecord = serde_json::from_slice(bytes)
        .map_err(|e| TtsError::serialization(format!("malformed profile: {e}")))?;

    SpeakerProfile::new(
        record.language,
        record.transcript,
        record.text_tokens,
        record.acoustic_tokens,
        record.words,
    )
    .map_err(|e| TtsError::serialization(format!("invalid profile contents: {e}")))
}
