//! Trait definitions for TTS pipeline components.

use crate::error::TtsResult;
use crate::types::{Lang, NormText, TokenSeq, Waveform};

/// Text normalization trait.
///
/// Implementations convert raw input text into a list of normalized words
/// suitable for tokenization and alignment.
pub trait TextNormalizer: Send + Sync {
    /// Normalize the input text.
    ///
    /// # Arguments
    /// * `input` - Raw input text
    /// * `lang_hint` - Language tag; detected from the script when absent
    fn normalize(&self, input: &str, lang_hint: Option<Lang>) -> TtsResult<NormText>;
}

/// Text tokenization trait.
///
/// Ids returned here are local to the tokenizer's vocabulary; the token
/// layout maps them into the model's id space.
pub trait TextTokenizer: Send + Sync {
    /// Encode normalized text into tokens.
    fn encode(&self, text: &NormText) -> TtsResult<TokenSeq>;

    /// Decode tokens back to text (for debugging).
    fn decode(&self, tokens: &TokenSeq) -> TtsResult<String>;

    /// Get the vocabulary size.
    fn vocab_size(&self) -> usize;
}

/// Audio codec: waveform to discrete codes and back.
///
/// Both directions are deterministic for fixed codec weights. Codes are
/// local codebook indices in `[0, codebook_size)`.
pub trait AudioCodec: Send + Sync {
    /// Encode a waveform into codebook indices.
    fn encode(&self, waveform: &Waveform) -> TtsResult<Vec<u32>>;

    /// Decode codebook indices into a waveform at [`Self::sample_rate`].
    fn decode(&self, codes: &[u32]) -> TtsResult<Waveform>;

    /// Get the codec's sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Get the number of samples per acoustic token.
    fn samples_per_token(&self) -> usize;

    /// Number of distinct codes.
    fn codebook_size(&self) -> usize;

    /// Acoustic tokens per second of audio.
    fn tokens_per_second(&self) -> f32 {
        self.sample_rate() as f32 / self.samples_per_token().max(1) as f32
    }
}

/// Sequence-model backend.
///
/// One implementation per inference runtime. The generation loop depends
/// only on this trait.
pub trait Backend: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Maximum number of tokens the model can condition on.
    fn context_capacity(&self) -> usize;

    /// Logits for the next token, indexed by token id.
    ///
    /// Fails with `ContextOverflow` when `tokens` is longer than
    /// [`Self::context_capacity`] and with `Backend` for anything else.
    fn next_token_logits(&self, tokens: &[u32]) -> TtsResult<Vec<f32>>;
}

/// Speech-to-text collaborator used when a profile has no transcript.
pub trait Transcriber: Send + Sync {
    /// Transcribe a waveform into plain text.
    fn transcribe(&self, waveform: &Waveform) -> TtsResult<String>;
}
