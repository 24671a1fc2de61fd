//! Turning a finished token sequence back into audio.

use std::path::Path;
use std::sync::Arc;

use audio_codec::wav::{self, DEFAULT_FADE_MS};
use generation::StopReason;
use tracing::{debug, instrument, warn};
use tts_core::{AudioCodec, ControlToken, TokenKind, TokenLayout, TtsError, TtsResult, Waveform};

/// Audio produced by one synthesis call.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub waveform: Waveform,
    /// Codec codes that were decoded, in order.
    pub codes: Vec<u32>,
    pub stop_reason: StopReason,
    /// Sampling steps taken, including a terminal EOS.
    pub steps: usize,
}

impl Synthesis {
    /// Write the waveform as a 16-bit WAV file.
    pub fn save(&self, path: impl AsRef<Path>) -> TtsResult<()> {
        wav::write_wav(path, &self.waveform)
    }

    /// The waveform as an in-memory WAV file.
    pub fn wav_bytes(&self) -> TtsResult<Vec<u8>> {
        wav::wav_bytes(&self.waveform)
    }

    pub fn duration_secs(&self) -> f32 {
        self.waveform.duration_ms() / 1000.0
    }
}

/// Extracts the generated acoustic span and decodes it.
#[derive(Clone)]
pub struct OutputAssembler {
    layout: TokenLayout,
    codec: Arc<dyn AudioCodec>,
    fade_ms: f32,
}

impl std::fmt::Debug for OutputAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputAssembler")
            .field("sample_rate", &self.codec.sample_rate())
            .field("fade_ms", &self.fade_ms)
            .finish()
    }
}

impl OutputAssembler {
    pub fn new(layout: TokenLayout, codec: Arc<dyn AudioCodec>) -> Self {
        Self {
            layout,
            codec,
            fade_ms: DEFAULT_FADE_MS,
        }
    }

    /// Edge fade length; zero disables it.
    pub fn with_fade_ms(mut self, fade_ms: f32) -> Self {
        self.fade_ms = fade_ms.max(0.0);
        self
    }

    /// Codec codes generated after the prompt's generation-start marker.
    ///
    /// The prompt carries exactly one marker, so the span starts at the first
    /// one. A terminal end-of-generation token is excluded. Other non-acoustic
    /// tokens in the span, repeated markers included, are dropped with a warning.
    pub fn acoustic_codes(&self, tokens: &[u32]) -> TtsResult<Vec<u32>> {
        let start_id = self.layout.control_id(ControlToken::GenerationStart);
        let start = tokens
            .iter()
            .position(|&t| t == start_id)
            .ok_or_else(|| TtsError::invalid_token("sequence has no generation-start marker"))?;

        let mut span = &tokens[start + 1..];
        if let [rest @ .., last] = span {
            if *last == self.layout.control_id(ControlToken::EndOfGeneration) {
                span = rest;
            }
        }

        let mut dropped = 0usize;
        let codes: Vec<u32> = span
            .iter()
            .filter_map(|&id| match self.layout.classify(id) {
                Some(TokenKind::Acoustic(code)) => Some(code),
                _ => {
                    dropped += 1;
                    None
                }
            })
            .collect();
        if dropped > 0 {
            warn!(dropped, kept = codes.len(), "dropped non-acoustic tokens from output");
        }
        Ok(codes)
    }

    /// Decode the acoustic span of a finished sequence.
    ///
    /// Fails with `EmptyGeneration` when the span holds no acoustic tokens.
    #[instrument(skip(self, tokens), fields(num_tokens = tokens.len()))]
    pub fn assemble(&self, tokens: &[u32]) -> TtsResult<(Waveform, Vec<u32>)> {
        let codes = self.acoustic_codes(tokens)?;
        if codes.is_empty() {
            return Err(TtsError::EmptyGeneration);
        }

        let decoded = self.codec.decode(&codes)?;
        let rate = decoded.sample_rate();
        let mut samples = decoded.samples().to_vec();
        wav::apply_fade_in(&mut samples, self.fade_ms, rate);
        wav::apply_fade_out(&mut samples, self.fade_ms, rate);

        debug!(codes = codes.len(), samples = samples.len(), "decoded output");
        Ok((Waveform::new(samples, rate), codes))
    }
}
