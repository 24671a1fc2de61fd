//! Speaker profile construction and persistence.

use std::path::Path;
use std::sync::Arc;

use forced_aligner::{ForcedAligner, WordBoundary};
use text_tokenizer::TextEncoder;
use tracing::{debug, info, instrument};
use tts_core::profile;
use tts_core::{
    AudioCodec, Lang, SpeakerProfile, TokenLayout, Transcriber, TtsError, TtsResult, Waveform,
    WordSpan,
};

/// Builds a [`SpeakerProfile`] from a reference recording.
///
/// Stages run in order and every failure is wrapped in
/// `TtsError::SpeakerProfile` naming the stage, with the original error as
/// its source.
#[derive(Clone)]
pub struct SpeakerProfileBuilder {
    codec: Arc<dyn AudioCodec>,
    aligner: ForcedAligner,
    encoder: TextEncoder,
    transcriber: Option<Arc<dyn Transcriber>>,
}

impl std::fmt::Debug for SpeakerProfileBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeakerProfileBuilder")
            .field("aligner", &self.aligner)
            .field("transcriber", &self.transcriber.is_some())
            .finish()
    }
}

impl SpeakerProfileBuilder {
    pub fn new(codec: Arc<dyn AudioCodec>, aligner: ForcedAligner, encoder: TextEncoder) -> Self {
        Self {
            codec,
            aligner,
            encoder,
            transcriber: None,
        }
    }

    /// Transcriber used when no transcript is supplied.
    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn layout(&self) -> &TokenLayout {
        self.encoder.layout()
    }

    /// Build a profile from a recording and its transcript.
    ///
    /// Without a transcript the configured transcriber is asked for one.
    #[instrument(skip(self, waveform, transcript), fields(samples = waveform.num_samples(), lang = %lang, transcribe = transcript.is_none()))]
    pub fn build(
        &self,
        waveform: &Waveform,
        transcript: Option<&str>,
        lang: Lang,
    ) -> TtsResult<SpeakerProfile> {
        let transcript = match transcript {
            Some(t) => t.to_string(),
            None => self
                .transcribe(waveform)
                .map_err(|e| TtsError::speaker_profile("transcription", e))?,
        };

        let codes = self
            .codec
            .encode(waveform)
            .map_err(|e| TtsError::speaker_profile("audio encoding", e))?;
        let layout = self.encoder.layout();
        let acoustic_tokens = codes
            .iter()
            .map(|&c| layout.acoustic_token(c))
            .collect::<TtsResult<Vec<u32>>>()
            .map_err(|e| TtsError::speaker_profile("audio encoding", e))?;

        let norm = self
            .encoder
            .normalize(&transcript, Some(lang))
            .map_err(|e| TtsError::speaker_profile("normalization", e))?;

        let alignment = self
            .aligner
            .align(waveform, &norm.text)
            .map_err(|e| TtsError::speaker_profile("alignment", e))?;
        let words = word_spans(
            &alignment.words,
            acoustic_tokens.len(),
            self.codec.tokens_per_second(),
        )
        .map_err(|e| TtsError::speaker_profile("alignment", e))?;

        let text_tokens = self
            .encoder
            .encode_normalized(&norm)
            .map_err(|e| TtsError::speaker_profile("text encoding", e))?;

        let profile = SpeakerProfile::new(lang, norm.text, text_tokens, acoustic_tokens, words)
            .map_err(|e| TtsError::speaker_profile("assembly", e))?;

        info!(
            words = profile.words().len(),
            acoustic_tokens = profile.acoustic_tokens().len(),
            confidence = alignment.confidence,
            "speaker profile built"
        );
        Ok(profile)
    }

    fn transcribe(&self, waveform: &Waveform) -> TtsResult<String> {
        let transcriber = self
            .transcriber
            .as_ref()
            .ok_or_else(|| TtsError::transcription("no transcript given and no transcriber set"))?;
        let text = transcriber.transcribe(waveform)?;
        if text.trim().is_empty() {
            return Err(TtsError::transcription("transcriber returned empty text"));
        }
        debug!(chars = text.len(), "transcribed reference audio");
        Ok(text)
    }
}

/// Map time boundaries onto inclusive acoustic-token spans.
///
/// Each word ends at the token boundary nearest its aligned end time. Spans
/// are contiguous, start at 0, end at `num_tokens - 1`, and each holds at
/// least one token.
pub fn word_spans(
    boundaries: &[WordBoundary],
    num_tokens: usize,
    tokens_per_second: f32,
) -> TtsResult<Vec<WordSpan>> {
    let n = boundaries.len();
    if n == 0 {
        return Err(TtsError::alignment("no words to place"));
    }
    if n > num_tokens {
        return Err(TtsError::alignment(format!(
            "{n} words do not fit into {num_tokens} acoustic tokens"
        )));
    }

    let mut spans = Vec::with_capacity(n);
    let mut start = 0usize;
    for (i, b) in boundaries.iter().enumerate() {
        let end = if i + 1 == n {
            num_tokens - 1
        } else {
            let cut = (b.end_secs * tokens_per_second).round().max(0.0) as usize;
            // Leave one token for every remaining word.
            cut.saturating_sub(1).clamp(start, num_tokens - n + i)
        };
        spans.push(WordSpan::new(b.word.clone(), start, end));
        start = end + 1;
    }
    Ok(spans)
}

/// Write a profile to disk in its persisted JSON form.
pub fn save_speaker(profile: &SpeakerProfile, path: impl AsRef<Path>) -> TtsResult<()> {
    let bytes = profile::serialize(profile)?;
    std::fs::write(path.as_ref(), bytes)?;
    Ok(())
}

/// Read a persisted profile from disk.
pub fn load_speaker(path: impl AsRef<Path>) -> TtsResult<SpeakerProfile> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| TtsError::ModelLoad {
        path: path.to_path_buf(),
        source: e,
    })?;
    profile::deserialize(&bytes)
}
