//! # forced-aligner
//!
//! CTC forced alignment of a transcript against a recording.
//!
//! The transcript becomes a blank-interleaved sequence of character states;
//! an [`EmissionModel`] scores every audio frame against the character
//! classes; a Viterbi search finds the best monotonic path through the
//! trellis; the path is grouped into per-word time boundaries.
//!
//! # Example
//!
//! ```
//! use forced_aligner::ForcedAligner;
//! use tts_core::{AlignerConfig, Waveform};
//!
//! // Two voiced bursts separated by a pause.
//! let mut samples = Vec::new();
//! for _ in 0..2 {
//!     samples.extend((0..4800).map(|i| (i as f32 * 0.08).sin() * 0.3));
//!     samples.extend(std::iter::repeat(0.0).take(4800));
//! }
//! let wav = Waveform::new(samples, 16_000);
//!
//! let aligner = ForcedAligner::with_defaults(&AlignerConfig::default()).unwrap();
//! let result = aligner.align(&wav, "hello world").unwrap();
//! assert_eq!(result.words.len(), 2);
//! assert!(result.words[0].end_secs <= result.words[1].start_secs);
//! ```

pub mod emission;
pub mod grouping;
pub mod viterbi;
pub mod vocab;

use std::sync::Arc;

use tracing::{debug, info, instrument};
use tts_core::{AlignerConfig, TtsError, TtsResult, Waveform};

pub use emission::{EmissionModel, Emissions, EnergyEmissionModel};
pub use vocab::{CharVocabulary, TargetSequence};

/// Time boundaries of one transcript word.
#[derive(Debug, Clone, PartialEq)]
pub struct WordBoundary {
    pub word: String,
    /// First frame of the word.
    pub start_frame: usize,
    /// Last frame of the word (inclusive).
    pub end_frame: usize,
    /// Start time in seconds.
    pub start_secs: f32,
    /// End time in seconds (end of the last frame).
    pub end_secs: f32,
}

/// Output of one alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentResult {
    /// One boundary per transcript word, in order.
    pub words: Vec<WordBoundary>,
    /// Mean log-probability of the frames on character states.
    pub confidence: f32,
    /// Number of emission frames.
    pub num_frames: usize,
    /// Frame duration in seconds.
    pub frame_secs: f32,
}

/// CTC forced aligner.
#[derive(Clone)]
pub struct ForcedAligner {
    vocab: CharVocabulary,
    model: Arc<dyn EmissionModel>,
    min_confidence: f32,
}

impl std::fmt::Debug for ForcedAligner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForcedAligner")
            .field("classes", &self.vocab.len())
            .field("min_confidence", &self.min_confidence)
            .finish()
    }
}

impl ForcedAligner {
    pub fn new(vocab: CharVocabulary, model: Arc<dyn EmissionModel>, min_confidence: f32) -> Self {
        Self {
            vocab,
            model,
            min_confidence,
        }
    }

    /// Latin vocabulary with the energy emission model.
    pub fn with_defaults(config: &AlignerConfig) -> TtsResult<Self> {
        Ok(Self::new(
            CharVocabulary::latin(),
            Arc::new(EnergyEmissionModel::new(config)?),
            config.min_confidence,
        ))
    }

    pub fn vocabulary(&self) -> &CharVocabulary {
        &self.vocab
    }

    /// Align a transcript to a waveform.
    ///
    /// Fails with `AlignmentFailed` when the transcript is empty, when the
    /// audio is too short to hold the transcript, or when the best path
    /// scores below the confidence threshold.
    #[instrument(skip(self, waveform, transcript), fields(samples = waveform.num_samples(), words = transcript.split_whitespace().count()))]
    pub fn align(&self, waveform: &Waveform, transcript: &str) -> TtsResult<AlignmentResult> {
        let targets = self.vocab.targets(transcript)?;
        let emissions = self.model.emissions(waveform, &self.vocab)?;
        if let Some(row) = emissions.log_probs.iter().find(|r| r.len() != self.vocab.len()) {
            return Err(TtsError::internal(format!(
                "emission row has {} classes, vocabulary has {}",
                row.len(),
                self.vocab.len()
            )));
        }

        let num_frames = emissions.num_frames();
        let needed = targets.min_frames();
        if num_frames < needed {
            return Err(TtsError::alignment(format!(
                "{num_frames} frames cannot hold a transcript needing {needed}"
            )));
        }

        let path = viterbi::forced_align(&emissions.log_probs, &targets.tokens)
            .ok_or_else(|| TtsError::alignment("no monotonic path through the trellis"))?;
        let confidence =
            grouping::path_confidence(&path.steps, &targets.tokens, &emissions.log_probs);
        debug!(
            num_frames,
            states = targets.tokens.len(),
            score = path.score,
            confidence,
            "viterbi done"
        );

        if confidence.is_nan() || confidence < self.min_confidence {
            return Err(TtsError::alignment(format!(
                "confidence {confidence:.2} below threshold {:.2}; transcript may not match the audio",
                self.min_confidence
            )));
        }

        let words = grouping::group_words(&path.steps, &targets, emissions.frame_secs);
        if words.len() != targets.words.len() {
            return Err(TtsError::internal(format!(
                "aligned {} of {} words",
                words.len(),
                targets.words.len()
            )));
        }

        info!(words = words.len(), confidence, "alignment complete");
        Ok(AlignmentResult {
            words,
            confidence,
            num_frames,
            frame_secs: emissions.frame_secs,
        })
    }
}
