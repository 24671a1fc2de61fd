//! Frame-level class log-probabilities.

use audio_codec::resample;
use tracing::debug;
use tts_core::{AlignerConfig, TtsError, TtsResult, Waveform};

use crate::vocab::CharVocabulary;

/// Per-frame log-probabilities over the vocabulary classes.
#[derive(Debug, Clone, PartialEq)]
pub struct Emissions {
    /// `log_probs[frame][class]`, each row a normalized distribution.
    pub log_probs: Vec<Vec<f32>>,
    /// Duration of one frame in seconds.
    pub frame_secs: f32,
}

impl Emissions {
    pub fn num_frames(&self) -> usize {
        self.log_probs.len()
    }
}

/// Acoustic model producing CTC emissions for the aligner.
pub trait EmissionModel: Send + Sync {
    /// Compute emissions for a waveform over the classes of `vocab`.
    fn emissions(&self, waveform: &Waveform, vocab: &CharVocabulary) -> TtsResult<Emissions>;
}

const FLOOR_PERCENTILE: f32 = 0.1;
const MIN_CONTRAST_DB: f32 = 10.0;
const SILENCE_DB: f32 = -60.0;
const SLOPE_DB: f32 = 2.0;
const MIN_SPEECH_PROB: f32 = 0.01;
const MAX_SPEECH_PROB: f32 = 0.99;
/// Share of the pause mass given to the word separator; blank takes the rest.
const SEPARATOR_SHARE: f32 = 0.6;

/// Emission model driven by frame energy alone.
///
/// Each frame gets a speech probability from its level relative to the
/// utterance's noise floor and peak. Speech mass is shared evenly by the
/// character classes and the rest is split between separator and blank,
/// leaning towards the separator, so the search places characters on voiced
/// frames and word breaks on pauses. A pause filled by a blank inside a word
/// scores worse than the same pause holding a word break.
/// It cannot tell characters apart; any model that can plugs in through
/// [`EmissionModel`].
#[derive(Debug, Clone)]
pub struct EnergyEmissionModel {
    sample_rate: u32,
    frame_samples: usize,
}

impl EnergyEmissionModel {
    pub fn new(config: &AlignerConfig) -> TtsResult<Self> {
        let frame_samples = config.frame_samples();
        if config.sample_rate == 0 || frame_samples == 0 {
            return Err(TtsError::config(
                "aligner sample rate and frame length must be positive",
            ));
        }
        Ok(Self {
            sample_rate: config.sample_rate,
            frame_samples,
        })
    }

    pub fn frame_secs(&self) -> f32 {
        self.frame_samples as f32 / self.sample_rate as f32
    }

    /// Frame levels in dBFS.
    fn frame_levels(&self, samples: &[f32]) -> Vec<f32> {
        samples
            .chunks(self.frame_samples)
            .map(|frame| {
                let mean_sq = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
                10.0 * (mean_sq + 1e-16).log10()
            })
            .collect()
    }

    /// Speech probability per frame.
    fn speech_probs(&self, levels: &[f32]) -> Vec<f32> {
        let mut sorted = levels.to_vec();
        sorted.sort_by(f32::total_cmp);
        let Some(&peak) = sorted.last() else {
            return Vec::new();
        };
        let floor = sorted[((sorted.len() - 1) as f32 * FLOOR_PERCENTILE) as usize];

        let threshold = if peak - floor < MIN_CONTRAST_DB {
            peak - 2.0 * MIN_CONTRAST_DB
        } else {
            floor + 0.5 * (peak - floor)
        }
        .max(SILENCE_DB);
        debug!(floor, peak, threshold, "energy gate");

        levels
            .iter()
            .map(|&db| {
                let p = 1.0 / (1.0 + (-(db - threshold) / SLOPE_DB).exp());
                p.clamp(MIN_SPEECH_PROB, MAX_SPEECH_PROB)
            })
            .collect()
    }
}

impl EmissionModel for EnergyEmissionModel {
    fn emissions(&self, waveform: &Waveform, vocab: &CharVocabulary) -> TtsResult<Emissions> {
        if waveform.is_empty() {
            return Err(TtsError::invalid_audio("waveform has no samples"));
        }
        if waveform.sample_rate() == 0 {
            return Err(TtsError::invalid_audio("waveform sample rate is zero"));
        }

        let resampled = resample::to_rate(waveform, self.sample_rate)?;
        let levels = self.frame_levels(resampled.samples());
        if levels.is_empty() {
            return Err(TtsError::invalid_audio(format!(
                "{} samples at {} Hz are shorter than one aligner frame",
                waveform.num_samples(),
                waveform.sample_rate()
            )));
        }
        let speech = self.speech_probs(&levels);

        let num_chars = vocab.num_chars().max(1) as f32;
        let log_probs = speech
            .iter()
            .map(|&p| {
                let char_lp = (p / num_chars).ln();
                let pause = 1.0 - p;
                let mut row = vec![char_lp; vocab.len()];
                row[crate::vocab::BLANK_ID] = (pause * (1.0 - SEPARATOR_SHARE)).ln();
                row[crate::vocab::SEPARATOR_ID] = (pause * SEPARATOR_SHARE).ln();
                row
            })
            .collect();

        Ok(Emissions {
            log_probs,
            frame_secs: self.frame_secs(),
        })
    }
}
