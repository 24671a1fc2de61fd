//! Configuration structures for the TTS engine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{TtsError, TtsResult};
use crate::token::TokenLayout;

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Softmax temperature, must be > 0.
    pub temperature: f32,
    /// Penalty for already emitted tokens, must be >= 1.
    pub repetition_penalty: f32,
    /// Maximum number of generated tokens, must be > 0.
    pub max_length: usize,
    /// Keep only the k most likely tokens (0 disables).
    pub top_k: usize,
    /// Nucleus sampling mass in (0, 1]; 1.0 disables.
    pub top_p: f32,
    /// Seed for the sampling RNG; entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            repetition_penalty: 1.1,
            max_length: 4096,
            top_k: 0,
            top_p: 1.0,
            seed: None,
        }
    }
}

impl GenerationConfig {
    /// Create a validated config with the remaining fields at their defaults.
    pub fn new(temperature: f32, repetition_penalty: f32, max_length: usize) -> TtsResult<Self> {
        let config = Self {
            temperature,
            repetition_penalty,
            max_length,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reject values the sampler cannot work with.
    pub fn validate(&self) -> TtsResult<()> {
        if !self.temperature.is_finite() || self.temperature <= 0.0 {
            return Err(TtsError::config(format!(
                "temperature must be > 0, got {}",
                self.temperature
            )));
        }
        if !self.repetition_penalty.is_finite() || self.repetition_penalty < 1.0 {
            return Err(TtsError::config(format!(
                "repetition_penalty must be >= 1, got {}",
                self.repetition_penalty
            )));
        }
        if self.max_length == 0 {
            return Err(TtsError::config("max_length must be > 0"));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(TtsError::config(format!(
                "top_p must be in (0, 1], got {}",
                self.top_p
            )));
        }
        Ok(())
    }
}

/// Per-model-version constants shared by the codec, the prompt and the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model name/identifier.
    pub name: String,
    /// Model version.
    pub version: String,
    /// Token id layout.
    pub layout: TokenLayout,
    /// Codec sample rate in Hz.
    pub sample_rate: u32,
    /// Acoustic tokens per second of audio.
    pub tokens_per_second: u32,
    /// Number of codec codes.
    pub codebook_size: usize,
    /// Backend context window in tokens.
    pub context_window: usize,
}

/// Text vocabulary reserved by the built-in v1 layout.
pub const V1_TEXT_VOCAB_SIZE: u32 = 256;

impl ModelSpec {
    /// Built-in constants: 24 kHz audio, 75 tokens/s, 4096 codes, 4096-token context.
    pub fn v1() -> Self {
        let codebook_size = 4096;
        Self {
            name: "speech-lm".to_string(),
            version: "1".to_string(),
            layout: TokenLayout::contiguous(V1_TEXT_VOCAB_SIZE, codebook_size as u32),
            sample_rate: 24_000,
            tokens_per_second: 75,
            codebook_size,
            context_window: 4096,
        }
    }

    /// Rebuild the layout for a larger text vocabulary.
    pub fn with_text_vocab_size(mut self, text_vocab_size: u32) -> Self {
        self.layout = TokenLayout::contiguous(text_vocab_size, self.codebook_size as u32);
        self
    }

    pub fn with_context_window(mut self, context_window: usize) -> Self {
        self.context_window = context_window;
        self
    }

    /// Samples covered by one acoustic token.
    pub fn samples_per_token(&self) -> usize {
        if self.tokens_per_second == 0 {
            return 0;
        }
        (self.sample_rate / self.tokens_per_second) as usize
    }

    /// Check internal consistency of the constants.
    pub fn validate(&self) -> TtsResult<()> {
        self.layout.validate()?;
        if self.sample_rate == 0 || self.tokens_per_second == 0 {
            return Err(TtsError::config(
                "sample_rate and tokens_per_second must be > 0",
            ));
        }
        if self.sample_rate % self.tokens_per_second != 0 {
            return Err(TtsError::config(format!(
                "sample rate {} is not a whole multiple of {} tokens/s",
                self.sample_rate, self.tokens_per_second
            )));
        }
        if self.codebook_size != self.layout.acoustic_vocab_size as usize {
            return Err(TtsError::config(format!(
                "codebook size {} does not match acoustic vocabulary of {}",
                self.codebook_size, self.layout.acoustic_vocab_size
            )));
        }
        if self.context_window == 0 {
            return Err(TtsError::config("context_window must be > 0"));
        }
        Ok(())
    }
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self::v1()
    }
}

/// Audio codec configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Path to codebook weights (safetensors); seeded codebook when absent.
    #[serde(default)]
    pub weights_path: Option<PathBuf>,
    /// Inputs with RMS below this level are rejected as silent.
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold: f32,
    /// Seed for the built-in codebook.
    #[serde(default = "default_codec_seed")]
    pub seed: u64,
}

fn default_silence_threshold() -> f32 {
    1e-4
}

fn default_codec_seed() -> u64 {
    0x5eed
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            weights_path: None,
            silence_threshold: default_silence_threshold(),
            seed: default_codec_seed(),
        }
    }
}

/// Forced aligner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignerConfig {
    /// Sample rate the emission model works at.
    #[serde(default = "default_aligner_sample_rate")]
    pub sample_rate: u32,
    /// Emission frame length in milliseconds.
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u32,
    /// Minimum mean log-probability of the frames assigned to characters.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
}

fn default_aligner_sample_rate() -> u32 {
    16_000
}

fn default_frame_ms() -> u32 {
    20
}

fn default_min_confidence() -> f32 {
    -6.0
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_aligner_sample_rate(),
            frame_ms: default_frame_ms(),
            min_confidence: default_min_confidence(),
        }
    }
}

impl AlignerConfig {
    /// Samples per emission frame.
    pub fn frame_samples(&self) -> usize {
        (self.sample_rate as usize * self.frame_ms as usize) / 1000
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format (json or text).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub model: ModelSpec,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub aligner: AlignerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Directory with default speaker profiles (`<lang>_<name>.json`).
    #[serde(default)]
    pub speakers_dir: Option<PathBuf>,
}

impl TtsConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> TtsResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TtsError::config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config from disk.
    pub fn from_json_file(path: &Path) -> TtsResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| TtsError::ModelLoad {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> TtsResult<()> {
        self.model.validate()?;
        self.generation.validate()?;
        if self.generation.max_length > self.model.context_window {
            return Err(TtsError::config(format!(
                "max_length {} exceeds the context window of {}",
                self.generation.max_length, self.model.context_window
            )));
        }
        if self.aligner.frame_samples() == 0 {
            return Err(TtsError::config("aligner frame is shorter than one sample"));
        }
        Ok(())
    }
}
