//! Unified error types for the TTS engine.

use std::path::PathBuf;

/// Main error type for TTS operations.
#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    /// Invalid configuration value or inconsistent model constants.
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio rejected at the codec boundary (empty, bad sample rate, silent).
    #[error("invalid audio: {0}")]
    InvalidAudio(String),

    /// Token outside the expected vocabulary, or an empty token sequence.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Forced alignment could not produce a confident monotonic path.
    #[error("alignment failed: {0}")]
    AlignmentFailed(String),

    /// Speaker profile construction failed at the named stage.
    #[error("speaker profile construction failed during {stage}: {source}")]
    SpeakerProfile {
        stage: &'static str,
        #[source]
        source: Box<TtsError>,
    },

    /// Token sequence does not fit into the backend context window.
    #[error("context overflow: {len} tokens exceed capacity of {capacity}")]
    ContextOverflow { len: usize, capacity: usize },

    /// Sequence-model backend failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// Transcription collaborator failure.
    #[error("transcription failed: {0}")]
    Transcription(String),

    /// Generation produced no acoustic tokens.
    #[error("generation produced no acoustic tokens")]
    EmptyGeneration,

    /// Malformed or version-mismatched persisted data.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Generation was cancelled between sampling steps.
    #[error("generation cancelled after {steps} steps")]
    Cancelled { steps: usize },

    /// Text normalization failed.
    #[error("normalization failed: {0}")]
    Normalization(String),

    /// Tokenization failed.
    #[error("tokenization failed: {0}")]
    Tokenization(String),

    /// Model or asset loading error.
    #[error("model load failed for {path}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (should not happen in normal operation).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results with TtsError.
pub type TtsResult<T> = Result<T, TtsError>;

impl TtsError {
    /// Create a configuration error with message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid audio error with message.
    pub fn invalid_audio(msg: impl Into<String>) -> Self {
        Self::InvalidAudio(msg.into())
    }

    /// Create an invalid token error with message.
    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::InvalidToken(msg.into())
    }

    /// Create an alignment failure with message.
    pub fn alignment(msg: impl Into<String>) -> Self {
        Self::AlignmentFailed(msg.into())
    }

    /// Wrap a failure that happened while building a speaker profile.
    pub fn speaker_profile(stage: &'static str, source: TtsError) -> Self {
        Self::SpeakerProfile {
            stage,
            source: Box::new(source),
        }
    }

    /// Create a backend error with message.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a transcription error with message.
    pub fn transcription(msg: impl Into<String>) -> Self {
        Self::Transcription(msg.into())
    }

    /// Create a serialization error with message.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a normalization error with message.
    pub fn normalization(msg: impl Into<String>) -> Self {
        Self::Normalization(msg.into())
    }

    /// Create a tokenization error with message.
    pub fn tokenization(msg: impl Into<String>) -> Self {
        Self::Tokenization(msg.into())
    }

    /// Create an internal error with message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The innermost error, looking through speaker-profile wrappers.
    pub fn root_cause(&self) -> &TtsError {
        match self {
            Self::SpeakerProfile { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
