//! # tts-core
//!
//! Core types, traits, and error definitions for the token-based TTS engine.
//!
//! This crate provides the foundational abstractions used across all other crates
//! in the workspace, including:
//!
//! - Common data types (`NormText`, `TokenSeq`, `Waveform`, `Lang`)
//! - Token vocabularies and their numeric layout (`TokenLayout`, `TokenKind`)
//! - Speaker profiles and their persisted form
//! - Trait definitions for pipeline components
//! - Unified error handling via `TtsError`
//! - Configuration structures

pub mod config;
pub mod error;
pub mod profile;
pub mod token;
pub mod traits;
pub mod types;

pub use config::{
    AlignerConfig, CodecConfig, GenerationConfig, LoggingConfig, ModelSpec, TtsConfig,
};
pub use error::{TtsError, TtsResult};
pub use profile::{SpeakerProfile, WordSpan, PROFILE_FORMAT_VERSION};
pub use token::{ControlToken, ControlTokenIds, TokenKind, TokenLayout};
pub use traits::{AudioCodec, Backend, TextNormalizer, TextTokenizer, Transcriber};
pub use types::{Lang, NormText, TokenSeq, Waveform};
