//! # audio-codec
//!
//! Discrete audio codec for the token-based TTS engine.
//!
//! This crate provides:
//! - [`VqCodec`], a gain-shape vector quantizer mapping 24 kHz audio to one
//!   code per 320-sample frame (75 codes per second) and back
//! - Sample-rate conversion and mono mixdown ([`resample`])
//! - WAV import/export and edge fades ([`wav`])
//!
//! # Example
//!
//! ```
//! use audio_codec::VqCodec;
//! use tts_core::{AudioCodec, Waveform};
//!
//! let codec = VqCodec::seeded(0).unwrap();
//! let tone: Vec<f32> = (0..4800).map(|i| (i as f32 * 0.05).sin() * 0.3).collect();
//! let codes = codec.encode(&Waveform::new(tone, 24_000)).unwrap();
//! assert_eq!(codes.len(), 15);
//!
//! let decoded = codec.decode(&codes).unwrap();
//! assert_eq!(decoded.num_samples(), 15 * 320);
//! ```

pub mod resample;
pub mod vq;
pub mod wav;

pub use vq::VqCodec;

/// Sample rate of the codec in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 24000;

/// Samples per acoustic token.
pub const SAMPLES_PER_TOKEN: usize = 320;
