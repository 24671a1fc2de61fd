//! # generation
//!
//! Autoregressive acoustic-token generation for the TTS engine.
//!
//! This crate provides:
//! - [`GenerationEngine`], the sampling loop that drives any
//!   [`tts_core::Backend`] from a prompt to a stop condition
//! - [`Sampler`] with repetition penalty, temperature, top-k and top-p
//! - [`CancellationToken`] for stopping a run between steps
//! - [`MockBackend`], a deterministic backend for tests and demos
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use generation::{GenerationEngine, MockBackend, StopReason};
//! use tts_core::{ControlToken, GenerationConfig, TokenLayout};
//!
//! let layout = TokenLayout::contiguous(256, 4096);
//! let backend = MockBackend::new(layout.clone(), 4096).with_fixed_length(4);
//! let engine = GenerationEngine::new(Arc::new(backend), layout.clone()).unwrap();
//!
//! let prompt = vec![
//!     layout.control_id(ControlToken::SequenceStart),
//!     layout.text_token(104).unwrap(),
//!     layout.control_id(ControlToken::GenerationStart),
//! ];
//! let config = GenerationConfig::new(0.1, 1.1, 64).unwrap().with_seed(1);
//! let output = engine.run(&prompt, &config, None).unwrap();
//!
//! assert_eq!(output.stop_reason, StopReason::EndOfGeneration);
//! assert_eq!(output.generated().len(), 5);
//! ```

pub mod cancel;
pub mod engine;
pub mod mock;
pub mod sampling;

pub use cancel::CancellationToken;
pub use engine::{GenerationEngine, GenerationOutput, StopReason};
pub use mock::MockBackend;
pub use sampling::{Sampler, TokenCounts, apply_repetition_penalty};
