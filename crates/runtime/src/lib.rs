//! # runtime
//!
//! Orchestration for the token-based TTS engine.
//!
//! This crate provides:
//! - Prompt assembly in the fixed layout the sequence model expects
//! - Output assembly: generated acoustic span to waveform
//! - Speaker profile construction, persistence and a default-speaker registry
//! - [`TtsPipeline`], the synchronous and async entry point
//! - Structured logging and metrics
//!
//! # Example
//!
//! ```
//! use runtime::TtsPipeline;
//! use tts_core::{GenerationConfig, Lang};
//!
//! let pipeline = TtsPipeline::new_mock().unwrap();
//! let config = GenerationConfig::new(0.1, 1.1, 64).unwrap().with_seed(1);
//! let audio = pipeline.generate("hello world", Lang::En, None, &config).unwrap();
//! assert_eq!(audio.sample_rate(), 24_000);
//! assert!(audio.num_samples() > 0);
//! ```

pub mod logging;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod speaker;
pub mod speakers;

pub use output::{OutputAssembler, Synthesis};
pub use pipeline::{TtsPipeline, TtsPipelineBuilder};
pub use prompt::PromptAssembler;
pub use speaker::{load_speaker, save_speaker, SpeakerProfileBuilder};
pub use speakers::SpeakerRegistry;

pub use generation::{CancellationToken, StopReason};
