//! Autoregressive generation loop.

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info, instrument, trace, warn};
use tts_core::{Backend, ControlToken, GenerationConfig, TokenLayout, TtsError, TtsResult};

use crate::cancel::CancellationToken;
use crate::sampling::{Sampler, TokenCounts};

/// Why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The end-of-generation control token was sampled.
    EndOfGeneration,
    /// `max_length` tokens were generated.
    MaxLength,
    /// The sequence filled the backend context window.
    ContextWindow,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::EndOfGeneration => "eos",
            StopReason::MaxLength => "max_length",
            StopReason::ContextWindow => "context_window",
        }
    }

    /// Whether generation ran out of budget rather than ending on its own.
    pub fn is_length_limit(&self) -> bool {
        !matches!(self, StopReason::EndOfGeneration)
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finished generation: the prompt followed by every sampled token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutput {
    pub tokens: Vec<u32>,
    pub prompt_len: usize,
    pub stop_reason: StopReason,
    pub steps: usize,
}

impl GenerationOutput {
    /// Tokens sampled after the prompt, including a terminal EOS if any.
    pub fn generated(&self) -> &[u32] {
        &self.tokens[self.prompt_len..]
    }
}

/// Per-call mutable state. Never shared between calls.
struct GenerationState {
    tokens: Vec<u32>,
    counts: TokenCounts,
    steps: usize,
}

impl GenerationState {
    fn new(prompt: &[u32], max_length: usize) -> Self {
        let mut counts = TokenCounts::new();
        for &t in prompt {
            *counts.entry(t).or_insert(0) += 1;
        }
        let mut tokens = Vec::with_capacity(prompt.len() + max_length);
        tokens.extend_from_slice(prompt);
        Self {
            tokens,
            counts,
            steps: 0,
        }
    }

    fn push(&mut self, token: u32) {
        self.tokens.push(token);
        *self.counts.entry(token).or_insert(0) += 1;
        self.steps += 1;
    }
}

/// Drives a [`Backend`] to extend a prompt one token at a time.
#[derive(Clone)]
pub struct GenerationEngine {
    backend: Arc<dyn Backend>,
    layout: TokenLayout,
}

impl std::fmt::Debug for GenerationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationEngine")
            .field("backend", &self.backend.name())
            .field("layout", &self.layout)
            .finish()
    }
}

impl GenerationEngine {
    pub fn new(backend: Arc<dyn Backend>, layout: TokenLayout) -> TtsResult<Self> {
        layout.validate()?;
        Ok(Self { backend, layout })
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn layout(&self) -> &TokenLayout {
        &self.layout
    }

    /// Generate with a sampler seeded from `config.seed`.
    pub fn run(
        &self,
        prompt: &[u32],
        config: &GenerationConfig,
        cancel: Option<&CancellationToken>,
    ) -> TtsResult<GenerationOutput> {
        let sampler = Sampler::new(config)?;
        self.run_with_sampler(prompt, config, sampler, cancel)
    }

    /// Generate drawing randomness from `rng`.
    pub fn run_with_rng<R: Rng>(
        &self,
        prompt: &[u32],
        config: &GenerationConfig,
        rng: R,
        cancel: Option<&CancellationToken>,
    ) -> TtsResult<GenerationOutput> {
        let sampler = Sampler::with_rng(config, rng)?;
        self.run_with_sampler(prompt, config, sampler, cancel)
    }

    #[instrument(
        skip(self, prompt, config, sampler, cancel),
        fields(backend = self.backend.name(), prompt_len = prompt.len(), max_length = config.max_length)
    )]
    fn run_with_sampler<R: Rng>(
        &self,
        prompt: &[u32],
        config: &GenerationConfig,
        mut sampler: Sampler<R>,
        cancel: Option<&CancellationToken>,
    ) -> TtsResult<GenerationOutput> {
        config.validate()?;
        if prompt.is_empty() {
            return Err(TtsError::invalid_token("prompt is empty"));
        }
        let capacity = self.backend.context_capacity();
        if prompt.len() >= capacity {
            return Err(TtsError::ContextOverflow {
                len: prompt.len(),
                capacity,
            });
        }

        let budget = config.max_length.min(capacity - prompt.len());
        info!(budget, "generation started");

        let eos = self.layout.control_id(ControlToken::EndOfGeneration);
        let vocab_size = self.layout.vocab_size();
        let mut state = GenerationState::new(prompt, budget);

        let stop_reason = loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                warn!(steps = state.steps, "generation cancelled");
                return Err(TtsError::Cancelled { steps: state.steps });
            }

            let logits = self.backend.next_token_logits(&state.tokens)?;
            if logits.len() != vocab_size {
                return Err(TtsError::backend(format!(
                    "backend returned {} logits, token layout has {vocab_size} ids",
                    logits.len()
                )));
            }

            let token = sampler.sample(&logits, &state.counts)?;
            state.push(token);
            trace!(step = state.steps, token, kind = ?self.layout.classify(token), "sampled");

            if token == eos {
                break StopReason::EndOfGeneration;
            }
            if state.steps >= config.max_length {
                break StopReason::MaxLength;
            }
            if state.tokens.len() >= capacity {
                break StopReason::ContextWindow;
            }
        };

        debug!(steps = state.steps, reason = %stop_reason, "generation stopped");
        Ok(GenerationOutput {
            prompt_len: prompt.len(),
            tokens: state.tokens,
            stop_reason,
            steps: state.steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Plays back a fixed token script, one token per call.
    struct ScriptedBackend {
        layout: TokenLayout,
        script: Vec<u32>,
        capacity: usize,
        calls: Mutex<usize>,
    }

    impl ScriptedBackend {
        fn new(layout: TokenLayout, script: Vec<u32>, capacity: usize) -> Self {
            Self {
                layout,
                script,
                capacity,
                calls: Mutex::new(0),
            }
        }
    }

    impl Backend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn context_capacity(&self) -> usize {
            self.capacity
        }

        fn next_token_logits(&self, tokens: &[u32]) -> TtsResult<Vec<f32>> {
            if tokens.len() > self.capacity {
                return Err(TtsError::ContextOverflow {
                    len: tokens.len(),
                    capacity: self.capacity,
                });
            }
            let mut calls = self.calls.lock().unwrap();
            let next = self.script[*calls % self.script.len()];
            *calls += 1;
            let mut logits = vec![-50.0; self.layout.vocab_size()];
            logits[next as usize] = 50.0;
            Ok(logits)
        }
    }

    fn layout() -> TokenLayout {
        TokenLayout::contiguous(8, 16)
    }

    fn engine(script: Vec<u32>, capacity: usize) -> GenerationEngine {
        GenerationEngine::new(Arc::new(ScriptedBackend::new(layout(), script, capacity)), layout())
            .unwrap()
    }

    fn greedy(max_length: usize) -> GenerationConfig {
        GenerationConfig::new(0.1, 1.0, max_length).unwrap().with_seed(7)
    }

    #[test]
    fn test_stops_on_eos() {
        let l = layout();
        let eos = l.control_id(ControlToken::EndOfGeneration);
        let a = l.acoustic_token(3).unwrap();
        let out = engine(vec![a, a, eos], 100).run(&[0, 1], &greedy(50), None).unwrap();

        assert_eq!(out.stop_reason, StopReason::EndOfGeneration);
        assert_eq!(out.generated(), &[a, a, eos]);
        assert_eq!(out.steps, 3);
        assert_eq!(&out.tokens[..2], &[0, 1]);
    }

    #[test]
    fn test_stops_at_max_length() {
        let a = layout().acoustic_token(1).unwrap();
        let out = engine(vec![a], 100).run(&[0], &greedy(5), None).unwrap();
        assert_eq!(out.stop_reason, StopReason::MaxLength);
        assert_eq!(out.steps, 5);
    }

    #[test]
    fn test_stops_at_context_window() {
        let a = layout().acoustic_token(1).unwrap();
        let out = engine(vec![a], 10).run(&[0, 1, 2, 3, 4, 5], &greedy(50), None).unwrap();
        assert_eq!(out.stop_reason, StopReason::ContextWindow);
        assert_eq!(out.tokens.len(), 10);
        assert_eq!(out.steps, 4);
    }

    #[test]
    fn test_prompt_filling_context_fails_before_backend() {
        let err = engine(vec![0], 4).run(&[0, 1, 2, 3], &greedy(5), None).unwrap_err();
        assert!(matches!(err, TtsError::ContextOverflow { len: 4, capacity: 4 }));
    }

    #[test]
    fn test_cancelled_before_first_step() {
        let token = CancellationToken::new();
        token.cancel();
        let err = engine(vec![0], 100).run(&[0], &greedy(5), Some(&token)).unwrap_err();
        assert!(matches!(err, TtsError::Cancelled { steps: 0 }));
    }

    #[test]
    fn test_wrong_logit_width_is_backend_error() {
        struct Narrow;
        impl Backend for Narrow {
            fn name(&self) -> &str {
                "narrow"
            }
            fn context_capacity(&self) -> usize {
                64
            }
            fn next_token_logits(&self, _: &[u32]) -> TtsResult<Vec<f32>> {
                Ok(vec![0.0; 3])
            }
        }
        let engine = GenerationEngine::new(Arc::new(Narrow), layout()).unwrap();
        assert!(matches!(
            engine.run(&[0], &greedy(5), None),
            Err(TtsError::Backend(_))
        ));
    }

    #[test]
    fn test_stop_reason_names() {
        assert_eq!(StopReason::EndOfGeneration.to_string(), "eos");
        assert!(StopReason::ContextWindow.is_length_limit());
        assert!(!StopReason::EndOfGeneration.is_length_limit());
    }
}
