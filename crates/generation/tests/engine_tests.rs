//! Generation loop behaviour against mock and adversarial backends.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use generation::{CancellationToken, GenerationEngine, MockBackend, StopReason};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tts_core::{Backend, ControlToken, GenerationConfig, TokenLayout, TtsError, TtsResult};

fn layout() -> TokenLayout {
    TokenLayout::contiguous(256, 4096)
}

fn prompt(layout: &TokenLayout, text: &str) -> Vec<u32> {
    let mut p = vec![layout.control_id(ControlToken::SequenceStart)];
    p.extend(text.bytes().map(|b| layout.text_token(b as u32).unwrap()));
    p.push(layout.control_id(ControlToken::GenerationStart));
    p
}

fn mock_engine(capacity: usize) -> GenerationEngine {
    let l = layout();
    GenerationEngine::new(Arc::new(MockBackend::new(l.clone(), capacity)), l).unwrap()
}

/// Returns uniformly random logits, never favouring EOS.
struct NoisyBackend {
    capacity: usize,
    vocab: usize,
    calls: AtomicUsize,
}

impl Backend for NoisyBackend {
    fn name(&self) -> &str {
        "noisy"
    }

    fn context_capacity(&self) -> usize {
        self.capacity
    }

    fn next_token_logits(&self, tokens: &[u32]) -> TtsResult<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
        let mut rng = StdRng::seed_from_u64(call ^ tokens.len() as u64);
        Ok((0..self.vocab).map(|_| rng.gen_range(-5.0..5.0)).collect())
    }
}

/// Fails after a fixed number of calls.
struct FlakyBackend {
    vocab: usize,
    fail_after: usize,
    calls: AtomicUsize,
}

impl Backend for FlakyBackend {
    fn name(&self) -> &str {
        "flaky"
    }

    fn context_capacity(&self) -> usize {
        1024
    }

    fn next_token_logits(&self, _tokens: &[u32]) -> TtsResult<Vec<f32>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.fail_after {
            return Err(TtsError::backend("device lost"));
        }
        Ok(vec![0.0; self.vocab])
    }
}

/// Cancels the shared token during its n-th call.
struct CancellingBackend {
    inner: MockBackend,
    token: CancellationToken,
    cancel_on: usize,
    calls: AtomicUsize,
}

impl Backend for CancellingBackend {
    fn name(&self) -> &str {
        "cancelling"
    }

    fn context_capacity(&self) -> usize {
        self.inner.context_capacity()
    }

    fn next_token_logits(&self, tokens: &[u32]) -> TtsResult<Vec<f32>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) + 1 == self.cancel_on {
            self.token.cancel();
        }
        self.inner.next_token_logits(tokens)
    }
}

#[test]
fn test_mock_generation_ends_with_eos() {
    let l = layout();
    let p = prompt(&l, "hello world");
    let config = GenerationConfig::new(0.1, 1.1, 64).unwrap().with_seed(0);
    let out = mock_engine(4096).run(&p, &config, None).unwrap();

    assert_eq!(out.stop_reason, StopReason::EndOfGeneration);
    let generated = out.generated();
    assert_eq!(generated.len(), 11 * 3 + 1);
    assert_eq!(
        *generated.last().unwrap(),
        l.control_id(ControlToken::EndOfGeneration)
    );
    assert!(generated[..generated.len() - 1].iter().all(|&t| l.is_acoustic(t)));
}

#[test]
fn test_max_length_one_generates_one_token() {
    let l = layout();
    let p = prompt(&l, "hello world");
    let config = GenerationConfig::new(0.1, 1.1, 1).unwrap();
    for seed in 0..5 {
        let out = mock_engine(4096)
            .run_with_rng(&p, &config, StdRng::seed_from_u64(seed), None)
            .unwrap();
        assert_eq!(out.steps, 1);
        assert_eq!(out.generated().len(), 1);
        assert_eq!(out.stop_reason, StopReason::MaxLength);
    }
}

#[test]
fn test_same_seed_same_tokens() {
    let l = layout();
    let noisy = || NoisyBackend {
        capacity: 4096,
        vocab: l.vocab_size(),
        calls: AtomicUsize::new(0),
    };
    let p = prompt(&l, "abc");
    let config = GenerationConfig::new(1.0, 1.3, 40).unwrap().with_seed(99);

    let a = GenerationEngine::new(Arc::new(noisy()), l.clone())
        .unwrap()
        .run(&p, &config, None)
        .unwrap();
    let b = GenerationEngine::new(Arc::new(noisy()), l.clone())
        .unwrap()
        .run(&p, &config, None)
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_always_terminates_within_budget() {
    let l = layout();
    for (max_length, capacity, text) in [(1, 4096, "a"), (25, 4096, "abc"), (500, 40, "hello")] {
        let backend = NoisyBackend {
            capacity,
            vocab: l.vocab_size(),
            calls: AtomicUsize::new(0),
        };
        let engine = GenerationEngine::new(Arc::new(backend), l.clone()).unwrap();
        let p = prompt(&l, text);
        let config = GenerationConfig::new(0.8, 1.0, max_length).unwrap().with_seed(5);
        let out = engine.run(&p, &config, None).unwrap();

        assert!(out.steps <= max_length);
        assert!(out.tokens.len() <= capacity);
        if out.stop_reason == StopReason::ContextWindow {
            assert_eq!(out.tokens.len(), capacity);
        }
    }
}

#[test]
fn test_long_prompt_shrinks_budget() {
    let l = layout();
    let p = prompt(&l, "hello world");
    let capacity = p.len() + 3;
    let engine = GenerationEngine::new(
        Arc::new(MockBackend::new(l.clone(), capacity).with_fixed_length(100)),
        l,
    )
    .unwrap();
    let out = engine
        .run(&p, &GenerationConfig::new(0.1, 1.1, 64).unwrap(), None)
        .unwrap();
    assert_eq!(out.stop_reason, StopReason::ContextWindow);
    assert_eq!(out.steps, 3);
}

#[test]
fn test_backend_failure_propagates() {
    let l = layout();
    let backend = FlakyBackend {
        vocab: l.vocab_size(),
        fail_after: 3,
        calls: AtomicUsize::new(0),
    };
    let engine = GenerationEngine::new(Arc::new(backend), l.clone()).unwrap();
    let err = engine
        .run(&prompt(&l, "x"), &GenerationConfig::new(1.0, 1.0, 10).unwrap(), None)
        .unwrap_err();
    assert!(matches!(err, TtsError::Backend(msg) if msg == "device lost"));
}

#[test]
fn test_cancel_honoured_between_steps() {
    let l = layout();
    let token = CancellationToken::new();
    let backend = CancellingBackend {
        inner: MockBackend::new(l.clone(), 4096).with_fixed_length(50),
        token: token.clone(),
        cancel_on: 4,
        calls: AtomicUsize::new(0),
    };
    let engine = GenerationEngine::new(Arc::new(backend), l.clone()).unwrap();
    let err = engine
        .run(
            &prompt(&l, "hello"),
            &GenerationConfig::new(0.1, 1.1, 64).unwrap(),
            Some(&token),
        )
        .unwrap_err();
    // The fourth call completes, then the loop stops before a fifth.
    assert!(matches!(err, TtsError::Cancelled { steps: 4 }));
}

#[test]
fn test_invalid_config_rejected_before_backend() {
    let l = layout();
    let backend = FlakyBackend {
        vocab: l.vocab_size(),
        fail_after: 0,
        calls: AtomicUsize::new(0),
    };
    let engine = GenerationEngine::new(Arc::new(backend), l.clone()).unwrap();
    let config = GenerationConfig {
        temperature: 0.0,
        ..GenerationConfig::default()
    };
    assert!(matches!(
        engine.run(&prompt(&l, "x"), &config, None),
        Err(TtsError::Config(_))
    ));
}
