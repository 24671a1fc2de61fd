//! Deterministic stand-in for a real sequence model.

use tracing::debug;
use tts_core::{Backend, ControlToken, TokenKind, TokenLayout, TtsError, TtsResult};

/// Default number of acoustic frames produced per prompt text token.
pub const DEFAULT_FRAMES_PER_TEXT_TOKEN: usize = 3;

const FAVOURED_LOGIT: f32 = 8.0;
const ACOUSTIC_LOGIT: f32 = 0.0;
const EOS_LOW: f32 = -20.0;
const EOS_HIGH: f32 = 30.0;
const SUPPRESSED: f32 = f32::NEG_INFINITY;

fn mix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Backend returning deterministic logits for tests and demos.
///
/// After the generation-start marker it favours one acoustic token per step,
/// chosen by hashing the previous token and the step, and makes the
/// end-of-generation token overwhelmingly likely once the generated length
/// reaches a target derived from the prompt's text tokens. Text and other
/// control tokens are never proposed.
#[derive(Debug, Clone)]
pub struct MockBackend {
    layout: TokenLayout,
    context_capacity: usize,
    frames_per_text_token: usize,
    fixed_length: Option<usize>,
}

impl MockBackend {
    pub fn new(layout: TokenLayout, context_capacity: usize) -> Self {
        Self {
            layout,
            context_capacity,
            frames_per_text_token: DEFAULT_FRAMES_PER_TEXT_TOKEN,
            fixed_length: None,
        }
    }

    pub fn with_frames_per_text_token(mut self, frames: usize) -> Self {
        self.frames_per_text_token = frames;
        self
    }

    /// Emit end-of-generation after exactly `frames` acoustic tokens.
    pub fn with_fixed_length(mut self, frames: usize) -> Self {
        self.fixed_length = Some(frames);
        self
    }

    /// Acoustic frames the mock will produce for a prompt.
    pub fn target_length(&self, prompt: &[u32]) -> usize {
        if let Some(n) = self.fixed_length {
            return n;
        }
        // Text after the last control token before generation starts.
        let text_tokens = prompt
            .iter()
            .rev()
            .skip_while(|&&t| matches!(self.layout.classify(t), Some(TokenKind::Control(_))))
            .take_while(|&&t| matches!(self.layout.classify(t), Some(TokenKind::Text(_))))
            .count();
        (text_tokens * self.frames_per_text_token).max(1)
    }
}

impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn context_capacity(&self) -> usize {
        self.context_capacity
    }

    fn next_token_logits(&self, tokens: &[u32]) -> TtsResult<Vec<f32>> {
        if tokens.len() > self.context_capacity {
            return Err(TtsError::ContextOverflow {
                len: tokens.len(),
                capacity: self.context_capacity,
            });
        }
        let start_id = self.layout.control_id(ControlToken::GenerationStart);
        let start = tokens
            .iter()
            .rposition(|&t| t == start_id)
            .ok_or_else(|| TtsError::backend("sequence has no generation-start marker"))?;

        let prompt = &tokens[..=start];
        let generated = tokens.len() - start - 1;
        let target = self.target_length(prompt);

        let mut logits = vec![SUPPRESSED; self.layout.vocab_size()];
        let acoustic = self.layout.acoustic_offset as usize;
        let acoustic_end = acoustic + self.layout.acoustic_vocab_size as usize;
        for logit in &mut logits[acoustic..acoustic_end] {
            *logit = ACOUSTIC_LOGIT;
        }

        let previous = tokens.last().copied().unwrap_or(0) as u64;
        let seed = mix(previous ^ ((generated as u64) << 32) ^ prompt.len() as u64);
        let favoured = acoustic + (seed % self.layout.acoustic_vocab_size as u64) as usize;
        logits[favoured] = FAVOURED_LOGIT;

        let eos = self.layout.control_id(ControlToken::EndOfGeneration) as usize;
        logits[eos] = if generated >= target { EOS_HIGH } else { EOS_LOW };

        debug!(generated, target, "mock logits");
        Ok(logits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> TokenLayout {
        TokenLayout::contiguous(256, 64)
    }

    fn prompt(text_len: usize) -> Vec<u32> {
        let l = layout();
        let mut p = vec![l.control_id(ControlToken::SequenceStart)];
        p.extend((0..text_len as u32).map(|i| l.text_token(97 + i % 26).unwrap()));
        p.push(l.control_id(ControlToken::GenerationStart));
        p
    }

    #[test]
    fn test_target_from_text_tokens() {
        let backend = MockBackend::new(layout(), 512);
        assert_eq!(backend.target_length(&prompt(5)), 15);
        assert_eq!(backend.clone().with_fixed_length(2).target_length(&prompt(5)), 2);
    }

    #[test]
    fn test_logits_favour_acoustic_then_eos() {
        let l = layout();
        let backend = MockBackend::new(l.clone(), 512).with_fixed_length(1);
        let mut seq = prompt(3);
        let eos = l.control_id(ControlToken::EndOfGeneration) as usize;

        let logits = backend.next_token_logits(&seq).unwrap();
        let best = crate::sampling::argmax(&logits).unwrap() as u32;
        assert!(l.is_acoustic(best));
        assert!(logits[eos] < 0.0);

        seq.push(best);
        let logits = backend.next_token_logits(&seq).unwrap();
        assert_eq!(crate::sampling::argmax(&logits), Some(eos));
    }

    #[test]
    fn test_text_tokens_suppressed() {
        let backend = MockBackend::new(layout(), 512);
        let logits = backend.next_token_logits(&prompt(2)).unwrap();
        assert!(logits[..256].iter().all(|&x| x == f32::NEG_INFINITY));
    }

    #[test]
    fn test_deterministic() {
        let backend = MockBackend::new(layout(), 512);
        let seq = prompt(4);
        assert_eq!(
            backend.next_token_logits(&seq).unwrap(),
            backend.next_token_logits(&seq).unwrap()
        );
    }

    #[test]
    fn test_requires_generation_start() {
        let backend = MockBackend::new(layout(), 512);
        assert!(matches!(
            backend.next_token_logits(&[1, 2, 3]),
            Err(TtsError::Backend(_))
        ));
        assert!(matches!(
            backend.next_token_logits(&vec![0; 600]),
            Err(TtsError::ContextOverflow { .. })
        ));
    }
}
