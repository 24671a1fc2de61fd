//! Sampling strategies for token generation.

use std::collections::HashMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tts_core::{GenerationConfig, TtsError, TtsResult};

/// Occurrence count per token id.
pub type TokenCounts = HashMap<u32, usize>;

/// Apply repetition penalty to logits of tokens already in the sequence.
///
/// Each occurrence lowers the logit by `ln(penalty)`, which divides the
/// token's unnormalized probability by `penalty` per occurrence whatever the
/// sign of the logit. A penalty of 1 leaves the logits untouched.
pub fn apply_repetition_penalty(logits: &mut [f32], counts: &TokenCounts, penalty: f32) {
    if (penalty - 1.0).abs() < f32::EPSILON {
        return;
    }
    let step = penalty.ln();
    for (&token, &count) in counts {
        if let Some(logit) = logits.get_mut(token as usize) {
            *logit -= step * count as f32;
        }
    }
}

/// Compute softmax of a slice of values.
///
/// `+inf` entries share all of the mass. A slice with no usable value
/// falls back to uniform.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }

    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    if max == f32::INFINITY {
        let certain = logits.iter().filter(|&&x| x == f32::INFINITY).count() as f32;
        return logits
            .iter()
            .map(|&x| if x == f32::INFINITY { 1.0 / certain } else { 0.0 })
            .collect();
    }
    if !max.is_finite() {
        return vec![1.0 / logits.len() as f32; logits.len()];
    }
    let exp: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exp.iter().sum();

    if sum > 0.0 {
        exp.iter().map(|&x| x / sum).collect()
    } else {
        vec![1.0 / logits.len() as f32; logits.len()]
    }
}

fn renormalize(probs: &mut [f32]) {
    let sum: f32 = probs.iter().sum();
    if sum > 0.0 {
        for p in probs.iter_mut() {
            *p /= sum;
        }
    }
}

fn sorted_desc(probs: &[f32]) -> Vec<f32> {
    let mut sorted = probs.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    sorted
}

/// Index of the largest value; ties go to the lowest index.
pub fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ if v.is_nan() => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Token sampler for autoregressive generation.
///
/// The random source is a type parameter so tests can replay a fixed stream.
#[derive(Debug)]
pub struct Sampler<R = StdRng> {
    temperature: f32,
    repetition_penalty: f32,
    top_k: usize,
    top_p: f32,
    rng: R,
}

impl Sampler<StdRng> {
    /// Sampler seeded from the config, or from entropy when no seed is set.
    pub fn new(config: &GenerationConfig) -> TtsResult<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> Sampler<R> {
    /// Sampler drawing from the given random source.
    pub fn with_rng(config: &GenerationConfig, rng: R) -> TtsResult<Self> {
        config.validate()?;
        Ok(Self {
            temperature: config.temperature,
            repetition_penalty: config.repetition_penalty,
            top_k: config.top_k,
            top_p: config.top_p,
            rng,
        })
    }

    /// Selection probabilities after penalty, temperature, top-k and top-p.
    pub fn probabilities(&self, logits: &[f32], counts: &TokenCounts) -> Vec<f32> {
        let mut adjusted: Vec<f32> = logits
            .iter()
            .map(|&x| if x.is_nan() { f32::NEG_INFINITY } else { x })
            .collect();
        apply_repetition_penalty(&mut adjusted, counts, self.repetition_penalty);
        // Shift before scaling so a tiny temperature keeps the argmax at 0
        // and sends the rest towards -inf instead of overflowing.
        let max = adjusted.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        if max.is_finite() {
            for x in adjusted.iter_mut() {
                *x = (*x - max) / self.temperature;
            }
        }
        let mut probs = softmax(&adjusted);

        if self.top_k > 0 && self.top_k < probs.len() {
            let threshold = sorted_desc(&probs)[self.top_k - 1];
            for p in probs.iter_mut() {
                if *p < threshold {
                    *p = 0.0;
                }
            }
            renormalize(&mut probs);
        }

        if self.top_p < 1.0 {
            let sorted = sorted_desc(&probs);
            let mut cumsum = 0.0;
            let mut threshold = 0.0;
            for &p in &sorted {
                cumsum += p;
                threshold = p;
                if cumsum >= self.top_p {
                    break;
                }
            }
            for p in probs.iter_mut() {
                if *p < threshold {
                    *p = 0.0;
                }
            }
            renormalize(&mut probs);
        }

        probs
    }

    /// Sample a token id from backend logits.
    ///
    /// Fails with `Backend` when the logits carry no usable value.
    pub fn sample(&mut self, logits: &[f32], counts: &TokenCounts) -> TtsResult<u32> {
        if logits.is_empty() {
            return Err(TtsError::backend("backend returned no logits"));
        }
        if !logits.iter().any(|&x| !x.is_nan() && x != f32::NEG_INFINITY) {
            return Err(TtsError::backend("backend returned no usable logits"));
        }

        let probs = self.probabilities(logits, counts);
        let index = match WeightedIndex::new(&probs) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => argmax(&probs).ok_or_else(|| TtsError::backend("degenerate distribution"))?,
        };
        Ok(index as u32)
    }
}
