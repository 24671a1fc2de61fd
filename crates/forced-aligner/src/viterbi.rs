//! CTC Viterbi search.

/// Best monotonic path through a CTC trellis.
#[derive(Debug, Clone, PartialEq)]
pub struct ViterbiPath {
    /// `(state, frame)` for every frame, in frame order.
    pub steps: Vec<(usize, usize)>,
    /// Total log-probability of the path.
    pub score: f32,
}

/// Find the maximum-likelihood path of `tokens` through `log_probs`.
///
/// `log_probs[t][c]` is the log-probability of class `c` at frame `t`;
/// `tokens` is a blank-interleaved target sequence starting and ending with
/// a blank. Each frame either stays in its state, advances one state, or
/// skips a blank between two different classes. The path starts in one of
/// the first two states and ends in one of the last two.
///
/// Returns `None` when no path exists (too few frames for the targets).
pub fn forced_align(log_probs: &[Vec<f32>], tokens: &[usize]) -> Option<ViterbiPath> {
    let t_len = log_probs.len();
    let s_len = tokens.len();
    if t_len == 0 || s_len == 0 {
        return None;
    }

    let mut prev = vec![f32::NEG_INFINITY; s_len];
    let mut curr = vec![f32::NEG_INFINITY; s_len];
    let mut bp = vec![0u8; t_len * s_len];

    prev[0] = log_probs[0][tokens[0]];
    if s_len > 1 {
        prev[1] = log_probs[0][tokens[1]];
    }

    for t in 1..t_len {
        let row = &log_probs[t];
        // States further than 2t + 1 are unreachable at frame t.
        let reach = (2 * t + 1).min(s_len - 1);
        let bp_offset = t * s_len;
        for s in 0..=reach {
            let (best, step) = best_transition(&prev, s, tokens);
            curr[s] = best + row[tokens[s]];
            bp[bp_offset + s] = step;
        }
        for s in reach + 1..s_len {
            curr[s] = f32::NEG_INFINITY;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let mut s = s_len - 1;
    if s_len >= 2 && prev[s_len - 2] > prev[s_len - 1] {
        s = s_len - 2;
    }
    let score = prev[s];
    if !score.is_finite() {
        return None;
    }

    let mut steps = Vec::with_capacity(t_len);
    steps.push((s, t_len - 1));
    for t in (1..t_len).rev() {
        s -= bp[t * s_len + s] as usize;
        steps.push((s, t - 1));
    }
    steps.reverse();

    Some(ViterbiPath { steps, score })
}

#[inline(always)]
fn best_transition(prev: &[f32], s: usize, tokens: &[usize]) -> (f32, u8) {
    let mut best = prev[s];
    let mut step = 0u8;

    if s >= 1 && prev[s - 1] > best {
        best = prev[s - 1];
        step = 1;
    }

    if s >= 2 && tokens[s] != tokens[s - 2] && prev[s - 2] > best {
        best = prev[s - 2];
        step = 2;
    }

    (best, step)
}
