//! Fold a character-level path into word boundaries.

use crate::vocab::{BLANK_ID, SEPARATOR_ID, TargetSequence};
use crate::WordBoundary;

/// Word boundaries from a Viterbi path.
///
/// A word spans from the first to the last frame spent in any of its
/// character states. The search visits every state, so every word gets at
/// least one frame.
pub fn group_words(
    steps: &[(usize, usize)],
    targets: &TargetSequence,
    frame_secs: f32,
) -> Vec<WordBoundary> {
    let mut spans: Vec<Option<(usize, usize)>> = vec![None; targets.words.len()];
    for &(state, frame) in steps {
        if let Some(w) = targets.word_of_state[state] {
            let span = spans[w].get_or_insert((frame, frame));
            span.1 = frame;
        }
    }

    targets
        .words
        .iter()
        .zip(spans)
        .filter_map(|(word, span)| {
            let (start_frame, end_frame) = span?;
            Some(WordBoundary {
                word: word.clone(),
                start_frame,
                end_frame,
                start_secs: start_frame as f32 * frame_secs,
                end_secs: (end_frame + 1) as f32 * frame_secs,
            })
        })
        .collect()
}

/// Mean log-probability of the frames spent in character states.
///
/// Blank and separator frames are left out: they stand for pauses and would
/// lift the score of a transcript that does not match the audio.
pub fn path_confidence(
    steps: &[(usize, usize)],
    tokens: &[usize],
    log_probs: &[Vec<f32>],
) -> f32 {
    let (sum, count) = steps
        .iter()
        .filter(|&&(s, _)| tokens[s] != BLANK_ID && tokens[s] != SEPARATOR_ID)
        .fold((0.0f64, 0usize), |(sum, n), &(s, t)| {
            (sum + log_probs[t][tokens[s]] as f64, n + 1)
        });
    if count == 0 {
        return f32::NEG_INFINITY;
    }
    (sum / count as f64) as f32
}
