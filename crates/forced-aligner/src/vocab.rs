//! Character vocabulary and CTC target construction.

use std::collections::HashMap;

use tts_core::{TtsError, TtsResult};

/// Id of the CTC blank class.
pub const BLANK_ID: usize = 0;
/// Id of the word separator class.
pub const SEPARATOR_ID: usize = 1;
/// Character used for the word separator in labels.
pub const SEPARATOR: char = '|';

/// Output classes of an emission model: blank, word separator, characters
/// and one catch-all class for characters outside the alphabet.
#[derive(Debug, Clone)]
pub struct CharVocabulary {
    labels: Vec<String>,
    index: HashMap<char, usize>,
    unk_id: usize,
}

impl CharVocabulary {
    /// Build a vocabulary over the given alphabet.
    pub fn new(alphabet: impl IntoIterator<Item = char>) -> Self {
        let mut labels = vec!["<blank>".to_string(), SEPARATOR.to_string()];
        let mut index = HashMap::new();
        for c in alphabet {
            if c == SEPARATOR || c.is_whitespace() || index.contains_key(&c) {
                continue;
            }
            index.insert(c, labels.len());
            labels.push(c.to_string());
        }
        let unk_id = labels.len();
        labels.push("<unk>".to_string());
        Self {
            labels,
            index,
            unk_id,
        }
    }

    /// Lowercase Latin letters plus apostrophe.
    pub fn latin() -> Self {
        Self::new(('a'..='z').chain(std::iter::once('\'')))
    }

    /// Total number of classes.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of character classes (everything except blank and separator).
    pub fn num_chars(&self) -> usize {
        self.labels.len() - 2
    }

    pub fn unk_id(&self) -> usize {
        self.unk_id
    }

    /// Class id of a character; characters outside the alphabet map to unk.
    pub fn id(&self, c: char) -> usize {
        self.index.get(&c).copied().unwrap_or(self.unk_id)
    }

    pub fn label(&self, id: usize) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    /// Build the blank-interleaved target sequence for a transcript.
    ///
    /// Layout: `blank (c blank)+ (| blank (c blank)+)*`. The separator between
    /// words cannot be skipped by the search.
    pub fn targets(&self, transcript: &str) -> TtsResult<TargetSequence> {
        let lowered = transcript.to_lowercase();
        let words: Vec<String> = lowered.split_whitespace().map(str::to_string).collect();
        if words.is_empty() {
            return Err(TtsError::alignment("transcript is empty"));
        }

        let mut tokens = vec![BLANK_ID];
        let mut word_of_state = vec![None];
        for (w, word) in words.iter().enumerate() {
            if w > 0 {
                tokens.extend([SEPARATOR_ID, BLANK_ID]);
                word_of_state.extend([None, None]);
            }
            for c in word.chars() {
                tokens.extend([self.id(c), BLANK_ID]);
                word_of_state.extend([Some(w), None]);
            }
        }

        Ok(TargetSequence {
            tokens,
            word_of_state,
            words,
        })
    }
}

impl Default for CharVocabulary {
    fn default() -> Self {
        Self::latin()
    }
}

/// CTC target states for one transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSequence {
    /// Class id per trellis state.
    pub tokens: Vec<usize>,
    /// Word index of each character state; `None` for blanks and separators.
    pub word_of_state: Vec<Option<usize>>,
    /// Words of the transcript, lowercased.
    pub words: Vec<String>,
}

impl TargetSequence {
    /// Fewest frames any path through these states can take.
    ///
    /// Every character and separator needs one frame, and a repeated class
    /// needs a blank frame in between.
    pub fn min_frames(&self) -> usize {
        let labels: Vec<usize> = self
            .tokens
            .iter()
            .copied()
            .filter(|&t| t != BLANK_ID)
            .collect();
        let repeats = labels.windows(2).filter(|w| w[0] == w[1]).count();
        labels.len() + repeats
    }
}
