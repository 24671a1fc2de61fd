//! Token vocabularies and their numeric layout.
//!
//! The sequence model sees one flat id space that holds three disjoint
//! groups: text tokens, acoustic tokens, and a handful of control tokens.
//! [`TokenLayout`] owns the ranges and is the only place ids get classified.

use serde::{Deserialize, Serialize};

use crate::error::{TtsError, TtsResult};

/// Reserved control tokens understood by the sequence model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlToken {
    /// Start of the whole input sequence.
    SequenceStart,
    /// Start of a speaker profile block.
    ProfileStart,
    /// Separates profile text tokens from profile acoustic tokens.
    ProfileAudio,
    /// End of a speaker profile block.
    ProfileEnd,
    /// Marks where generated acoustic tokens begin.
    GenerationStart,
    /// Emitted by the model to stop generation.
    EndOfGeneration,
}

impl ControlToken {
    /// All control tokens in id-assignment order.
    pub const ALL: [ControlToken; 6] = [
        ControlToken::SequenceStart,
        ControlToken::ProfileStart,
        ControlToken::ProfileAudio,
        ControlToken::ProfileEnd,
        ControlToken::GenerationStart,
        ControlToken::EndOfGeneration,
    ];
}

/// Concrete ids assigned to each control token for one model version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlTokenIds {
    pub sequence_start: u32,
    pub profile_start: u32,
    pub profile_audio: u32,
    pub profile_end: u32,
    pub generation_start: u32,
    pub end_of_generation: u32,
}

impl ControlTokenIds {
    /// Assign consecutive ids starting at `base`.
    ///
    /// Fails with `Config` when the last id would not fit in a `u32`.
    pub fn consecutive(base: u32) -> TtsResult<Self> {
        let last = ControlToken::ALL.len() as u32 - 1;
        if base.checked_add(last).is_none() {
            return Err(TtsError::config(format!(
                "control ids starting at {base} overflow the u32 id space"
            )));
        }
        Ok(Self::saturating(base))
    }

    fn saturating(base: u32) -> Self {
        Self {
            sequence_start: base,
            profile_start: base.saturating_add(1),
            profile_audio: base.saturating_add(2),
            profile_end: base.saturating_add(3),
            generation_start: base.saturating_add(4),
            end_of_generation: base.saturating_add(5),
        }
    }

    /// Id of a control token.
    pub fn id(&self, token: ControlToken) -> u32 {
        match token {
            ControlToken::SequenceStart => self.sequence_start,
            ControlToken::ProfileStart => self.profile_start,
            ControlToken::ProfileAudio => self.profile_audio,
            ControlToken::ProfileEnd => self.profile_end,
            ControlToken::GenerationStart => self.generation_start,
            ControlToken::EndOfGeneration => self.end_of_generation,
        }
    }

    /// Reverse lookup of a control id.
    pub fn lookup(&self, id: u32) -> Option<ControlToken> {
        ControlToken::ALL.into_iter().find(|&t| self.id(t) == id)
    }
}

/// Vocabulary membership of a single token id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Reserved control token.
    Control(ControlToken),
    /// Text token; payload is the index within the text vocabulary.
    Text(u32),
    /// Acoustic token; payload is the codec code.
    Acoustic(u32),
}

/// Numeric layout of the text, acoustic, and control vocabularies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLayout {
    /// First id of the text vocabulary.
    pub text_offset: u32,
    /// Number of text tokens.
    pub text_vocab_size: u32,
    /// First id of the acoustic vocabulary.
    pub acoustic_offset: u32,
    /// Number of acoustic tokens (codec codebook size).
    pub acoustic_vocab_size: u32,
    /// Control token ids.
    pub control: ControlTokenIds,
}

impl TokenLayout {
    /// Text ids first, then the six control ids, then the acoustic ids.
    ///
    /// Ids past the end of the `u32` space saturate, so [`validate`](Self::validate)
    /// rejects an oversized layout instead of wrapping it around.
    pub fn contiguous(text_vocab_size: u32, acoustic_vocab_size: u32) -> Self {
        let control_base = text_vocab_size;
        let acoustic_offset = control_base.saturating_add(ControlToken::ALL.len() as u32);
        Self {
            text_offset: 0,
            text_vocab_size,
            acoustic_offset,
            acoustic_vocab_size,
            control: ControlTokenIds::saturating(control_base),
        }
    }

    /// Checked form of [`contiguous`](Self::contiguous) that also validates the result.
    pub fn try_contiguous(text_vocab_size: u32, acoustic_vocab_size: u32) -> TtsResult<Self> {
        let control = ControlTokenIds::consecutive(text_vocab_size)?;
        let acoustic_offset = text_vocab_size
            .checked_add(ControlToken::ALL.len() as u32)
            .ok_or_else(|| TtsError::config("acoustic offset overflows the u32 id space"))?;
        let layout = Self {
            text_offset: 0,
            text_vocab_size,
            acoustic_offset,
            acoustic_vocab_size,
            control,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Check that the three vocabularies are non-empty and disjoint.
    pub fn validate(&self) -> TtsResult<()> {
        if self.text_vocab_size == 0 {
            return Err(TtsError::config("text vocabulary is empty"));
        }
        if self.acoustic_vocab_size == 0 {
            return Err(TtsError::config("acoustic vocabulary is empty"));
        }

        let text = range_u64(self.text_offset, self.text_vocab_size);
        let acoustic = range_u64(self.acoustic_offset, self.acoustic_vocab_size);
        if text.1 > u32::MAX as u64 + 1 || acoustic.1 > u32::MAX as u64 + 1 {
            return Err(TtsError::config("token range exceeds the u32 id space"));
        }
        if text.0 < acoustic.1 && acoustic.0 < text.1 {
            return Err(TtsError::config(format!(
                "text range {:?} overlaps acoustic range {:?}",
                text, acoustic
            )));
        }

        let mut seen = Vec::with_capacity(ControlToken::ALL.len());
        for token in ControlToken::ALL {
            let id = self.control.id(token) as u64;
            if (text.0..text.1).contains(&id) || (acoustic.0..acoustic.1).contains(&id) {
                return Err(TtsError::config(format!(
                    "control token {token:?} (id {id}) collides with a vocabulary range"
                )));
            }
            if seen.contains(&id) {
                return Err(TtsError::config(format!(
                    "control token {token:?} reuses id {id}"
                )));
            }
            seen.push(id);
        }

        Ok(())
    }

    /// Smallest vocabulary size that covers every id in the layout.
    pub fn vocab_size(&self) -> usize {
        let text_end = range_u64(self.text_offset, self.text_vocab_size).1;
        let acoustic_end = range_u64(self.acoustic_offset, self.acoustic_vocab_size).1;
        let control_end = ControlToken::ALL
            .iter()
            .map(|&t| self.control.id(t) as u64 + 1)
            .max()
            .unwrap_or(0);
        text_end.max(acoustic_end).max(control_end) as usize
    }

    /// Classify an id, or `None` if it belongs to no vocabulary.
    pub fn classify(&self, id: u32) -> Option<TokenKind> {
        if let Some(control) = self.control.lookup(id) {
            return Some(TokenKind::Control(control));
        }
        if let Some(local) = local_index(id, self.text_offset, self.text_vocab_size) {
            return Some(TokenKind::Text(local));
        }
        local_index(id, self.acoustic_offset, self.acoustic_vocab_size).map(TokenKind::Acoustic)
    }

    /// Classify an id, failing with `InvalidToken` for ids outside the layout.
    pub fn try_classify(&self, id: u32) -> TtsResult<TokenKind> {
        self.classify(id)
            .ok_or_else(|| TtsError::invalid_token(format!("token id {id} is outside every vocabulary")))
    }

    /// Id of a control token.
    pub fn control_id(&self, token: ControlToken) -> u32 {
        self.control.id(token)
    }

    /// Global id for a text-vocabulary index.
    pub fn text_token(&self, index: u32) -> TtsResult<u32> {
        if index >= self.text_vocab_size {
            return Err(TtsError::invalid_token(format!(
                "text index {index} outside vocabulary of {}",
                self.text_vocab_size
            )));
        }
        Ok(self.text_offset + index)
    }

    /// Global id for a codec code.
    pub fn acoustic_token(&self, code: u32) -> TtsResult<u32> {
        if code >= self.acoustic_vocab_size {
            return Err(TtsError::invalid_token(format!(
                "acoustic code {code} outside codebook of {}",
                self.acoustic_vocab_size
            )));
        }
        Ok(self.acoustic_offset + code)
    }

    /// Codec code for a global id, if the id is acoustic.
    pub fn acoustic_code(&self, id: u32) -> Option<u32> {
        match self.classify(id) {
            Some(TokenKind::Acoustic(code)) => Some(code),
            _ => None,
        }
    }

    /// Whether the id is an acoustic token.
    pub fn is_acoustic(&self, id: u32) -> bool {
        self.acoustic_code(id).is_some()
    }

    /// Whether the id is a text token.
    pub fn is_text(&self, id: u32) -> bool {
        matches!(self.classify(id), Some(TokenKind::Text(_)))
    }
}

fn range_u64(offset: u32, size: u32) -> (u64, u64) {
    (offset as u64, offset as u64 + size as u64)
}

fn local_index(id: u32, offset: u32, size: u32) -> Option<u32> {
    let local = id.checked_sub(offset)?;
    (local < size).then_some(local)
}
