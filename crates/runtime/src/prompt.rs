//! Prompt layout fed to the sequence model.

use tracing::debug;
use tts_core::{ControlToken, SpeakerProfile, TokenLayout, TtsError, TtsResult};

/// Builds the token sequence the backend was trained on:
///
/// ```text
/// [SequenceStart]
/// [ProfileStart] ref_text.. [ProfileAudio] ref_acoustic.. [ProfileEnd]   (with a profile)
/// text..
/// [GenerationStart]
/// ```
///
/// The control ids come from the [`TokenLayout`], so the layout is the only
/// thing that varies between model versions.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    layout: TokenLayout,
}

impl PromptAssembler {
    pub fn new(layout: TokenLayout) -> TtsResult<Self> {
        layout.validate()?;
        Ok(Self { layout })
    }

    pub fn layout(&self) -> &TokenLayout {
        &self.layout
    }

    /// Number of tokens [`Self::assemble`] will produce.
    pub fn prompt_len(&self, text_len: usize, profile: Option<&SpeakerProfile>) -> usize {
        let profile_len = profile.map_or(0, |p| p.token_count() + 3);
        2 + profile_len + text_len
    }

    /// Assemble a prompt from text-token ids and an optional speaker profile.
    ///
    /// Every text id must be a text token and every profile token must sit in
    /// its own vocabulary; anything else is `InvalidToken`.
    pub fn assemble(
        &self,
        text_tokens: &[u32],
        profile: Option<&SpeakerProfile>,
    ) -> TtsResult<Vec<u32>> {
        if text_tokens.is_empty() {
            return Err(TtsError::invalid_token("prompt text is empty"));
        }
        if let Some(&id) = text_tokens.iter().find(|&&id| !self.layout.is_text(id)) {
            return Err(TtsError::invalid_token(format!(
                "prompt token {id} is not a text token"
            )));
        }

        let control = |t: ControlToken| self.layout.control_id(t);
        let mut prompt = Vec::with_capacity(self.prompt_len(text_tokens.len(), profile));
        prompt.push(control(ControlToken::SequenceStart));

        if let Some(profile) = profile {
            profile.validate_tokens(&self.layout)?;
            prompt.push(control(ControlToken::ProfileStart));
            prompt.extend_from_slice(profile.text_tokens());
            prompt.push(control(ControlToken::ProfileAudio));
            prompt.extend_from_slice(profile.acoustic_tokens());
            prompt.push(control(ControlToken::ProfileEnd));
        }

        prompt.extend_from_slice(text_tokens);
        prompt.push(control(ControlToken::GenerationStart));

        debug!(
            prompt_len = prompt.len(),
            with_profile = profile.is_some(),
            "assembled prompt"
        );
        Ok(prompt)
    }
}
