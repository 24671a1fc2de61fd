//! Text encoder: raw text to model text-token ids.

use std::sync::Arc;

use text_normalizer::Normalizer;
use tracing::{debug, instrument};
use tts_core::{
    Lang, NormText, TextNormalizer, TextTokenizer, TokenKind, TokenLayout, TokenSeq, TtsError,
    TtsResult,
};

use crate::ByteTokenizer;

/// Normalized text together with its text-token ids in the model id space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedText {
    pub text: NormText,
    pub tokens: Vec<u32>,
}

/// Normalizer + tokenizer + token layout.
///
/// Tokenizer ids are shifted into the layout's text range, so every id this
/// encoder returns classifies as a text token.
#[derive(Clone)]
pub struct TextEncoder {
    normalizer: Arc<dyn TextNormalizer>,
    tokenizer: Arc<dyn TextTokenizer>,
    layout: TokenLayout,
}

impl std::fmt::Debug for TextEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextEncoder")
            .field("tokenizer_vocab", &self.tokenizer.vocab_size())
            .field("layout", &self.layout)
            .finish()
    }
}

impl TextEncoder {
    /// Create an encoder, checking that the tokenizer fits the text range.
    pub fn new(
        normalizer: Arc<dyn TextNormalizer>,
        tokenizer: Arc<dyn TextTokenizer>,
        layout: TokenLayout,
    ) -> TtsResult<Self> {
        layout.validate()?;
        let vocab = tokenizer.vocab_size();
        if vocab > layout.text_vocab_size as usize {
            return Err(TtsError::config(format!(
                "tokenizer vocabulary of {vocab} does not fit the text range of {}",
                layout.text_vocab_size
            )));
        }
        Ok(Self {
            normalizer,
            tokenizer,
            layout,
        })
    }

    /// Default rule normalizer with the byte-level tokenizer.
    pub fn with_defaults(layout: TokenLayout) -> TtsResult<Self> {
        Self::new(
            Arc::new(Normalizer::new()),
            Arc::new(ByteTokenizer::new()),
            layout,
        )
    }

    pub fn layout(&self) -> &TokenLayout {
        &self.layout
    }

    /// Normalize text; language detected from the script when not given.
    pub fn normalize(&self, text: &str, lang: Option<Lang>) -> TtsResult<NormText> {
        self.normalizer.normalize(text, lang)
    }

    /// Normalize and tokenize raw text.
    #[instrument(skip(self, text), fields(text_len = text.len(), lang = ?lang))]
    pub fn encode(&self, text: &str, lang: Option<Lang>) -> TtsResult<EncodedText> {
        let norm = self.normalizer.normalize(text, lang)?;
        let tokens = self.encode_normalized(&norm)?;
        Ok(EncodedText { text: norm, tokens })
    }

    /// Tokenize already-normalized text into model text-token ids.
    pub fn encode_normalized(&self, text: &NormText) -> TtsResult<Vec<u32>> {
        let seq = self.tokenizer.encode(text)?;
        if seq.is_empty() {
            return Err(TtsError::tokenization(format!(
                "no tokens produced for {:?}",
                text.text
            )));
        }

        let tokens = seq
            .ids
            .iter()
            .map(|&id| self.layout.text_token(id))
            .collect::<TtsResult<Vec<u32>>>()?;

        debug!(num_tokens = tokens.len(), "encoded text");
        Ok(tokens)
    }

    /// Map model text-token ids back to text (for debugging).
    pub fn decode(&self, tokens: &[u32]) -> TtsResult<String> {
        let local = tokens
            .iter()
            .map(|&id| match self.layout.try_classify(id)? {
                TokenKind::Text(local) => Ok(local),
                other => Err(TtsError::invalid_token(format!(
                    "token {id} is {other:?}, not a text token"
                ))),
            })
            .collect::<TtsResult<Vec<u32>>>()?;
        self.tokenizer.decode(&TokenSeq::new(local, Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> TextEncoder {
        TextEncoder::with_defaults(TokenLayout::contiguous(256, 4096)).unwrap()
    }

    #[test]
    fn test_encode_produces_text_tokens() {
        let encoder = encoder();
        let encoded = encoder.encode("Hello, world!", Some(Lang::En)).unwrap();
        assert_eq!(encoded.text.text, "hello world");
        assert!(encoded.tokens.iter().all(|&t| encoder.layout().is_text(t)));
        assert_eq!(encoder.decode(&encoded.tokens).unwrap(), "hello world");
    }

    #[test]
    fn test_encode_respects_text_offset() {
        let mut layout = TokenLayout::contiguous(256, 16);
        layout.text_offset = 1000;
        layout.acoustic_offset = 2000;
        let encoder = TextEncoder::with_defaults(layout).unwrap();
        let encoded = encoder.encode("a", Some(Lang::En)).unwrap();
        assert_eq!(encoded.tokens, vec![1000 + 97]);
    }

    #[test]
    fn test_tokenizer_larger_than_text_range_rejected() {
        let layout = TokenLayout::contiguous(100, 4096);
        let err = TextEncoder::with_defaults(layout).unwrap_err();
        assert!(matches!(err, TtsError::Config(_)));
    }

    #[test]
    fn test_decode_rejects_acoustic_tokens() {
        let encoder = encoder();
        let acoustic = encoder.layout().acoustic_token(5).unwrap();
        assert!(matches!(
            encoder.decode(&[acoustic]),
            Err(TtsError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_empty_text_fails() {
        let encoder = encoder();
        assert!(encoder.encode("   ", None).is_err());
    }
}
