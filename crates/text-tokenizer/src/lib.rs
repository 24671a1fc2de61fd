//! # text-tokenizer
//!
//! Text tokenization for the TTS engine.
//!
//! This crate provides:
//! - [`Tokenizer`], a wrapper around a HuggingFace `tokenizer.json`
//! - [`ByteTokenizer`], a dependency-free byte-level tokenizer
//! - [`TextEncoder`], which runs normalization and tokenization and maps the
//!   result into the model's text-token range
//!
//! # Example
//!
//! ```
//! use text_tokenizer::TextEncoder;
//! use tts_core::{Lang, TokenLayout};
//!
//! let encoder = TextEncoder::with_defaults(TokenLayout::contiguous(256, 4096)).unwrap();
//! let encoded = encoder.encode("Hello world", Some(Lang::En)).unwrap();
//! assert_eq!(encoded.text.words, vec!["hello", "world"]);
//! assert_eq!(encoded.tokens.len(), "hello world".len());
//! ```

mod encoder;

use std::path::Path;

use tracing::instrument;
use tts_core::{NormText, TextTokenizer, TokenSeq, TtsError, TtsResult};

pub use encoder::{EncodedText, TextEncoder};

/// Tokenizer wrapper around a HuggingFace `tokenizer.json`.
#[derive(Debug)]
pub struct Tokenizer {
    inner: tokenizers::Tokenizer,
}

impl Tokenizer {
    /// Load a tokenizer from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> TtsResult<Self> {
        let path = path.as_ref();
        let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| TtsError::ModelLoad {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
        })?;
        Ok(Self { inner })
    }

    /// Create a tokenizer from JSON string.
    pub fn from_json(json: &str) -> TtsResult<Self> {
        let inner = tokenizers::Tokenizer::from_bytes(json.as_bytes())
            .map_err(|e| TtsError::config(format!("invalid tokenizer JSON: {e}")))?;
        Ok(Self { inner })
    }

    /// Get the underlying tokenizers::Tokenizer.
    pub fn inner(&self) -> &tokenizers::Tokenizer {
        &self.inner
    }
}

impl TextTokenizer for Tokenizer {
    #[instrument(skip(self, text), fields(text_len = text.text.len()))]
    fn encode(&self, text: &NormText) -> TtsResult<TokenSeq> {
        // Control tokens come from the token layout, never from the tokenizer.
        let encoding = self
            .inner
            .encode(text.text.as_str(), false)
            .map_err(|e| TtsError::tokenization(e.to_string()))?;

        Ok(TokenSeq::new(
            encoding.get_ids().to_vec(),
            encoding.get_offsets().to_vec(),
        ))
    }

    #[instrument(skip(self, tokens), fields(num_tokens = tokens.len()))]
    fn decode(&self, tokens: &TokenSeq) -> TtsResult<String> {
        self.inner
            .decode(&tokens.ids, true)
            .map_err(|e| TtsError::tokenization(e.to_string()))
    }

    fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}

/// Byte-level tokenizer: every UTF-8 byte of the text is one token.
///
/// Lossless for any script and needs no model files, so it backs the mock
/// pipeline and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct ByteTokenizer;

impl ByteTokenizer {
    /// Number of distinct byte tokens.
    pub const VOCAB_SIZE: usize = 256;

    pub fn new() -> Self {
        Self
    }
}

impl TextTokenizer for ByteTokenizer {
    fn encode(&self, text: &NormText) -> TtsResult<TokenSeq> {
        let ids: Vec<u32> = text.text.bytes().map(u32::from).collect();
        let offsets = (0..ids.len()).map(|i| (i, i + 1)).collect();
        Ok(TokenSeq::new(ids, offsets))
    }

    fn decode(&self, tokens: &TokenSeq) -> TtsResult<String> {
        let bytes = tokens
            .ids
            .iter()
            .map(|&id| {
                u8::try_from(id)
                    .map_err(|_| TtsError::tokenization(format!("id {id} is not a byte token")))
            })
            .collect::<TtsResult<Vec<u8>>>()?;
        String::from_utf8(bytes).map_err(|e| TtsError::tokenization(e.to_string()))
    }

    fn vocab_size(&self) -> usize {
        Self::VOCAB_SIZE
    }
}
