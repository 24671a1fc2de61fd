//! Tokenize command implementation.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use text_normalizer::Normalizer;
use text_tokenizer::{TextEncoder, Tokenizer};
use tts_core::TtsConfig;

use super::parse_lang;

/// Run the tokenize command.
pub fn run(input: &str, lang: Option<&str>, tokenizer: Option<&Path>, config: &TtsConfig) -> Result<()> {
    let lang = parse_lang(lang)?;
    let layout = config.model.layout.clone();
    let encoder = match tokenizer {
        Some(path) => TextEncoder::new(
            Arc::new(Normalizer::new()),
            Arc::new(Tokenizer::from_file(path)?),
            layout,
        )?,
        None => TextEncoder::with_defaults(layout)?,
    };

    let encoded = encoder.encode(input, lang)?;
    println!("Normalized: {}", encoded.text.text);
    println!("Tokens ({}): {:?}", encoded.tokens.len(), encoded.tokens);
    println!("Decoded:    {}", encoder.decode(&encoded.tokens)?);

    Ok(())
}
