//! Normalize command implementation.

use anyhow::Result;
use text_normalizer::{detect_language, Normalizer};
use tts_core::TextNormalizer;

use super::parse_lang;

/// Run the normalize command.
pub fn run(input: &str, lang: Option<&str>) -> Result<()> {
    let hint = parse_lang(lang)?;
    let result = Normalizer::new().normalize(input, hint)?;

    let source = if hint.is_some() { "given" } else { "detected" };
    println!("Input:      {input}");
    println!("Normalized: {}", result.text);
    println!("Language:   {} ({source})", result.lang);
    if hint.is_some_and(|l| l != detect_language(input)) {
        println!("Script suggests {} instead", detect_language(input));
    }
    println!("Words ({}):", result.words.len());
    for (i, word) in result.words.iter().enumerate() {
        println!("  {i:>3} {word}");
    }

    Ok(())
}
