//! CLI command implementations.

pub mod codec;
pub mod info;
pub mod normalize;
pub mod speaker;
pub mod synth;
pub mod tokenize;

use std::path::Path;

use anyhow::{Context, Result};
use tts_core::{Lang, TtsConfig};

/// Engine config from a file, or the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<TtsConfig> {
    match path {
        Some(path) => TtsConfig::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(TtsConfig::default()),
    }
}

/// Parse an optional language argument.
pub fn parse_lang(lang: Option<&str>) -> Result<Option<Lang>> {
    lang.map(|l| l.parse::<Lang>().map_err(anyhow::Error::from))
        .transpose()
}
