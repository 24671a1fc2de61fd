//! Codec round-trip command implementation.

use std::path::Path;

use anyhow::Result;
use audio_codec::{wav, VqCodec};
use tracing::info;
use tts_core::{AudioCodec, TtsConfig};

/// Encode a WAV file and decode the codes back to audio.
pub fn run(input: &Path, output: &Path, config: &TtsConfig) -> Result<()> {
    let codec = VqCodec::from_config(&config.codec)?;
    let audio = wav::read_wav(input)?;
    let codes = codec.encode(&audio)?;
    let decoded = codec.decode(&codes)?;
    wav::write_wav(output, &decoded)?;

    info!(codes = codes.len(), output = %output.display(), "codec round trip done");
    println!("Input:   {} ({} Hz, {:.2}s)", input.display(), audio.sample_rate(), audio.duration_ms() / 1000.0);
    println!("Codes:   {} ({:.1} per second)", codes.len(), codec.tokens_per_second());
    println!("Output:  {} ({} Hz, {:.2}s)", output.display(), decoded.sample_rate(), decoded.duration_ms() / 1000.0);

    Ok(())
}
