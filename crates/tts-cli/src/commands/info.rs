//! Info command implementation.

use tts_core::TtsConfig;

/// Run the info command.
pub fn run(config: &TtsConfig) {
    let spec = &config.model;
    println!("tts {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Model:          {} v{}", spec.name, spec.version);
    println!("Sample rate:    {} Hz", spec.sample_rate);
    println!("Tokens/second:  {}", spec.tokens_per_second);
    println!("Codebook:       {} codes", spec.codebook_size);
    println!("Context window: {} tokens", spec.context_window);
    println!(
        "Text ids:       {}..{}",
        spec.layout.text_offset,
        spec.layout.text_offset + spec.layout.text_vocab_size
    );
    println!(
        "Acoustic ids:   {}..{}",
        spec.layout.acoustic_offset,
        spec.layout.acoustic_offset + spec.layout.acoustic_vocab_size
    );
    println!("Control ids:    {:?}", spec.layout.control);
    if let Some(dir) = &config.speakers_dir {
        println!("Speakers dir:   {}", dir.display());
    }
}
