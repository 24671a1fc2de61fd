//! Synthesis command implementation.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{debug, info};

use audio_codec::wav::write_raw_pcm;
use runtime::{speakers, TtsPipeline};
use tts_core::{GenerationConfig, Lang, SpeakerProfile, TtsConfig};

#[derive(Debug, Args)]
pub struct SynthArgs {
    /// Input text or file path (use @file.txt for file input)
    input: String,

    /// Output WAV file; use `-` with --raw to write PCM to stdout
    #[arg(short, long)]
    output: PathBuf,

    /// Language (en, ja, ko, zh)
    #[arg(long, default_value = "en")]
    lang: String,

    /// Speaker profile file (JSON)
    #[arg(long, conflicts_with = "speaker")]
    speaker_file: Option<PathBuf>,

    /// Default speaker name from the configured speakers directory
    #[arg(short, long)]
    speaker: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Repetition penalty
    #[arg(long)]
    repetition_penalty: Option<f32>,

    /// Maximum number of generated tokens
    #[arg(long)]
    max_length: Option<usize>,

    /// Random seed for deterministic generation
    #[arg(long)]
    seed: Option<u64>,

    /// Write raw 16-bit little-endian PCM instead of WAV
    #[arg(long)]
    raw: bool,
}

impl SynthArgs {
    fn generation_config(&self, base: &GenerationConfig) -> Result<GenerationConfig> {
        let mut config = GenerationConfig::new(
            self.temperature.unwrap_or(base.temperature),
            self.repetition_penalty.unwrap_or(base.repetition_penalty),
            self.max_length.unwrap_or(base.max_length),
        )?
        .with_top_k(base.top_k)
        .with_top_p(base.top_p);
        if let Some(seed) = self.seed.or(base.seed) {
            config = config.with_seed(seed);
        }
        Ok(config)
    }
}

fn resolve_speaker(
    args: &SynthArgs,
    pipeline: &TtsPipeline,
    lang: Lang,
) -> Result<Option<Arc<SpeakerProfile>>> {
    if let Some(path) = &args.speaker_file {
        let profile = pipeline
            .load_speaker(path)
            .with_context(|| format!("failed to load speaker from {}", path.display()))?;
        return Ok(Some(Arc::new(profile)));
    }
    let Some(name) = &args.speaker else {
        return Ok(None);
    };
    match pipeline.default_speaker(lang, name) {
        Some(profile) => Ok(Some(profile)),
        None => {
            let known = speakers::global()
                .map(|r| r.names(lang).join(", "))
                .unwrap_or_default();
            bail!("no {lang} speaker named {name:?}; available: [{known}]")
        }
    }
}

/// Run the synthesis command.
pub async fn run(args: SynthArgs, config: &TtsConfig) -> Result<()> {
    let start = Instant::now();
    let lang: Lang = args.lang.parse()?;

    let text = if let Some(path) = args.input.strip_prefix('@') {
        info!(path = path, "reading text from file");
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?
    } else {
        args.input.clone()
    };
    if text.trim().is_empty() {
        bail!("input text is empty");
    }

    let generation = args.generation_config(&config.generation)?;
    let pipeline = Arc::new(TtsPipeline::mock_from_config(config)?);
    let profile = resolve_speaker(&args, &pipeline, lang)?;

    info!(
        text_len = text.len(),
        lang = %lang,
        output = %args.output.display(),
        with_speaker = profile.is_some(),
        "starting synthesis"
    );

    let synth_start = Instant::now();
    let out = pipeline
        .generate_async(text.clone(), lang, profile, generation, None)
        .await?;
    let synth_duration = synth_start.elapsed();

    debug!(
        samples = out.waveform.num_samples(),
        steps = out.steps,
        reason = %out.stop_reason,
        "synthesis completed"
    );

    if args.raw {
        if args.output.as_os_str() == "-" {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write_raw_pcm(&mut lock, out.waveform.samples())?;
            lock.flush()?;
            return Ok(());
        }
        let mut file = std::fs::File::create(&args.output)?;
        write_raw_pcm(&mut file, out.waveform.samples())?;
    } else {
        out.save(&args.output)?;
    }

    let audio_secs = out.duration_secs();
    let rtf = if audio_secs > 0.0 {
        synth_duration.as_secs_f32() / audio_secs
    } else {
        0.0
    };

    println!("Synthesis complete!");
    println!();
    println!("Input:     {} chars", text.len());
    println!("Language:  {lang}");
    println!("Output:    {}", args.output.display());
    println!();
    println!("Audio:");
    println!("  Duration:    {audio_secs:.2} sec");
    println!("  Samples:     {}", out.waveform.num_samples());
    println!("  Sample rate: {} Hz", out.waveform.sample_rate());
    println!("  Tokens:      {} ({})", out.codes.len(), out.stop_reason);
    println!();
    println!("Performance:");
    println!("  Synthesis:   {} ms", synth_duration.as_millis());
    println!("  Total:       {} ms", start.elapsed().as_millis());
    println!("  RTF:         {rtf:.3}x");

    Ok(())
}
