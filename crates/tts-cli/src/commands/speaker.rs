//! Speaker profile commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use runtime::{SpeakerRegistry, TtsPipeline};
use tracing::info;
use tts_core::{Lang, TtsConfig};

#[derive(Debug, Subcommand)]
pub enum SpeakerCommand {
    /// Build a profile from a reference recording
    Create {
        /// Reference WAV file
        audio: PathBuf,

        /// Transcript of the recording
        #[arg(short, long)]
        transcript: String,

        /// Language (en, ja, ko, zh)
        #[arg(long, default_value = "en")]
        lang: String,

        /// Output profile file (JSON)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print a profile's contents
    Show {
        /// Profile file (JSON)
        profile: PathBuf,
    },

    /// List profiles in a speakers directory
    List {
        /// Directory of `<lang>_<name>.json` files; defaults to the config's
        dir: Option<PathBuf>,
    },
}

/// Run a speaker command.
pub fn run(cmd: SpeakerCommand, config: &TtsConfig) -> Result<()> {
    match cmd {
        SpeakerCommand::Create {
            audio,
            transcript,
            lang,
            output,
        } => {
            let lang: Lang = lang.parse()?;
            let pipeline = TtsPipeline::mock_from_config(config)?;
            let waveform = audio_codec::wav::read_wav(&audio)
                .with_context(|| format!("failed to read {}", audio.display()))?;
            let profile = pipeline.build_speaker_profile(&waveform, Some(&transcript), lang)?;
            pipeline.save_speaker(&profile, &output)?;

            info!(output = %output.display(), "speaker profile saved");
            println!(
                "Saved {} ({} words, {} acoustic tokens, {:.2}s)",
                output.display(),
                profile.words().len(),
                profile.acoustic_tokens().len(),
                profile.duration_secs(config.model.tokens_per_second)
            );
        }
        SpeakerCommand::Show { profile } => {
            let p = runtime::load_speaker(&profile)?;
            println!("Language:    {}", p.language());
            println!("Transcript:  {}", p.transcript());
            println!("Text tokens: {}", p.text_tokens().len());
            println!(
                "Audio:       {} tokens ({:.2}s)",
                p.acoustic_tokens().len(),
                p.duration_secs(config.model.tokens_per_second)
            );
            println!("Words:");
            for w in p.words() {
                println!("  {:>5}..={:<5} {}", w.start, w.end, w.word);
            }
        }
        SpeakerCommand::List { dir } => {
            let dir = dir
                .or_else(|| config.speakers_dir.clone())
                .context("no speakers directory given or configured")?;
            let registry = SpeakerRegistry::load_dir(&dir)?;
            for lang in Lang::ALL {
                let names = registry.names(lang);
                if !names.is_empty() {
                    println!("{lang}: {}", names.join(", "));
                }
            }
        }
    }
    Ok(())
}
