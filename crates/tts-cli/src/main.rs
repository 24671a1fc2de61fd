//! Command-line interface for the token-based TTS engine.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;

mod commands;

/// Token-based TTS engine CLI
#[derive(Debug, Parser)]
#[command(name = "tts")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Log format (json or text)
    #[arg(long, default_value = "text", global = true)]
    log_format: LogFormatArg,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Json,
    Text,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Synthesize text to audio with the mock backend
    Synth(commands::synth::SynthArgs),

    /// Normalize text without synthesis (dry run)
    Normalize {
        /// Input text
        input: String,

        /// Language (en, ja, ko, zh); detected from the script when omitted
        #[arg(long)]
        lang: Option<String>,
    },

    /// Normalize and tokenize text (dry run)
    Tokenize {
        /// Input text
        input: String,

        /// Language (en, ja, ko, zh); detected from the script when omitted
        #[arg(long)]
        lang: Option<String>,

        /// tokenizer.json to use instead of the byte-level tokenizer
        #[arg(short, long)]
        tokenizer: Option<PathBuf>,
    },

    /// Build, inspect and list speaker profiles
    #[command(subcommand)]
    Speaker(commands::speaker::SpeakerCommand),

    /// Encode a WAV file to codec tokens and decode it back
    Codec {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show version and model constants
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = match cli.log_format {
        LogFormatArg::Json => runtime::logging::LogFormat::Json,
        LogFormatArg::Text => runtime::logging::LogFormat::Text,
    };
    runtime::logging::init_logging(&cli.log_level, format);

    info!(version = env!("CARGO_PKG_VERSION"), "starting tts cli");

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Synth(args) => {
            commands::synth::run(args, &config)
                .await
                .context("synthesis failed")?;
        }
        Commands::Normalize { input, lang } => {
            commands::normalize::run(&input, lang.as_deref()).context("normalization failed")?;
        }
        Commands::Tokenize {
            input,
            lang,
            tokenizer,
        } => {
            commands::tokenize::run(&input, lang.as_deref(), tokenizer.as_deref(), &config)
                .context("tokenization failed")?;
        }
        Commands::Speaker(cmd) => {
            commands::speaker::run(cmd, &config).context("speaker command failed")?;
        }
        Commands::Codec { input, output } => {
            commands::codec::run(&input, &output, &config).context("codec round trip failed")?;
        }
        Commands::Info => {
            commands::info::run(&config);
        }
    }

    Ok(())
}
