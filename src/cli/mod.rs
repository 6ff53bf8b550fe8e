use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::transcribe::{Mode, ModelSize};

#[derive(Parser)]
#[command(
    name = "yt2transcript",
    about = "Turn YouTube videos into transcripts (txt/srt/vtt) and optional summaries",
    version,
    long_about = "Downloads the audio track of a YouTube video and transcribes it with the \
OpenAI Whisper API or a local whisper.cpp model, writing plain-text, SRT, and WebVTT \
transcripts plus an optional GPT summary."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download and transcribe a YouTube video
    Transcribe {
        /// YouTube URL to transcribe
        #[arg(value_name = "URL")]
        url: String,

        /// Base directory for output files (defaults to the configured output dir)
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Transcription backend: OpenAI API, local whisper.cpp, or API with local fallback
        #[arg(short, long, value_enum, default_value = "local")]
        backend: Mode,

        /// Model size for local transcription (defaults to the configured size)
        #[arg(short, long, value_enum)]
        model_size: Option<ModelSize>,

        /// OpenAI API key (falls back to OPENAI_API_KEY)
        #[arg(long, env = "OPENAI_API_KEY", value_name = "KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Language hint (e.g. "en"); auto-detect if not specified
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Create a summary with GPT (requires an OpenAI API key)
        #[arg(long)]
        summarize: bool,

        /// GPT model for summarization
        #[arg(long, value_name = "MODEL", default_value = "gpt-3.5-turbo")]
        gpt_model: String,

        /// Keep the downloaded audio file next to the transcripts
        #[arg(long)]
        keep_audio: bool,
    },

    /// Show or initialize the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List locally installed whisper models
    Models,
}
