//! yt2transcript - turn YouTube videos into offline-readable transcripts
//!
//! This library downloads the audio track of a YouTube video and transcribes
//! it with either the OpenAI Whisper API or a local whisper.cpp model, with
//! automatic fallback between the two, then renders the result as plain text
//! and subtitle files.

pub mod cli;
pub mod config;
pub mod extractor;
pub mod output;
pub mod summarize;
pub mod transcribe;
pub mod transcript;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use extractor::{AudioExtractor, ExtractedAudio};
pub use summarize::Summarizer;
pub use transcribe::{
    Mode, ModelSize, PipelineReport, TranscribeError, TranscribeOptions, TranscriptionBackend,
    TranscriptionPipeline,
};
pub use transcript::{Backend, NormalizedTranscript, Segment, Word};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
