use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::transcript::{Backend, NormalizedTranscript, Segment};

pub mod model_fetch;
pub mod openai_api;
pub mod whisper_local;

/// Errors shared by both backends and the orchestrator. Every variant names
/// the backend it originated from so the caller can tell why remote was
/// skipped and why local failed.
#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    /// Deterministic pre-flight rejection, never retried.
    #[error("{backend}: audio file is {size} bytes, over the {limit} byte ceiling")]
    FileTooLarge {
        backend: Backend,
        size: u64,
        limit: u64,
    },

    /// Engine could not be reached or initialized (auth, quota, network,
    /// model load, inference failure).
    #[error("{backend} backend unavailable: {reason}")]
    BackendUnavailable { backend: Backend, reason: String },

    /// The input audio could not be decoded.
    #[error("{backend}: unsupported audio input: {reason}")]
    UnsupportedAudio { backend: Backend, reason: String },

    /// The backend returned segments that violate the transcript invariants.
    #[error("{backend} produced an invalid transcript: {reason}")]
    InvalidTranscript { backend: Backend, reason: String },

    /// Auto-mode composite: both attempts failed.
    #[error("all backends failed; remote: {remote}; local: {local}")]
    AllBackendsFailed {
        remote: Box<TranscribeError>,
        local: Box<TranscribeError>,
    },
}

impl TranscribeError {
    /// Whether an auto-mode remote failure warrants trying the local model.
    /// Size rejections, unavailability, and invariant violations are
    /// remote-specific; anything else would fail locally too.
    fn eligible_for_fallback(&self) -> bool {
        matches!(
            self,
            TranscribeError::FileTooLarge { .. }
                | TranscribeError::BackendUnavailable { .. }
                | TranscribeError::InvalidTranscript { .. }
        )
    }
}

/// Whisper model sizes for local transcription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    #[default]
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        }
    }

    /// ggml checkpoint filename as published on Hugging Face.
    pub fn ggml_filename(&self) -> String {
        // large checkpoints were renamed upstream; v3 is current
        match self {
            ModelSize::Large => "ggml-large-v3.bin".to_string(),
            other => format!("ggml-{}.bin", other.as_str()),
        }
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which backend(s) the orchestrator may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// OpenAI Whisper API only
    Api,
    /// Local whisper.cpp only
    Local,
    /// API first, local fallback on failure
    Auto,
}

/// Per-run options passed to the adapters.
#[derive(Debug, Clone, Default)]
pub struct TranscribeOptions {
    /// Language hint, passed through to the engine
    pub language: Option<String>,

    /// Model size for the local backend
    pub model_size: ModelSize,
}

/// Raw adapter output before validation. The orchestrator, not the adapter,
/// stamps which backend a transcript came from.
#[derive(Debug, Clone)]
pub struct RawTranscript {
    pub segments: Vec<Segment>,
    pub language: Option<String>,
}

/// A transcription engine behind the uniform `transcribe` contract.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    fn kind(&self) -> Backend;

    async fn transcribe(
        &self,
        audio_path: &Path,
        options: &TranscribeOptions,
    ) -> Result<RawTranscript, TranscribeError>;
}

/// Outcome report for one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Backend that actually produced the transcript
    pub backend_used: Backend,

    /// Why the remote attempt was abandoned, when auto mode fell back
    pub fallback_cause: Option<String>,

    /// Wall-clock transcription time in seconds
    pub elapsed_secs: f64,

    /// Timestamp when the transcript was finalized
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// The transcription pipeline orchestrator.
///
/// Selects which adapter(s) to run for the requested [`Mode`], executes with
/// fallback in auto mode, and validates adapter output into a
/// [`NormalizedTranscript`]. Backends are trait objects so tests can inject
/// deterministic fakes.
pub struct TranscriptionPipeline {
    remote: Box<dyn TranscriptionBackend>,
    local: Box<dyn TranscriptionBackend>,
}

impl TranscriptionPipeline {
    pub fn new(
        remote: Box<dyn TranscriptionBackend>,
        local: Box<dyn TranscriptionBackend>,
    ) -> Self {
        Self { remote, local }
    }

    /// Transcribe one audio file.
    ///
    /// Exactly one successful adapter invocation produces the transcript;
    /// partial results from a failed attempt are discarded entirely.
    pub async fn run(
        &self,
        audio_path: &Path,
        mode: Mode,
        options: &TranscribeOptions,
    ) -> Result<(NormalizedTranscript, PipelineReport), TranscribeError> {
        let started = std::time::Instant::now();

        let (transcript, fallback_cause) = match mode {
            Mode::Api => (
                self.attempt(self.remote.as_ref(), audio_path, options).await?,
                None,
            ),
            Mode::Local => (
                self.attempt(self.local.as_ref(), audio_path, options).await?,
                None,
            ),
            Mode::Auto => self.run_auto(audio_path, options).await?,
        };

        let report = PipelineReport {
            backend_used: transcript.backend_used(),
            fallback_cause,
            elapsed_secs: started.elapsed().as_secs_f64(),
            completed_at: chrono::Utc::now(),
        };

        tracing::info!(
            backend = %report.backend_used,
            segments = transcript.segments().len(),
            elapsed_secs = report.elapsed_secs,
            "transcription complete"
        );

        Ok((transcript, report))
    }

    /// Auto mode: remote first, then local with the default model size.
    async fn run_auto(
        &self,
        audio_path: &Path,
        options: &TranscribeOptions,
    ) -> Result<(NormalizedTranscript, Option<String>), TranscribeError> {
        let remote_err = match self.attempt(self.remote.as_ref(), audio_path, options).await {
            Ok(transcript) => return Ok((transcript, None)),
            Err(err) if err.eligible_for_fallback() => err,
            Err(err) => return Err(err),
        };

        tracing::warn!(cause = %remote_err, "remote transcription failed, falling back to local");

        let fallback_options = TranscribeOptions {
            language: options.language.clone(),
            model_size: ModelSize::default(),
        };

        match self
            .attempt(self.local.as_ref(), audio_path, &fallback_options)
            .await
        {
            Ok(transcript) => Ok((transcript, Some(remote_err.to_string()))),
            Err(local_err) => Err(TranscribeError::AllBackendsFailed {
                remote: Box::new(remote_err),
                local: Box::new(local_err),
            }),
        }
    }

    /// Run one adapter and validate its output. An invariant violation is a
    /// failure of that backend, not of the orchestrator.
    async fn attempt(
        &self,
        backend: &dyn TranscriptionBackend,
        audio_path: &Path,
        options: &TranscribeOptions,
    ) -> Result<NormalizedTranscript, TranscribeError> {
        let kind = backend.kind();
        tracing::debug!(backend = %kind, path = %audio_path.display(), "invoking backend");

        let raw = backend.transcribe(audio_path, options).await?;
        let language = raw.language.or_else(|| options.language.clone());

        NormalizedTranscript::new(raw.segments, language, kind).map_err(|violation| {
            TranscribeError::InvalidTranscript {
                backend: kind,
                reason: violation.to_string(),
            }
        })
    }
}
