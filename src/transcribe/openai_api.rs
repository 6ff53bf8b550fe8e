//! OpenAI Whisper API backend.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::{RawTranscript, TranscribeError, TranscribeOptions, TranscriptionBackend};
use crate::transcript::{Backend, Segment};

/// Upload ceiling enforced by the OpenAI transcription endpoint.
pub const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Remote adapter submitting audio to the OpenAI Whisper API.
pub struct OpenAiBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

/// verbose_json transcription response
#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    text: String,
    language: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    segments: Vec<ApiSegment>,
}

#[derive(Debug, Deserialize)]
struct ApiSegment {
    start: f64,
    end: f64,
    text: String,
}

impl OpenAiBackend {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            // reqwest::Client::builder only fails for TLS backend misuse;
            // with rustls baked in the default build cannot fail.
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key,
            model,
        }
    }

    #[cfg(test)]
    fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    fn unavailable(&self, reason: impl Into<String>) -> TranscribeError {
        TranscribeError::BackendUnavailable {
            backend: Backend::Remote,
            reason: reason.into(),
        }
    }

    /// Reject oversized files before any network I/O. Deterministic given
    /// the input, so the orchestrator never retries it.
    fn check_file_size(&self, audio_path: &Path) -> Result<(), TranscribeError> {
        let metadata = fs_err::metadata(audio_path)
            .map_err(|e| self.unavailable(format!("cannot stat audio file: {e}")))?;

        let size = metadata.len();
        if size > MAX_UPLOAD_BYTES {
            return Err(TranscribeError::FileTooLarge {
                backend: Backend::Remote,
                size,
                limit: MAX_UPLOAD_BYTES,
            });
        }
        Ok(())
    }

    fn mime_type_for(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "mp3" => "audio/mpeg",
            "wav" => "audio/wav",
            "flac" => "audio/flac",
            "ogg" => "audio/ogg",
            "webm" => "audio/webm",
            _ => "audio/mp4",
        }
    }

    /// Map the service's flat segment list into our representation. The API
    /// has no word-level timing, so every segment carries an empty word set;
    /// when no segments come back at all, one segment spanning the whole
    /// audio is synthesized from the flat text.
    fn into_raw(response: VerboseTranscription) -> RawTranscript {
        let segments: Vec<Segment> = if response.segments.is_empty() {
            let text = response.text.trim();
            if text.is_empty() {
                Vec::new()
            } else {
                vec![Segment::new(0.0, response.duration.unwrap_or(0.0), text)]
            }
        } else {
            response
                .segments
                .into_iter()
                .map(|s| Segment::new(s.start, s.end, s.text))
                .collect()
        };

        RawTranscript {
            segments,
            language: response.language,
        }
    }
}

#[async_trait]
impl TranscriptionBackend for OpenAiBackend {
    fn kind(&self) -> Backend {
        Backend::Remote
    }

    async fn transcribe(
        &self,
        audio_path: &Path,
        options: &TranscribeOptions,
    ) -> Result<RawTranscript, TranscribeError> {
        if self.api_key.is_empty() {
            return Err(self.unavailable("no API key configured"));
        }

        self.check_file_size(audio_path)?;

        let bytes = fs_err::read(audio_path)
            .map_err(|e| self.unavailable(format!("cannot read audio file: {e}")))?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.m4a")
            .to_string();

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(Self::mime_type_for(audio_path))
            .map_err(|e| self.unavailable(format!("invalid mime type: {e}")))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        if let Some(lang) = &options.language {
            form = form.text("language", lang.clone());
        }

        tracing::info!(model = %self.model, "submitting audio to the OpenAI transcription API");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.unavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = match status.as_u16() {
                401 | 403 => format!("authentication rejected (HTTP {status})"),
                429 => format!("rate limit or quota exceeded (HTTP {status})"),
                _ => format!("HTTP {status}: {body}"),
            };
            return Err(self.unavailable(reason));
        }

        let parsed: VerboseTranscription = response
            .json()
            .await
            .map_err(|e| self.unavailable(format!("malformed API response: {e}")))?;

        Ok(Self::into_raw(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn backend() -> OpenAiBackend {
        OpenAiBackend::new(
            "sk-test".to_string(),
            "whisper-1".to_string(),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn preflight_rejects_oversized_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // Sparse-ish: write one byte past the ceiling.
        file.as_file()
            .set_len(MAX_UPLOAD_BYTES + 1)
            .unwrap();
        file.flush().unwrap();

        let err = backend().check_file_size(file.path()).unwrap_err();
        match err {
            TranscribeError::FileTooLarge { backend, size, limit } => {
                assert_eq!(backend, Backend::Remote);
                assert_eq!(size, MAX_UPLOAD_BYTES + 1);
                assert_eq!(limit, MAX_UPLOAD_BYTES);
            }
            other => panic!("expected FileTooLarge, got {other}"),
        }
    }

    #[test]
    fn preflight_accepts_small_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"tiny").unwrap();
        assert!(backend().check_file_size(file.path()).is_ok());
    }

    #[test]
    fn parses_verbose_json_with_segments() {
        let json = r#"{
            "text": "hello world",
            "language": "en",
            "duration": 4.5,
            "segments": [
                {"id": 0, "start": 0.0, "end": 2.0, "text": " hello"},
                {"id": 1, "start": 2.0, "end": 4.5, "text": " world"}
            ]
        }"#;
        let parsed: VerboseTranscription = serde_json::from_str(json).unwrap();
        let raw = OpenAiBackend::into_raw(parsed);

        assert_eq!(raw.segments.len(), 2);
        assert_eq!(raw.segments[0].text, " hello");
        assert!(raw.segments.iter().all(|s| s.words.is_empty()));
        assert_eq!(raw.language.as_deref(), Some("en"));
    }

    #[test]
    fn synthesizes_single_segment_without_timing_data() {
        let json = r#"{"text": "flat transcript", "language": "en", "duration": 12.0}"#;
        let parsed: VerboseTranscription = serde_json::from_str(json).unwrap();
        let raw = OpenAiBackend::into_raw(parsed);

        assert_eq!(raw.segments.len(), 1);
        assert_eq!(raw.segments[0].start, 0.0);
        assert_eq!(raw.segments[0].end, 12.0);
        assert_eq!(raw.segments[0].text, "flat transcript");
        assert!(raw.segments[0].words.is_empty());
    }

    #[test]
    fn empty_response_yields_no_segments() {
        // Zero segments must surface downstream as a backend failure, not
        // an empty-but-valid transcript.
        let json = r#"{"text": "  ", "language": null, "duration": 0.0}"#;
        let parsed: VerboseTranscription = serde_json::from_str(json).unwrap();
        let raw = OpenAiBackend::into_raw(parsed);
        assert!(raw.segments.is_empty());
    }

    #[test]
    fn mime_type_follows_extension() {
        assert_eq!(
            OpenAiBackend::mime_type_for(Path::new("a.mp3")),
            "audio/mpeg"
        );
        assert_eq!(OpenAiBackend::mime_type_for(Path::new("a.m4a")), "audio/mp4");
        assert_eq!(OpenAiBackend::mime_type_for(Path::new("a.wav")), "audio/wav");
    }

    #[tokio::test]
    async fn missing_api_key_fails_fast() {
        let b = OpenAiBackend::new(
            String::new(),
            "whisper-1".to_string(),
            Duration::from_secs(30),
        );
        let err = b
            .transcribe(Path::new("/tmp/never-read.m4a"), &TranscribeOptions::default())
            .await
            .unwrap_err();

        match err {
            TranscribeError::BackendUnavailable { backend, reason } => {
                assert_eq!(backend, Backend::Remote);
                assert!(reason.contains("no API key"));
            }
            other => panic!("expected BackendUnavailable, got {other}"),
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_maps_to_backend_unavailable() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"audio").unwrap();

        let b = backend().with_endpoint("http://127.0.0.1:1/v1/audio/transcriptions".to_string());
        let err = b
            .transcribe(file.path(), &TranscribeOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TranscribeError::BackendUnavailable {
                backend: Backend::Remote,
                ..
            }
        ));
    }
}
