//! Local whisper.cpp backend via whisper-rs.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use tokio::process::Command;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{model_fetch, ModelSize, RawTranscript, TranscribeError, TranscribeOptions, TranscriptionBackend};
use crate::transcript::{Backend, Segment, Word};

/// A resident whisper.cpp model, kept alive between calls so sequential
/// transcriptions do not pay the load cost twice.
struct LoadedModel {
    size: ModelSize,
    context: WhisperContext,
}

/// Local adapter running whisper.cpp inference on CPU (or GPU when the
/// build supports it).
///
/// The loaded model is instance-scoped shared state: initialize-on-first-use,
/// reused across sequential calls, reloaded only when the requested size
/// changes. At most one in-flight transcription per process is assumed.
pub struct WhisperLocalBackend {
    models_dir: PathBuf,
    ffmpeg_path: String,
    model: Mutex<Option<LoadedModel>>,
}

impl WhisperLocalBackend {
    pub fn new(models_dir: PathBuf) -> Self {
        Self {
            models_dir,
            ffmpeg_path: "ffmpeg".to_string(),
            model: Mutex::new(None),
        }
    }

    fn unavailable(reason: impl Into<String>) -> TranscribeError {
        TranscribeError::BackendUnavailable {
            backend: Backend::Local,
            reason: reason.into(),
        }
    }

    /// Decode arbitrary input audio to 16 kHz mono 16-bit WAV, the only
    /// format whisper.cpp accepts.
    async fn decode_to_wav(&self, audio_path: &Path) -> Result<tempfile::NamedTempFile, TranscribeError> {
        let wav = tempfile::Builder::new()
            .prefix("yt2transcript_")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| Self::unavailable(format!("cannot create temp file: {e}")))?;

        let output = Command::new(&self.ffmpeg_path)
            .args([
                "-nostdin",
                "-i",
                &audio_path.to_string_lossy(),
                "-ac",
                "1",
                "-ar",
                "16000",
                "-acodec",
                "pcm_s16le",
                "-f",
                "wav",
                "-y",
                &wav.path().to_string_lossy(),
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Self::unavailable(format!("failed to run ffmpeg: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // Last line carries ffmpeg's actual complaint.
            let detail = stderr.lines().last().unwrap_or("unknown error").to_string();
            return Err(TranscribeError::UnsupportedAudio {
                backend: Backend::Local,
                reason: format!("ffmpeg could not decode input: {detail}"),
            });
        }

        Ok(wav)
    }

    fn read_samples(wav_path: &Path) -> Result<Vec<f32>, TranscribeError> {
        let mut reader = hound::WavReader::open(wav_path)
            .map_err(|e| Self::unavailable(format!("cannot read decoded WAV: {e}")))?;

        let samples: Vec<f32> = reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<Result<_, _>>()
            .map_err(|e| Self::unavailable(format!("corrupt WAV data: {e}")))?;

        Ok(samples)
    }

    /// Run inference with the cached model, loading or swapping it first if
    /// the requested size differs from the resident one.
    fn run_inference(
        &self,
        model_path: &Path,
        samples: &[f32],
        options: &TranscribeOptions,
    ) -> Result<RawTranscript, TranscribeError> {
        let mut guard = self
            .model
            .lock()
            .map_err(|_| Self::unavailable("model cache poisoned by a previous panic"))?;

        let needs_load = guard
            .as_ref()
            .map_or(true, |loaded| loaded.size != options.model_size);

        if needs_load {
            tracing::info!(model = %options.model_size, "loading whisper model");
            let context = WhisperContext::new_with_params(
                &model_path.to_string_lossy(),
                WhisperContextParameters::default(),
            )
            .map_err(|e| Self::unavailable(format!("model load failed: {e}")))?;

            *guard = Some(LoadedModel {
                size: options.model_size,
                context,
            });
        }

        let loaded = guard.as_ref().expect("model loaded above");

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        let threads = std::thread::available_parallelism()
            .map(|n| n.get().min(8))
            .unwrap_or(4) as i32;
        params.set_n_threads(threads);
        params.set_translate(false);
        params.set_language(options.language.as_deref());
        params.set_token_timestamps(true);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_suppress_blank(true);
        params.set_temperature(0.0);

        let mut state = loaded
            .context
            .create_state()
            .map_err(|e| Self::unavailable(format!("cannot create whisper state: {e}")))?;

        state
            .full(params, samples)
            .map_err(|e| Self::unavailable(format!("inference failed: {e}")))?;

        let num_segments = state
            .full_n_segments()
            .map_err(|e| Self::unavailable(format!("cannot read segments: {e}")))?;

        let mut segments = Vec::new();
        for i in 0..num_segments {
            let text = state
                .full_get_segment_text(i)
                .map_err(|e| Self::unavailable(format!("cannot read segment text: {e}")))?;
            if text.trim().is_empty() {
                continue;
            }

            // whisper.cpp timestamps are in 10 ms units
            let start = state
                .full_get_segment_t0(i)
                .map_err(|e| Self::unavailable(format!("cannot read segment start: {e}")))?
                as f64
                * 0.01;
            let end = state
                .full_get_segment_t1(i)
                .map_err(|e| Self::unavailable(format!("cannot read segment end: {e}")))?
                as f64
                * 0.01;

            let num_tokens = state
                .full_n_tokens(i)
                .map_err(|e| Self::unavailable(format!("cannot read tokens: {e}")))?;
            let mut tokens = Vec::with_capacity(num_tokens as usize);
            for j in 0..num_tokens {
                let token_text = state
                    .full_get_token_text(i, j)
                    .map_err(|e| Self::unavailable(format!("cannot read token text: {e}")))?;
                let data = state
                    .full_get_token_data(i, j)
                    .map_err(|e| Self::unavailable(format!("cannot read token timing: {e}")))?;
                tokens.push((token_text, data.t0, data.t1));
            }

            let mut segment = Segment::new(start, end, text.trim());
            segment.words = merge_tokens_into_words(&tokens);
            segments.push(segment);
        }

        let language = options.language.clone().or_else(|| {
            state
                .full_lang_id_from_state()
                .ok()
                .and_then(whisper_rs::get_lang_str)
                .map(|s| s.to_string())
        });

        Ok(RawTranscript { segments, language })
    }
}

/// Merge whisper subword tokens into words with timing. A token whose text
/// begins with a space starts a new word; special tokens (`[_BEG_]` and
/// friends) carry no speech and are skipped. Timestamps are 10 ms units.
fn merge_tokens_into_words(tokens: &[(String, i64, i64)]) -> Vec<Word> {
    let mut words: Vec<Word> = Vec::new();

    for (text, t0, t1) in tokens {
        if text.starts_with("[_") || text.trim().is_empty() {
            continue;
        }

        let starts_word = text.starts_with(' ') || words.is_empty();
        if starts_word {
            words.push(Word {
                start: *t0 as f64 * 0.01,
                end: *t1 as f64 * 0.01,
                text: text.trim().to_string(),
            });
        } else if let Some(last) = words.last_mut() {
            last.text.push_str(text.trim_end());
            last.end = *t1 as f64 * 0.01;
        }
    }

    words
}

#[async_trait]
impl TranscriptionBackend for WhisperLocalBackend {
    fn kind(&self) -> Backend {
        Backend::Local
    }

    async fn transcribe(
        &self,
        audio_path: &Path,
        options: &TranscribeOptions,
    ) -> Result<RawTranscript, TranscribeError> {
        if !audio_path.exists() {
            return Err(Self::unavailable(format!(
                "audio file not found: {}",
                audio_path.display()
            )));
        }

        let model_path = model_fetch::ensure_model(&self.models_dir, options.model_size)
            .await
            .map_err(|e| Self::unavailable(format!("model fetch failed: {e}")))?;

        let wav = self.decode_to_wav(audio_path).await?;
        let samples = Self::read_samples(wav.path())?;
        if samples.is_empty() {
            return Err(TranscribeError::UnsupportedAudio {
                backend: Backend::Local,
                reason: "decoded audio contains no samples".to_string(),
            });
        }

        tracing::info!(
            model = %options.model_size,
            samples = samples.len(),
            "running local whisper inference"
        );

        // One long synchronous inference call; no streaming, no cancellation.
        tokio::task::block_in_place(|| self.run_inference(&model_path, &samples, options))
    }
}
