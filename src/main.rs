use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yt2transcript::cli::{Cli, Commands};
use yt2transcript::config::Config;
use yt2transcript::extractor::AudioExtractor;
use yt2transcript::summarize::Summarizer;
use yt2transcript::transcribe::{
    model_fetch, openai_api::OpenAiBackend, whisper_local::WhisperLocalBackend, Mode, ModelSize,
    TranscribeOptions, TranscriptionPipeline,
};
use yt2transcript::transcript::NormalizedTranscript;
use yt2transcript::{output, utils};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "yt2transcript=debug"
    } else {
        "yt2transcript=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;

    match cli.command {
        Commands::Transcribe {
            url,
            output_dir,
            backend,
            model_size,
            api_key,
            language,
            summarize,
            gpt_model,
            keep_audio,
        } => {
            run_transcribe(
                &config,
                &url,
                output_dir,
                backend,
                model_size,
                api_key,
                language,
                summarize,
                gpt_model,
                keep_audio,
            )
            .await?;
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                config.save()?;
                println!("Configuration file initialized");
                config.display();
            }
        }
        Commands::Models => {
            let models_dir = config.models_dir();
            let installed = model_fetch::installed_models(&models_dir);
            println!("Models directory: {}", models_dir.display());
            if installed.is_empty() {
                println!("No models installed yet; they are downloaded on first local run");
            } else {
                for size in installed {
                    let path = model_fetch::model_path(&models_dir, size);
                    let bytes = fs_err::metadata(&path).map(|m| m.len()).unwrap_or(0);
                    println!("  {} ({})", size, utils::format_file_size(bytes));
                }
            }
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_transcribe(
    config: &Config,
    url: &str,
    output_dir: Option<PathBuf>,
    backend: Mode,
    model_size: Option<ModelSize>,
    api_key: Option<String>,
    language: Option<String>,
    summarize: bool,
    gpt_model: String,
    keep_audio: bool,
) -> Result<()> {
    let output_dir = config.resolve_output_dir(output_dir);
    let model_size = config.resolve_model_size(model_size);

    // Missing tools are a warning, not a hard stop: the remote backend may
    // still succeed without ffmpeg.
    let missing_deps = utils::check_dependencies().await;
    for dep in &missing_deps {
        eprintln!("warning: {dep}");
    }

    // In auto mode a missing key is not fatal: the remote attempt fails
    // fast and the pipeline falls back to the local model.
    if backend == Mode::Api && api_key.is_none() {
        anyhow::bail!("backend 'api' needs an OpenAI API key; pass --api-key or set OPENAI_API_KEY");
    }

    println!("Processing: {url}");

    // Step 1: acquire audio
    let extractor = AudioExtractor::new()?;
    let audio = extractor.download_audio(url).await?;
    println!("Audio extracted: {}", audio.title);
    if let Some(duration) = audio.duration {
        println!("Audio duration: {}", utils::format_duration(duration));
    }

    // Step 2: per-video output directory
    let video_dir = utils::create_output_directory(&output_dir, &audio.safe_title)?;
    println!("Output directory: {}", video_dir.display());

    // Step 3: transcribe
    let remote = OpenAiBackend::new(
        api_key.clone().unwrap_or_default(),
        config.openai.whisper_model.clone(),
        config.request_timeout(),
    );
    let local = WhisperLocalBackend::new(config.models_dir());
    let pipeline = TranscriptionPipeline::new(Box::new(remote), Box::new(local));

    let options = TranscribeOptions {
        language,
        model_size,
    };

    let (transcript, report) = pipeline.run(&audio.path, backend, &options).await?;

    println!("Transcription completed ({} backend)", report.backend_used);
    if let Some(cause) = &report.fallback_cause {
        println!("  (fell back from remote: {cause})");
    }

    // Step 4: write artifacts
    let saved = output::save_all_formats(&transcript, &video_dir)?;
    let mut file_count = saved.len();

    if summarize {
        match api_key {
            Some(key) => {
                let summarizer = Summarizer::new(key, gpt_model, config.request_timeout());
                let summary = summarizer.summarize(transcript.full_text()).await?;
                output::save_summary(&summary, &video_dir)?;
                file_count += 1;
            }
            None => {
                eprintln!("warning: --summarize needs an OpenAI API key, skipping summary");
            }
        }
    }

    if keep_audio || config.app.keep_audio {
        let audio_path = extractor.preserve_audio(&audio, &video_dir)?;
        println!("Audio saved to: {}", audio_path.display());
    }

    print_report(&transcript, &video_dir, file_count);

    Ok(())
}

fn print_report(transcript: &NormalizedTranscript, video_dir: &Path, file_count: usize) {
    println!("\nSuccess! {} files saved to: {}", file_count, video_dir.display());

    let preview: String = transcript.full_text().chars().take(200).collect();
    let ellipsis = if transcript.full_text().chars().count() > 200 {
        "..."
    } else {
        ""
    };
    println!("\nTranscript preview:\n  \"{preview}{ellipsis}\"");

    if let Some(language) = transcript.language() {
        println!("Language: {language}");
    }
    println!("Segments: {}", transcript.segments().len());
}
