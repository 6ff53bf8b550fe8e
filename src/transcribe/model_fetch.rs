//! Fetch ggml Whisper checkpoints from Hugging Face.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::ModelSize;

const HF_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Path a model size resolves to inside the models directory.
pub fn model_path(models_dir: &Path, size: ModelSize) -> PathBuf {
    models_dir.join(size.ggml_filename())
}

/// Return the local checkpoint path for `size`, downloading it from
/// Hugging Face on first use.
pub async fn ensure_model(models_dir: &Path, size: ModelSize) -> Result<PathBuf> {
    let path = model_path(models_dir, size);
    if path.exists() {
        return Ok(path);
    }

    fs_err::create_dir_all(models_dir)
        .context("Failed to create models directory")?;

    let url = format!("{}/{}", HF_BASE_URL, size.ggml_filename());
    tracing::info!(model = %size, url = %url, "downloading whisper model");

    let response = reqwest::get(&url)
        .await
        .context("Failed to request model download")?;

    if !response.status().is_success() {
        anyhow::bail!("Model download failed: HTTP {}", response.status());
    }

    let progress = ProgressBar::new(response.content_length().unwrap_or(0));
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .unwrap(),
    );
    progress.set_message(format!("Downloading {} model...", size));

    // Download to a temp name first so an interrupted fetch never leaves a
    // truncated checkpoint behind.
    let partial = path.with_extension("bin.part");
    let mut file = fs_err::File::create(&partial)?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Model download interrupted")?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        progress.set_position(downloaded);
    }
    file.flush()?;
    drop(file);

    fs_err::rename(&partial, &path)?;
    progress.finish_with_message("Model download complete");

    Ok(path)
}

/// Model sizes whose checkpoint already exists in `models_dir`.
pub fn installed_models(models_dir: &Path) -> Vec<ModelSize> {
    [
        ModelSize::Tiny,
        ModelSize::Base,
        ModelSize::Small,
        ModelSize::Medium,
        ModelSize::Large,
    ]
    .into_iter()
    .filter(|size| model_path(models_dir, *size).exists())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_path_uses_ggml_naming() {
        let dir = Path::new("/models");
        assert_eq!(
            model_path(dir, ModelSize::Base),
            PathBuf::from("/models/ggml-base.bin")
        );
        assert_eq!(
            model_path(dir, ModelSize::Large),
            PathBuf::from("/models/ggml-large-v3.bin")
        );
    }

    #[test]
    fn installed_models_lists_only_present_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        assert!(installed_models(dir.path()).is_empty());

        fs_err::write(model_path(dir.path(), ModelSize::Tiny), b"stub").unwrap();
        fs_err::write(model_path(dir.path(), ModelSize::Small), b"stub").unwrap();

        let installed = installed_models(dir.path());
        assert_eq!(installed, vec![ModelSize::Tiny, ModelSize::Small]);
    }

    #[tokio::test]
    async fn ensure_model_short_circuits_on_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let existing = model_path(dir.path(), ModelSize::Base);
        fs_err::write(&existing, b"already here").unwrap();

        let path = ensure_model(dir.path(), ModelSize::Base).await.unwrap();
        assert_eq!(path, existing);
        assert_eq!(fs_err::read(&path).unwrap(), b"already here");
    }
}
