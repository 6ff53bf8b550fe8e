//! YouTube audio acquisition via yt-dlp.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;
use url::Url;

use crate::utils::sanitize_filename;

/// Result of resolving a video URL to a local audio file.
#[derive(Debug)]
pub struct ExtractedAudio {
    /// Path to the downloaded audio file (inside the extractor's temp dir)
    pub path: PathBuf,

    /// Video title as reported by the platform
    pub title: String,

    /// Filesystem-safe version of the title
    pub safe_title: String,

    /// Duration in seconds, if reported
    pub duration: Option<f64>,
}

/// Downloads YouTube audio into a temporary directory that lives as long as
/// the extractor instance.
pub struct AudioExtractor {
    yt_dlp_path: String,
    temp_dir: TempDir,
}

impl AudioExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            yt_dlp_path: "yt-dlp".to_string(),
            temp_dir: TempDir::new().context("Failed to create temporary directory")?,
        })
    }

    /// Resolve a URL to a local audio file. One external call from the
    /// pipeline's point of view: success yields a file path, failure an error.
    pub async fn download_audio(&self, url: &str) -> Result<ExtractedAudio> {
        validate_youtube_url(url)?;

        tracing::info!(url = %url, "extracting video information");
        let info = self.get_video_info(url).await?;

        let title = info["title"]
            .as_str()
            .unwrap_or("unknown_video")
            .to_string();
        let video_id = info["id"].as_str().unwrap_or("unknown_id").to_string();
        let duration = info["duration"].as_f64();
        let safe_title = sanitize_filename(&title);

        let audio_path = self.temp_dir.path().join(format!("{video_id}.m4a"));

        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap(),
        );
        progress.set_message(format!("Downloading audio: {title}"));
        // yt-dlp runs as one awaited subprocess, so the spinner has to tick
        // on its own thread to show motion.
        progress.enable_steady_tick(std::time::Duration::from_millis(100));

        self.run_download(url, &audio_path).await?;

        progress.finish_with_message("Audio download complete");

        if !audio_path.exists() {
            anyhow::bail!("Audio file not found after download");
        }

        tracing::info!(path = %audio_path.display(), "audio extracted");

        Ok(ExtractedAudio {
            path: audio_path,
            title,
            safe_title,
            duration,
        })
    }

    /// Get video metadata as JSON using yt-dlp.
    async fn get_video_info(&self, url: &str) -> Result<Value> {
        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--no-playlist", url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to run yt-dlp; is it installed?")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error);
        }

        let json_str = String::from_utf8(output.stdout)?;
        let info: Value = serde_json::from_str(&json_str)?;
        Ok(info)
    }

    /// Let yt-dlp download and convert in one pass. M4A at modest quality is
    /// plenty for speech-to-text and keeps files under the remote API limit
    /// for most videos.
    async fn run_download(&self, url: &str, output_path: &Path) -> Result<()> {
        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--output",
                &output_path.to_string_lossy(),
                "--extract-audio",
                "--audio-format",
                "m4a",
                "--audio-quality",
                "128K",
                "--format",
                "bestaudio/best",
                "--no-playlist",
                "--newline",
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to run yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to download audio: {}", error);
        }

        Ok(())
    }

    /// Copy the downloaded audio next to the transcripts when the user asked
    /// to keep it.
    pub fn preserve_audio(&self, extracted: &ExtractedAudio, output_dir: &Path) -> Result<PathBuf> {
        let target = output_dir.join(format!("{}.m4a", extracted.safe_title));
        fs_err::copy(&extracted.path, &target)?;
        Ok(target)
    }
}

/// Check the URL is a YouTube video URL before spawning anything.
pub fn validate_youtube_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url).map_err(|_| anyhow::anyhow!("Invalid URL format: {url}"))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    let is_youtube = host == "youtu.be"
        || host == "youtube.com"
        || host.ends_with(".youtube.com");

    if !is_youtube {
        anyhow::bail!("Not a YouTube URL: {url}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_standard_watch_urls() {
        assert!(validate_youtube_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ").is_ok());
        assert!(validate_youtube_url("https://youtu.be/dQw4w9WgXcQ").is_ok());
        assert!(validate_youtube_url("https://m.youtube.com/watch?v=abc123").is_ok());
        assert!(validate_youtube_url("http://youtube.com/embed/abc123").is_ok());
    }

    #[test]
    fn rejects_non_youtube_hosts() {
        assert!(validate_youtube_url("https://vimeo.com/12345").is_err());
        assert!(validate_youtube_url("https://example.com/watch?v=abc").is_err());
        // Host suffix tricks must not pass.
        assert!(validate_youtube_url("https://notyoutube.com/watch?v=abc").is_err());
    }

    #[test]
    fn rejects_bad_schemes_and_garbage() {
        assert!(validate_youtube_url("ftp://youtube.com/watch?v=abc").is_err());
        assert!(validate_youtube_url("not a url at all").is_err());
    }
}
