use anyhow::Result;
use std::path::{Path, PathBuf};

/// Sanitize filename for safe filesystem usage
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned = filename
        .chars()
        .map(|c| match c {
            c if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' => c,
            _ => '_',
        })
        .collect::<String>()
        .trim_matches('_')
        .to_string();

    let truncated: String = cleaned.chars().take(100).collect();

    if truncated.is_empty() {
        "unknown_video".to_string()
    } else {
        truncated
    }
}

/// Create a per-video output directory under `base_dir`, appending `_1`,
/// `_2`, ... when the name is already taken.
pub fn create_output_directory(base_dir: &Path, safe_title: &str) -> Result<PathBuf> {
    let mut output_dir = base_dir.join(safe_title);

    let mut counter = 1;
    while output_dir.exists() {
        output_dir = base_dir.join(format!("{safe_title}_{counter}"));
        counter += 1;
    }

    fs_err::create_dir_all(&output_dir)?;
    Ok(output_dir)
}

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Check if the current environment has required tools
pub async fn check_dependencies() -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available("yt-dlp").await {
        missing.push("yt-dlp - required for YouTube audio extraction".to_string());
    }

    if !check_command_available("ffmpeg").await {
        missing.push("ffmpeg - required for local transcription audio decoding".to_string());
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
