use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::transcript::NormalizedTranscript;

pub mod formatters;

pub use formatters::*;

/// Write transcript artifacts (txt, srt, vtt) into `output_dir` and return
/// the written paths, labeled by format.
pub fn save_all_formats(
    transcript: &NormalizedTranscript,
    output_dir: &Path,
) -> Result<Vec<(&'static str, PathBuf)>> {
    fs_err::create_dir_all(output_dir)?;

    let artifacts = [
        ("txt", format_as_text(transcript)),
        ("srt", format_as_srt(transcript)),
        ("vtt", format_as_vtt(transcript)),
    ];

    let mut saved = Vec::with_capacity(artifacts.len());
    for (format, content) in artifacts {
        let path = output_dir.join(format!("transcript.{format}"));
        fs_err::write(&path, content)?;
        tracing::debug!(path = %path.display(), "wrote transcript artifact");
        saved.push((format, path));
    }

    Ok(saved)
}

/// Write the summary next to the transcript artifacts.
pub fn save_summary(summary: &str, output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join("summary.txt");
    fs_err::write(&path, summary)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{Backend, Segment};

    #[test]
    fn writes_all_three_formats() {
        let transcript = NormalizedTranscript::new(
            vec![Segment::new(0.0, 1.5, "testing output")],
            None,
            Backend::Remote,
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let saved = save_all_formats(&transcript, dir.path()).unwrap();

        assert_eq!(saved.len(), 3);
        let formats: Vec<&str> = saved.iter().map(|(f, _)| *f).collect();
        assert_eq!(formats, vec!["txt", "srt", "vtt"]);

        let txt = fs_err::read_to_string(dir.path().join("transcript.txt")).unwrap();
        assert_eq!(txt, "testing output\n");

        let vtt = fs_err::read_to_string(dir.path().join("transcript.vtt")).unwrap();
        assert!(vtt.starts_with("WEBVTT"));
    }

    #[test]
    fn summary_lands_next_to_transcripts() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_summary("short summary", dir.path()).unwrap();
        assert_eq!(path, dir.path().join("summary.txt"));
        assert_eq!(fs_err::read_to_string(path).unwrap(), "short summary");
    }
}
