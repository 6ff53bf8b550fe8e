//! Pure serialization of a normalized transcript into output formats.

use crate::transcript::NormalizedTranscript;

/// Format seconds as a subtitle timestamp. SRT uses a comma before the
/// milliseconds, VTT a dot.
pub fn format_timestamp(seconds: f64, srt_format: bool) -> String {
    // Work in whole milliseconds so float remainders cannot drop a unit.
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let milliseconds = total_ms % 1000;

    if srt_format {
        format!("{hours:02}:{minutes:02}:{secs:02},{milliseconds:03}")
    } else {
        format!("{hours:02}:{minutes:02}:{secs:02}.{milliseconds:03}")
    }
}

/// Plain text: the derived full text with a trailing newline.
pub fn format_as_text(transcript: &NormalizedTranscript) -> String {
    let mut out = transcript.full_text().to_string();
    out.push('\n');
    out
}

/// SRT subtitles: numbered entries with comma-millisecond timestamps.
pub fn format_as_srt(transcript: &NormalizedTranscript) -> String {
    let mut out = String::new();

    for (i, segment) in transcript.segments().iter().enumerate() {
        let start = format_timestamp(segment.start, true);
        let end = format_timestamp(segment.end, true);

        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!("{start} --> {end}\n"));
        out.push_str(&segment.text);
        out.push_str("\n\n");
    }

    out
}

/// WebVTT subtitles: `WEBVTT` header, dot-millisecond timestamps.
pub fn format_as_vtt(transcript: &NormalizedTranscript) -> String {
    let mut out = String::from("WEBVTT\n\n");

    for segment in transcript.segments() {
        let start = format_timestamp(segment.start, false);
        let end = format_timestamp(segment.end, false);

        out.push_str(&format!("{start} --> {end}\n"));
        out.push_str(&segment.text);
        out.push_str("\n\n");
    }

    out
}
