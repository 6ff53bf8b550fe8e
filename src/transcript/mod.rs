use serde::{Deserialize, Serialize};

/// Which transcription backend produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// OpenAI Whisper API
    Remote,
    /// Local whisper.cpp model
    Local,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Remote => write!(f, "remote"),
            Backend::Local => write!(f, "local"),
        }
    }
}

/// A single word with timing, present only when the backend supplies
/// word-level timestamps (the local model does, the API does not).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    /// Start time in seconds
    pub start: f64,

    /// End time in seconds
    pub end: f64,

    /// Word text
    pub text: String,
}

/// A transcript segment with timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds
    pub start: f64,

    /// End time in seconds
    pub end: f64,

    /// Segment text
    pub text: String,

    /// Word-level timings, empty when the backend has none
    #[serde(default)]
    pub words: Vec<Word>,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            words: Vec::new(),
        }
    }
}

/// A transcript invariant violation found while constructing a
/// [`NormalizedTranscript`]. The orchestrator treats this as a failure of
/// the backend that emitted the segments.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct InvariantViolation(String);

/// The canonical transcript representation every backend must produce and
/// every formatter consumes.
///
/// Fields are private: a value is validated once at construction and
/// immutable afterwards, so formatters can rely on the invariants without
/// rechecking them. In particular `full_text` always equals the segment
/// texts joined with a single space, and segments are sorted by start time.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedTranscript {
    segments: Vec<Segment>,
    full_text: String,
    backend_used: Backend,
    language: Option<String>,
}

impl NormalizedTranscript {
    /// Validate and normalize raw backend segments into a transcript.
    ///
    /// Checks: at least one segment, every segment has finite timing with
    /// `end >= start` and `start >= 0`, and non-blank text. Segments are
    /// stable-sorted by start time (ties keep emission order), then
    /// `full_text` is derived by joining segment texts with single spaces.
    pub fn new(
        mut segments: Vec<Segment>,
        language: Option<String>,
        backend_used: Backend,
    ) -> Result<Self, InvariantViolation> {
        if segments.is_empty() {
            return Err(InvariantViolation(
                "backend produced zero segments".to_string(),
            ));
        }

        for (i, segment) in segments.iter_mut().enumerate() {
            if !segment.start.is_finite() || !segment.end.is_finite() {
                return Err(InvariantViolation(format!(
                    "segment {} has non-finite timing ({} -> {})",
                    i, segment.start, segment.end
                )));
            }
            if segment.start < 0.0 {
                return Err(InvariantViolation(format!(
                    "segment {} starts before zero ({})",
                    i, segment.start
                )));
            }
            if segment.end < segment.start {
                return Err(InvariantViolation(format!(
                    "segment {} ends ({}) before it starts ({})",
                    i, segment.end, segment.start
                )));
            }
            segment.text = segment.text.trim().to_string();
            if segment.text.is_empty() {
                return Err(InvariantViolation(format!("segment {} has no text", i)));
            }
        }

        // Stable sort: overlapping segments are allowed, ties keep the
        // backend's emission order.
        segments.sort_by(|a, b| a.start.total_cmp(&b.start));

        let full_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Self {
            segments,
            full_text,
            backend_used,
            language,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Segment texts joined in order with single spaces.
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn backend_used(&self) -> Backend {
        self.backend_used
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Total duration in seconds, taken from the last segment end.
    pub fn duration(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.end)
            .fold(0.0_f64, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, text: &str) -> Segment {
        Segment::new(start, end, text)
    }

    #[test]
    fn full_text_is_single_space_join() {
        let t = NormalizedTranscript::new(
            vec![seg(0.0, 2.0, "hello"), seg(2.0, 4.5, "world")],
            Some("en".to_string()),
            Backend::Local,
        )
        .unwrap();

        assert_eq!(t.full_text(), "hello world");
        assert_eq!(t.segments().len(), 2);
        assert_eq!(t.segments()[0].text, "hello");
        assert_eq!(t.segments()[1].text, "world");
    }

    #[test]
    fn segments_sorted_by_start() {
        let t = NormalizedTranscript::new(
            vec![seg(5.0, 7.0, "second"), seg(0.0, 2.0, "first")],
            None,
            Backend::Local,
        )
        .unwrap();

        assert_eq!(t.segments()[0].text, "first");
        assert_eq!(t.segments()[1].text, "second");
        assert_eq!(t.full_text(), "first second");
    }

    #[test]
    fn sort_is_stable_on_equal_starts() {
        let t = NormalizedTranscript::new(
            vec![seg(1.0, 2.0, "a"), seg(1.0, 1.5, "b"), seg(1.0, 3.0, "c")],
            None,
            Backend::Local,
        )
        .unwrap();

        // Emission order preserved, never reordered by end or text.
        assert_eq!(t.full_text(), "a b c");
    }

    #[test]
    fn overlapping_segments_are_permitted() {
        let t = NormalizedTranscript::new(
            vec![seg(0.0, 5.0, "one"), seg(3.0, 8.0, "two")],
            None,
            Backend::Remote,
        )
        .unwrap();

        assert_eq!(t.segments().len(), 2);
    }

    #[test]
    fn rejects_empty_segment_list() {
        let err = NormalizedTranscript::new(vec![], None, Backend::Remote).unwrap_err();
        assert!(err.to_string().contains("zero segments"));
    }

    #[test]
    fn rejects_end_before_start() {
        let err =
            NormalizedTranscript::new(vec![seg(4.0, 2.0, "oops")], None, Backend::Local)
                .unwrap_err();
        assert!(err.to_string().contains("before it starts"));
    }

    #[test]
    fn rejects_non_finite_timing() {
        assert!(
            NormalizedTranscript::new(vec![seg(f64::NAN, 1.0, "x")], None, Backend::Local)
                .is_err()
        );
        assert!(NormalizedTranscript::new(
            vec![seg(0.0, f64::INFINITY, "x")],
            None,
            Backend::Local
        )
        .is_err());
    }

    #[test]
    fn rejects_blank_text() {
        let err = NormalizedTranscript::new(vec![seg(0.0, 1.0, "   ")], None, Backend::Remote)
            .unwrap_err();
        assert!(err.to_string().contains("no text"));
    }

    #[test]
    fn trims_segment_text_before_joining() {
        let t = NormalizedTranscript::new(
            vec![seg(0.0, 1.0, " hello "), seg(1.0, 2.0, " world ")],
            None,
            Backend::Local,
        )
        .unwrap();
        assert_eq!(t.full_text(), "hello world");
    }

    #[test]
    fn empty_words_are_valid() {
        let t = NormalizedTranscript::new(
            vec![seg(0.0, 2.0, "no word timing here")],
            Some("en".to_string()),
            Backend::Remote,
        )
        .unwrap();
        assert!(t.segments()[0].words.is_empty());
        assert_eq!(t.backend_used(), Backend::Remote);
    }

    #[test]
    fn duration_uses_last_segment_end() {
        let t = NormalizedTranscript::new(
            vec![seg(0.0, 2.0, "a"), seg(2.0, 4.5, "b")],
            None,
            Backend::Local,
        )
        .unwrap();
        assert!((t.duration() - 4.5).abs() < f64::EPSILON);
    }
}
