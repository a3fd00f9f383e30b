//! Turn ffmpeg `silencedetect` output into speech segments.
//!
//! The silence job runs `silencedetect` followed by `ametadata=mode=print`,
//! which writes one key per line after each frame header:
//!
//! ```text
//! frame:97   pts:99328   pts_time:2.0695
//! lavfi.silence_start=2.0695
//! frame:583  pts:596992  pts_time:14.4373
//! lavfi.silence_end=14.4373
//! lavfi.silence_duration=12.3678
//! ```

use std::path::Path;

use tracing::debug;

use crate::error::{MediaError, Result};
use crate::tables::Segment;

/// Segments shorter than this are dropped; they are too short to hold speech
/// and usually come from noise between two silences.
pub const MIN_SEGMENT_SEC: f64 = 1.0;

/// One detected silence. `end_sec` is `None` when the audio ends while silent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Silence {
    pub start_sec: f64,
    pub end_sec: Option<f64>,
}

pub fn read_silences(path: &Path) -> Result<Vec<Silence>> {
    let text = std::fs::read_to_string(path)?;
    parse_silences(&text).map_err(|reason| MediaError::malformed(path, reason))
}

/// Parse the ametadata print format. Lines other than `silence_start` /
/// `silence_end` are ignored.
pub fn parse_silences(text: &str) -> std::result::Result<Vec<Silence>, String> {
    let mut silences: Vec<Silence> = Vec::new();
    let mut open: Option<f64> = None;

    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("lavfi.silence_start=") {
            let start = parse_seconds(value, n)?;
            if let Some(prev) = open.replace(start) {
                // Two starts in a row: the first silence never closed.
                return Err(format!(
                    "line {}: silence_start {start} before previous start {prev} ended",
                    n + 1
                ));
            }
        } else if let Some(value) = line.strip_prefix("lavfi.silence_end=") {
            let end = parse_seconds(value, n)?;
            let start = open
                .take()
                .ok_or_else(|| format!("line {}: silence_end {end} without a start", n + 1))?;
            silences.push(Silence {
                start_sec: start,
                end_sec: Some(end),
            });
        }
    }

    if let Some(start) = open {
        silences.push(Silence {
            start_sec: start,
            end_sec: None,
        });
    }
    Ok(silences)
}

fn parse_seconds(value: &str, line: usize) -> std::result::Result<f64, String> {
    let secs: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("line {}: not a number: {value:?}", line + 1))?;
    if !secs.is_finite() {
        return Err(format!("line {}: not finite: {value:?}", line + 1));
    }
    // silencedetect can report a slightly negative start for leading silence.
    Ok(secs.max(0.0))
}

/// Speech segments are the gaps between silences, starting from 0.
///
/// A trailing segment after the last closed silence has an open end, since
/// the total audio duration is not part of the silence log.
pub fn to_segments(silences: &[Silence]) -> Vec<Segment> {
    let mut bounds: Vec<(f64, Option<f64>)> = Vec::new();
    let mut cursor = Some(0.0);

    for silence in silences {
        if let Some(from) = cursor {
            if silence.start_sec - from >= MIN_SEGMENT_SEC {
                bounds.push((from, Some(silence.start_sec)));
            }
        }
        cursor = silence.end_sec;
    }
    if let Some(from) = cursor {
        bounds.push((from, None));
    }

    let segments: Vec<Segment> = bounds
        .into_iter()
        .enumerate()
        .map(|(i, (start_sec, end_sec))| Segment {
            segment_id: format!("s{}", i + 1),
            start_sec,
            end_sec,
        })
        .collect();
    debug!(silences = silences.len(), segments = segments.len(), "segmented audio");
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
frame:97   pts:99328   pts_time:2.0695
lavfi.silence_start=20
frame:583  pts:596992  pts_time:14.4373
lavfi.silence_end=35.5
lavfi.silence_duration=15.5
frame:900  pts:921600  pts_time:60
lavfi.silence_start=60
frame:1200 pts:1228800 pts_time:80
lavfi.silence_end=80
lavfi.silence_duration=20
";

    #[test]
    fn gaps_between_silences_become_segments() {
        let silences = parse_silences(LOG).expect("parse");
        assert_eq!(silences.len(), 2);

        let segments = to_segments(&silences);
        let bounds: Vec<_> = segments
            .iter()
            .map(|s| (s.segment_id.as_str(), s.start_sec, s.end_sec))
            .collect();
        assert_eq!(
            bounds,
            vec![
                ("s1", 0.0, Some(20.0)),
                ("s2", 35.5, Some(60.0)),
                ("s3", 80.0, None),
            ]
        );
    }

    #[test]
    fn silence_running_to_the_end_closes_last_segment() {
        let silences = parse_silences("lavfi.silence_start=42.0\n").expect("parse");
        assert_eq!(silences, vec![Silence { start_sec: 42.0, end_sec: None }]);

        let segments = to_segments(&silences);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].end_sec, Some(42.0));
    }

    #[test]
    fn leading_silence_and_short_gaps_are_dropped() {
        let log = "\
lavfi.silence_start=-0.01
lavfi.silence_end=12
lavfi.silence_start=12.4
lavfi.silence_end=30
";
        let segments = to_segments(&parse_silences(log).expect("parse"));
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].segment_id, "s1");
        assert_eq!(segments[0].start_sec, 30.0);
    }

    #[test]
    fn no_silence_means_one_open_segment() {
        let segments = to_segments(&[]);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_sec, 0.0);
        assert_eq!(segments[0].end_sec, None);
    }

    #[test]
    fn garbage_values_are_rejected() {
        assert!(parse_silences("lavfi.silence_start=abc\n").is_err());
        assert!(parse_silences("lavfi.silence_end=3\n").is_err());
    }
}
