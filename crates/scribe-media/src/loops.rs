//! Detect "looping" regions: whisper occasionally gets stuck and emits the
//! same line over and over for a long stretch of audio.

use tracing::debug;

use crate::tables::{PatchEntry, TranscriptRow};

/// Flag every run of consecutive rows with identical (trimmed, non-empty)
/// text spanning at least `min_duration_sec`.
///
/// Entry bounds are widened to whole seconds (floor start, ceil end) so the
/// re-transcribed clip fully covers the looping rows. Entries that end up
/// overlapping after widening are coalesced, so the result is pairwise
/// disjoint and sorted. Ids are `p1, p2, …` in time order.
pub fn detect_loops(rows: &[TranscriptRow], min_duration_sec: u32) -> Vec<PatchEntry> {
    let min_span_ms = i64::from(min_duration_sec) * 1000;
    let mut sorted: Vec<&TranscriptRow> = rows.iter().collect();
    sorted.sort_by_key(|r| r.start_ms);

    let mut regions: Vec<(i64, i64, String)> = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let text = sorted[i].text.trim();
        let mut j = i + 1;
        while j < sorted.len() && sorted[j].text.trim() == text {
            j += 1;
        }
        let first = sorted[i];
        let last = sorted[j - 1];
        if !text.is_empty() && j - i > 1 && last.end_ms - first.start_ms >= min_span_ms {
            let start_sec = first.start_ms.div_euclid(1000);
            let end_sec = (last.end_ms + 999).div_euclid(1000);
            regions.push((start_sec, end_sec, text.to_string()));
        }
        i = j;
    }

    let mut merged: Vec<(i64, i64, String)> = Vec::with_capacity(regions.len());
    for (start, end, text) in regions {
        match merged.last_mut() {
            Some(prev) if start < prev.1 => prev.1 = prev.1.max(end),
            _ => merged.push((start, end, text)),
        }
    }

    debug!(rows = rows.len(), loops = merged.len(), "loop detection finished");
    merged
        .into_iter()
        .enumerate()
        .map(|(n, (start, end, text))| PatchEntry {
            id: format!("p{}", n + 1),
            start_sec: start as f64,
            end_sec: end as f64,
            text,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(start_ms: i64, end_ms: i64, text: &str) -> TranscriptRow {
        TranscriptRow::new(start_ms, end_ms, text)
    }

    fn repeated(from_ms: i64, count: i64, step_ms: i64, text: &str) -> Vec<TranscriptRow> {
        (0..count)
            .map(|k| row(from_ms + k * step_ms, from_ms + (k + 1) * step_ms, text))
            .collect()
    }

    #[test]
    fn long_repetition_is_flagged() {
        let mut rows = vec![row(0, 4_000, "開会します")];
        rows.extend(repeated(4_200, 8, 5_000, "ありがとうございました"));
        rows.push(row(44_500, 47_000, "次の議題"));

        let loops = detect_loops(&rows, 30);
        assert_eq!(loops.len(), 1);
        let entry = &loops[0];
        assert_eq!(entry.id, "p1");
        assert_eq!(entry.start_sec, 4.0);
        assert_eq!(entry.end_sec, 45.0);
        assert_eq!(entry.text, "ありがとうございました");
    }

    #[test]
    fn short_repetition_is_ignored() {
        let rows = repeated(0, 3, 5_000, "はい");
        assert!(detect_loops(&rows, 30).is_empty());
    }

    #[test]
    fn single_long_row_is_not_a_loop() {
        let rows = vec![row(0, 60_000, "長い発言")];
        assert!(detect_loops(&rows, 30).is_empty());
    }

    #[test]
    fn blank_text_never_loops() {
        let rows = repeated(0, 10, 5_000, "  ");
        assert!(detect_loops(&rows, 30).is_empty());
    }

    #[test]
    fn widened_neighbours_are_coalesced() {
        let mut rows = repeated(0, 7, 5_000, "a"); // 0 .. 35_000
        rows.extend(repeated(34_600, 7, 5_000, "b")); // starts inside second 34
        let loops = detect_loops(&rows, 30);
        assert_eq!(loops.len(), 1);
        assert_eq!((loops[0].start_sec, loops[0].end_sec), (0.0, 70.0));
        assert_eq!(loops[0].text, "a");
    }
}
