//! Assemble transcripts from per-clip whisper results and splice patch
//! re-transcriptions back into an existing transcript.

use crate::error::{MediaError, Result};
use crate::tables::{Clip, PatchEntry, TranscriptRow, WhisperRow};

/// Shift each clip's relative whisper timestamps by the clip start and
/// concatenate, sorted by start time.
pub fn merge_clip_results<C: Clip>(clips: &[(C, Vec<WhisperRow>)]) -> Vec<TranscriptRow> {
    let mut rows: Vec<TranscriptRow> = clips
        .iter()
        .flat_map(|(clip, results)| {
            let offset_ms = (clip.start_sec() * 1000.0).round() as i64;
            results.iter().map(move |r| TranscriptRow {
                start_ms: r.start + offset_ms,
                end_ms: r.end + offset_ms,
                text: r.text.clone(),
            })
        })
        .collect();
    rows.sort_by_key(|r| r.start_ms);
    rows
}

/// Whether `row` lies entirely inside `entry`'s time range.
///
/// Rows that only partially overlap are kept: the patch does not fully
/// supersede them.
pub fn is_masked(row: &TranscriptRow, entry: &PatchEntry) -> bool {
    row.start_ms as f64 >= entry.start_sec * 1000.0 && row.end_ms as f64 <= entry.end_sec * 1000.0
}

/// Reject entry sets whose ranges intersect; masks must be disjoint.
pub fn check_disjoint(entries: &[PatchEntry]) -> Result<()> {
    let mut sorted: Vec<&PatchEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.start_sec.total_cmp(&b.start_sec));
    for pair in sorted.windows(2) {
        if pair[1].start_sec < pair[0].end_sec {
            return Err(MediaError::OverlappingPatches {
                first: pair[0].id.clone(),
                second: pair[1].id.clone(),
            });
        }
    }
    Ok(())
}

/// Remove every original row covered by some entry, add the corrected rows,
/// and sort by start time. Equal start times keep original rows first.
pub fn apply_patch(
    transcript: Vec<TranscriptRow>,
    entries: &[PatchEntry],
    corrected: Vec<TranscriptRow>,
) -> Result<Vec<TranscriptRow>> {
    check_disjoint(entries)?;

    let mut out: Vec<TranscriptRow> = transcript
        .into_iter()
        .filter(|row| !entries.iter().any(|entry| is_masked(row, entry)))
        .collect();
    out.extend(corrected);
    out.sort_by_key(|r| r.start_ms);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::Segment;

    fn row(start_ms: i64, end_ms: i64, text: &str) -> TranscriptRow {
        TranscriptRow::new(start_ms, end_ms, text)
    }

    fn entry(id: &str, start_sec: f64, end_sec: f64) -> PatchEntry {
        PatchEntry {
            id: id.into(),
            start_sec,
            end_sec,
            text: String::new(),
        }
    }

    #[test]
    fn patch_replaces_fully_covered_row() {
        let transcript = vec![row(0, 5000, "a"), row(5000, 9000, "b"), row(9000, 12000, "c")];
        let corrected = vec![row(5000, 9000, "b-fixed")];

        let merged = apply_patch(transcript, &[entry("p1", 5.0, 9.0)], corrected).expect("apply");
        assert_eq!(
            merged,
            vec![row(0, 5000, "a"), row(5000, 9000, "b-fixed"), row(9000, 12000, "c")]
        );
    }

    #[test]
    fn partial_overlap_is_kept() {
        let p = entry("p1", 5.0, 9.0);
        assert!(is_masked(&row(5000, 9000, "x"), &p));
        assert!(is_masked(&row(6000, 7000, "x"), &p));
        assert!(!is_masked(&row(4000, 6000, "x"), &p));
        assert!(!is_masked(&row(8000, 9500, "x"), &p));

        let merged = apply_patch(vec![row(4000, 6000, "edge")], &[p], vec![]).expect("apply");
        assert_eq!(merged, vec![row(4000, 6000, "edge")]);
    }

    #[test]
    fn every_entry_masks_its_own_range() {
        let transcript = vec![
            row(0, 1000, "keep"),
            row(2000, 3000, "loop"),
            row(4000, 5000, "keep"),
            row(6000, 7000, "loop"),
        ];
        let entries = [entry("p1", 2.0, 3.0), entry("p2", 6.0, 7.0)];
        let corrected = vec![row(6000, 7000, "fixed2"), row(2000, 3000, "fixed1")];

        let merged = apply_patch(transcript, &entries, corrected).expect("apply");
        let texts: Vec<_> = merged.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["keep", "fixed1", "keep", "fixed2"]);
    }

    #[test]
    fn overlapping_entries_are_rejected() {
        let entries = [entry("p1", 0.0, 10.0), entry("p2", 9.0, 20.0)];
        let err = apply_patch(vec![], &entries, vec![]).unwrap_err();
        assert!(matches!(err, MediaError::OverlappingPatches { .. }));
        // Touching ranges are fine.
        assert!(check_disjoint(&[entry("p1", 0.0, 10.0), entry("p2", 10.0, 20.0)]).is_ok());
    }

    #[test]
    fn clip_results_are_offset_and_sorted() {
        let clips = vec![
            (
                Segment { segment_id: "s2".into(), start_sec: 35.5, end_sec: None },
                vec![WhisperRow { start: 0, end: 1500, text: "second".into() }],
            ),
            (
                Segment { segment_id: "s1".into(), start_sec: 0.0, end_sec: Some(20.0) },
                vec![
                    WhisperRow { start: 0, end: 900, text: "first".into() },
                    WhisperRow { start: 900, end: 2000, text: "first-b".into() },
                ],
            ),
        ];
        let rows = merge_clip_results(&clips);
        assert_eq!(
            rows,
            vec![
                row(0, 900, "first"),
                row(900, 2000, "first-b"),
                row(35_500, 37_000, "second"),
            ]
        );
    }
}
