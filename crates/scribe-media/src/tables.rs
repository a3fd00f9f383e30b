//! CSV artifact tables.
//!
//! | file                    | row type          | columns                        |
//! |-------------------------|-------------------|--------------------------------|
//! | `segment.csv`           | [`Segment`]       | `segment_id,start_sec,end_sec` |
//! | `patch.csv`             | [`PatchEntry`]    | `id,start_sec,end_sec,text`    |
//! | `transcript*.csv`       | [`TranscriptRow`] | `start_ms,end_ms,text`         |
//! | `<id>.wav.csv`          | [`WhisperRow`]    | `start,end,text` (whisper.cpp) |

use std::path::Path;

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use crate::error::{MediaError, Result};

/// A speech region between two silences. `end_sec` is `None` for a trailing
/// segment whose end is the end of the audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: String,
    pub start_sec: f64,
    pub end_sec: Option<f64>,
}

/// A transcript region flagged for re-transcription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchEntry {
    pub id: String,
    pub start_sec: f64,
    pub end_sec: f64,
    pub text: String,
}

/// One transcript line with absolute, integral millisecond bounds.
///
/// Reading tolerates float columns (`5000.0`) and rounds them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRow {
    #[serde(deserialize_with = "ms_from_number")]
    pub start_ms: i64,
    #[serde(deserialize_with = "ms_from_number")]
    pub end_ms: i64,
    pub text: String,
}

impl TranscriptRow {
    pub fn new(start_ms: i64, end_ms: i64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            text: text.into(),
        }
    }
}

/// One line of whisper.cpp `--output-csv` output, relative to the clip start.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WhisperRow {
    #[serde(deserialize_with = "ms_from_number")]
    pub start: i64,
    #[serde(deserialize_with = "ms_from_number")]
    pub end: i64,
    pub text: String,
}

/// A clip cut out of the full audio for transcription: a segment or a patch
/// entry. `start_sec` is the offset added to every whisper timestamp.
pub trait Clip {
    fn clip_id(&self) -> &str;
    fn start_sec(&self) -> f64;
    fn end_sec(&self) -> Option<f64>;
}

impl Clip for Segment {
    fn clip_id(&self) -> &str {
        &self.segment_id
    }
    fn start_sec(&self) -> f64 {
        self.start_sec
    }
    fn end_sec(&self) -> Option<f64> {
        self.end_sec
    }
}

impl Clip for PatchEntry {
    fn clip_id(&self) -> &str {
        &self.id
    }
    fn start_sec(&self) -> f64 {
        self.start_sec
    }
    fn end_sec(&self) -> Option<f64> {
        Some(self.end_sec)
    }
}

fn ms_from_number<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() {
        return Err(serde::de::Error::custom("non-finite timestamp"));
    }
    Ok(value.round() as i64)
}

/// Read every row of a headered CSV file.
///
/// Any parse failure is reported as [`MediaError::Malformed`] naming the file,
/// so callers can tell a bad artifact apart from a missing one.
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut rows = Vec::new();
    for (line, result) in reader.deserialize().enumerate() {
        let row = result
            .map_err(|e| MediaError::malformed(path, format!("row {}: {e}", line + 1)))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Write rows as a headered CSV file, replacing any existing file.
///
/// An empty table still gets its header line so readers see the schema.
pub fn write_table<T: Serialize>(path: &Path, rows: &[T], header: &[&str]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub const SEGMENT_HEADER: &[&str] = &["segment_id", "start_sec", "end_sec"];
pub const PATCH_HEADER: &[&str] = &["id", "start_sec", "end_sec", "text"];
pub const TRANSCRIPT_HEADER: &[&str] = &["start_ms", "end_ms", "text"];

pub fn read_segments(path: &Path) -> Result<Vec<Segment>> {
    read_table(path)
}

pub fn write_segments(path: &Path, rows: &[Segment]) -> Result<()> {
    write_table(path, rows, SEGMENT_HEADER)
}

pub fn read_patches(path: &Path) -> Result<Vec<PatchEntry>> {
    read_table(path)
}

pub fn write_patches(path: &Path, rows: &[PatchEntry]) -> Result<()> {
    write_table(path, rows, PATCH_HEADER)
}

pub fn read_transcript(path: &Path) -> Result<Vec<TranscriptRow>> {
    read_table(path)
}

pub fn write_transcript(path: &Path, rows: &[TranscriptRow]) -> Result<()> {
    write_table(path, rows, TRANSCRIPT_HEADER)
}

/// Read a whisper.cpp result, trimming the leading space whisper puts in
/// every text cell.
pub fn read_whisper(path: &Path) -> Result<Vec<WhisperRow>> {
    let rows: Vec<WhisperRow> = read_table(path)?;
    Ok(rows
        .into_iter()
        .map(|row| WhisperRow {
            text: row.text.trim().to_string(),
            ..row
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn transcript_reader_rounds_float_columns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("transcript.csv");
        fs::write(&path, "start_ms,end_ms,text\n0.0,4999.6,a\n5000,9000.2,b\n").expect("write");

        let rows = read_transcript(&path).expect("read");
        assert_eq!(
            rows,
            vec![TranscriptRow::new(0, 5000, "a"), TranscriptRow::new(5000, 9000, "b")]
        );
    }

    #[test]
    fn segment_table_keeps_open_end_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("segment.csv");
        let rows = vec![
            Segment { segment_id: "s1".into(), start_sec: 0.0, end_sec: Some(12.5) },
            Segment { segment_id: "s2".into(), start_sec: 30.0, end_sec: None },
        ];
        write_segments(&path, &rows).expect("write");

        let text = fs::read_to_string(&path).expect("read back");
        assert!(text.starts_with("segment_id,start_sec,end_sec\n"));
        assert!(text.contains("s2,30.0,\n"));
        assert_eq!(read_segments(&path).expect("read"), rows);
    }

    #[test]
    fn empty_table_still_has_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("patch.csv");
        write_patches(&path, &[]).expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "id,start_sec,end_sec,text\n");
        assert!(read_patches(&path).expect("read").is_empty());
    }

    #[test]
    fn whisper_text_is_trimmed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("s1.wav.csv");
        fs::write(&path, "start,end,text\n0,1200,\" こんにちは\"\n1200,2500,\" 次に\"\n").expect("write");

        let rows = read_whisper(&path).expect("read");
        assert_eq!(rows[0].text, "こんにちは");
        assert_eq!(rows[1].start, 1200);
    }

    #[test]
    fn bad_row_is_malformed_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("segment.csv");
        fs::write(&path, "segment_id,start_sec,end_sec\ns1,soon,3\n").expect("write");

        let err = read_segments(&path).unwrap_err();
        assert!(err.is_malformed_artifact(), "got {err}");
    }
}
