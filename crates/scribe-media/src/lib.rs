//! `scribe-media` — everything the workflows know about media artifacts.
//!
//! * [`commands`]: argument templates for ffmpeg and whisper.cpp
//! * [`silence`]: parse ffmpeg `silencedetect` output into speech segments
//! * [`tables`]: CSV row types for segment, patch and transcript tables
//! * [`loops`]: detect repeated-text ("looping") regions in a transcript
//! * [`merge`]: offset per-segment results and splice patches back in
//! * [`playlist`]: resolve a broadcast page to its HLS playlist URL

pub mod commands;
pub mod error;
pub mod loops;
pub mod merge;
pub mod playlist;
pub mod silence;
pub mod tables;

pub use commands::Toolbox;
pub use error::{MediaError, Result};
pub use tables::{PatchEntry, Segment, TranscriptRow, WhisperRow};
