use chrono::{DateTime, Utc};
use scribe_core::types::{VideoId, VideoRecord};
use serde::{Deserialize, Serialize};

/// Which pipeline a scheduler builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workflow {
    /// Video → audio → segments → transcript.
    Transcribe,
    /// Re-transcribe looping regions of a finished transcript.
    Patch,
}

impl std::fmt::Display for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Workflow::Transcribe => "transcribe",
            Workflow::Patch => "patch",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Workflow {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "transcribe" => Ok(Workflow::Transcribe),
            "patch" => Ok(Workflow::Patch),
            other => Err(format!("unknown workflow: {other}")),
        }
    }
}

/// One video to (potentially) schedule work for. Rebuilt from the catalog on
/// every poll.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub video_id: VideoId,
    /// Broadcast page URL or direct `.m3u8` playlist.
    pub source_url: String,
    /// Newer requests win priority ties.
    pub timestamp: DateTime<Utc>,
    /// Stop after audio extraction.
    pub download_only: bool,
}

impl Request {
    pub fn from_record(record: &VideoRecord, download_only: bool) -> Self {
        Self {
            video_id: record.id,
            source_url: record.url.clone(),
            timestamp: record.published_at,
            download_only,
        }
    }
}
