use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric identifier of a video in the upstream catalog.
///
/// Also names the per-video working directory, so it must stay stable for the
/// lifetime of a video's artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VideoId(pub i64);

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the read-only video catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: VideoId,
    /// Broadcast page URL, or a direct `.m3u8` playlist URL.
    pub url: String,
    /// Publication time, used to prefer newer broadcasts on ties.
    pub published_at: DateTime<Utc>,
}
