use std::path::Path;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags};
use scribe_core::types::{VideoId, VideoRecord};
use tracing::warn;

use crate::error::Result;

/// Read-only source of videos to transcribe.
pub trait Catalog: Send + Sync {
    fn videos(&self) -> Result<Vec<VideoRecord>>;
}

/// Reads the `videos(id, url, published_at)` table of the crawler's SQLite
/// database. The connection is opened read-only; the scheduler never writes
/// to the catalog.
pub struct SqliteCatalog {
    db: Mutex<Connection>,
}

impl SqliteCatalog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self::new(conn))
    }

    /// Wrap an already-open connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }
}

impl Catalog for SqliteCatalog {
    fn videos(&self) -> Result<Vec<VideoRecord>> {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = db.prepare_cached("SELECT id, url, published_at FROM videos ORDER BY id")?;
        let videos = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .filter_map(|r| {
                let (id, url, published_at) = r.ok()?;
                match DateTime::parse_from_rfc3339(&published_at) {
                    Ok(ts) => Some(VideoRecord {
                        id: VideoId(id),
                        url,
                        published_at: ts.with_timezone(&Utc),
                    }),
                    Err(e) => {
                        warn!(video_id = id, %published_at, "skipping video with bad timestamp: {e}");
                        None
                    }
                }
            })
            .collect();
        Ok(videos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_and_skips_bad_timestamps() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE videos (id INTEGER PRIMARY KEY, url TEXT NOT NULL, published_at TEXT NOT NULL);
             INSERT INTO videos VALUES (2, 'https://example.jp/v/2', '2023-03-02T10:00:00+09:00');
             INSERT INTO videos VALUES (1, 'https://example.jp/v/1', '2023-03-01T10:00:00Z');
             INSERT INTO videos VALUES (3, 'https://example.jp/v/3', 'yesterday');",
        )
        .unwrap();

        let videos = SqliteCatalog::new(conn).videos().unwrap();
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].id, VideoId(1));
        assert_eq!(videos[1].url, "https://example.jp/v/2");
        assert_eq!(videos[1].published_at.to_rfc3339(), "2023-03-02T01:00:00+00:00");
    }
}
