use rusqlite::Connection;

use crate::error::Result;

/// Initialise the execution-record schema in `conn`.
///
/// Creates the append-only `job_records` table (idempotent) and an index on
/// `job_id` so the history of one job can be looked up quickly.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS job_records (
            id          TEXT    NOT NULL PRIMARY KEY,   -- UUIDv7, time-sortable
            workflow    TEXT    NOT NULL,
            job_id      TEXT    NOT NULL,               -- <video_id>/<job name>
            outputs     TEXT    NOT NULL,               -- JSON array of paths
            status      TEXT    NOT NULL,
            recorded_at TEXT    NOT NULL                -- ISO-8601
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_job_records_job_id ON job_records (job_id);
        ",
    )?;
    Ok(())
}
