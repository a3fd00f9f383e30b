use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use scribe_jobs::{Job, JobStatus};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{db::init_db, error::Result, types::Workflow};

/// Audit entry for one executed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// UUIDv7.
    pub id: String,
    pub workflow: Workflow,
    /// `<video_id>/<job name>`.
    pub job_id: String,
    pub outputs: Vec<String>,
    pub status: JobStatus,
    pub recorded_at: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn new(workflow: Workflow, job: &Job, status: JobStatus) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            workflow,
            job_id: job.id(),
            outputs: job
                .context()
                .outputs()
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            status,
            recorded_at: Utc::now(),
        }
    }
}

/// Destination for execution records. Writes are best-effort: the scheduler
/// logs a failed write and carries on.
pub trait RecordSink: Send + Sync {
    fn record(&self, entry: &ExecutionRecord) -> Result<()>;
}

/// Appends records to the `job_records` SQLite table.
pub struct SqliteRecordSink {
    db: Mutex<Connection>,
}

impl SqliteRecordSink {
    /// Wrap an open connection, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self { db: Mutex::new(conn) })
    }

    /// Most recent records first.
    pub fn recent(&self, limit: usize) -> Result<Vec<ExecutionRecord>> {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = db.prepare(
            "SELECT id, workflow, job_id, outputs, status, recorded_at
             FROM job_records ORDER BY rowid DESC LIMIT ?1",
        )?;
        let records = stmt
            .query_map([i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
                Ok((
                    row.get::<_, String>(0)?, // id
                    row.get::<_, String>(1)?, // workflow
                    row.get::<_, String>(2)?, // job_id
                    row.get::<_, String>(3)?, // outputs JSON
                    row.get::<_, String>(4)?, // status
                    row.get::<_, String>(5)?, // recorded_at
                ))
            })?
            .filter_map(|r| {
                let (id, workflow, job_id, outputs, status, recorded_at) = r.ok()?;
                Some(ExecutionRecord {
                    id,
                    workflow: workflow.parse().ok()?,
                    job_id,
                    outputs: serde_json::from_str(&outputs).ok()?,
                    status: status.parse().ok()?,
                    recorded_at: DateTime::parse_from_rfc3339(&recorded_at)
                        .ok()?
                        .with_timezone(&Utc),
                })
            })
            .collect();
        Ok(records)
    }
}

impl RecordSink for SqliteRecordSink {
    fn record(&self, entry: &ExecutionRecord) -> Result<()> {
        let outputs = serde_json::to_string(&entry.outputs).unwrap_or_else(|_| "[]".to_string());
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        db.execute(
            "INSERT INTO job_records (id, workflow, job_id, outputs, status, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                entry.id,
                entry.workflow.to_string(),
                entry.job_id,
                outputs,
                entry.status.to_string(),
                entry.recorded_at.to_rfc3339(),
            ],
        )?;
        debug!(job = %entry.job_id, status = %entry.status, "execution recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_jobs::Context;

    #[test]
    fn records_round_trip_newest_first() {
        let sink = SqliteRecordSink::new(Connection::open_in_memory().unwrap()).unwrap();
        let download = Job::function("download", Context::new(0).with_output("/w/1/data/video.mp4"), || Ok(()))
            .in_scope("1");
        let audio = Job::function("audio", Context::new(10).with_output("/w/1/data/audio.mp3"), || Ok(()))
            .in_scope("1");

        sink.record(&ExecutionRecord::new(Workflow::Transcribe, &download, JobStatus::Success))
            .unwrap();
        sink.record(&ExecutionRecord::new(Workflow::Transcribe, &audio, JobStatus::Failure))
            .unwrap();

        let recent = sink.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].job_id, "1/audio");
        assert_eq!(recent[0].status, JobStatus::Failure);
        assert_eq!(recent[1].outputs, vec!["/w/1/data/video.mp4".to_string()]);
        assert_eq!(recent[1].workflow, Workflow::Transcribe);
    }

    #[test]
    fn unbounded_limit_returns_everything() {
        let sink = SqliteRecordSink::new(Connection::open_in_memory().unwrap()).unwrap();
        for n in 0..3 {
            let job = Job::function("merge", Context::new(60), || Ok(())).in_scope(n.to_string());
            sink.record(&ExecutionRecord::new(Workflow::Patch, &job, JobStatus::Success))
                .unwrap();
        }

        assert_eq!(sink.recent(usize::MAX).unwrap().len(), 3);
        assert_eq!(sink.recent(1).unwrap().len(), 1);
    }
}
