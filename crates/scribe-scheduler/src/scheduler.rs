use std::cmp::Reverse;
use std::sync::Arc;

use scribe_core::PathHelper;
use scribe_jobs::{ArtifactCache, Job, JobStatus};
use tracing::{debug, warn};

use crate::{
    error::Result,
    filter::{prune_blocked, DependencyFilter},
    record::{ExecutionRecord, RecordSink},
    sort::{permute, sort_jobs, topo_order},
    types::{Request, Workflow},
};

/// Job priorities. Later pipeline stages rank higher so a video that is
/// nearly done finishes before new work starts.
pub mod priority {
    pub const RESOLVE: i32 = 0;
    pub const DOWNLOAD: i32 = 0;
    pub const AUDIO: i32 = 10;
    pub const SILENCE: i32 = 20;
    pub const SEGMENT: i32 = 30;
    pub const DEFINE_PATCH: i32 = 30;
    pub const SPLIT: i32 = 40;
    pub const WHISPER: i32 = 50;
    pub const MERGE: i32 = 60;
    pub const APPLY_PATCH: i32 = 70;
}

/// State shared by every workflow: the working-tree layout, the
/// idempotency filter and where outcomes are recorded. Fixed at construction.
pub struct SchedulerBase {
    paths: PathHelper,
    filter: DependencyFilter,
    sink: Option<Arc<dyn RecordSink>>,
}

impl SchedulerBase {
    pub fn new(paths: PathHelper, cache: Arc<dyn ArtifactCache>, force_execute: bool) -> Self {
        Self {
            paths,
            filter: DependencyFilter::new(cache, force_execute),
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn paths(&self) -> &PathHelper {
        &self.paths
    }

    pub fn cache(&self) -> &dyn ArtifactCache {
        self.filter.cache()
    }

    pub fn force_execute(&self) -> bool {
        self.filter.force_execute()
    }

    /// Common tail of every `schedule`: drop satisfied jobs, defer jobs that
    /// cannot start yet, then order producers before consumers. Forced jobs
    /// keep their emission order, which workflows build producer first.
    pub fn finalize(&self, jobs: Vec<Job>) -> Result<Vec<Job>> {
        let jobs = prune_blocked(self.filter.apply(jobs));
        if self.force_execute() {
            Ok(jobs)
        } else {
            sort_jobs(jobs)
        }
    }

    fn sink(&self) -> Option<&dyn RecordSink> {
        self.sink.as_deref()
    }
}

/// A workflow: turns requests into an ordered, idempotent job list.
pub trait JobScheduler: Send + Sync {
    fn base(&self) -> &SchedulerBase;

    fn workflow(&self) -> Workflow;

    /// Jobs still to run for one request, filtered and dependency ordered.
    fn schedule(&self, request: &Request) -> Result<Vec<Job>>;

    /// Schedule every request and merge the results into one list.
    ///
    /// Newer requests are scheduled first so they win priority ties; the
    /// merged list is stably sorted by priority, highest first. A request
    /// that fails to schedule is logged and skipped.
    ///
    /// A forced batch is not priority sorted: each request's jobs stay in
    /// emission order, newest request first, so a re-run pipeline executes
    /// front to back.
    fn schedule_batch(&self, requests: &[Request]) -> Vec<Job> {
        let mut ordered: Vec<&Request> = requests.iter().collect();
        ordered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let mut jobs = Vec::new();
        for request in ordered {
            match self.schedule(request) {
                Ok(batch) => jobs.extend(batch),
                Err(e) => warn!(
                    workflow = %self.workflow(),
                    video_id = %request.video_id,
                    error = %e,
                    "scheduling failed; request skipped"
                ),
            }
        }
        if self.base().force_execute() {
            return jobs;
        }
        jobs.sort_by_key(|job| Reverse(job.context().priority()));

        // A consumer may outrank its producer; restore dependency order
        // without disturbing priority among unrelated jobs.
        match topo_order(&jobs) {
            Ok(order) => permute(jobs, &order),
            Err(e) => {
                warn!(error = %e, "batch ordering failed; keeping priority order");
                jobs
            }
        }
    }

    /// Persist a job outcome. Best-effort: a failed write is only logged.
    fn record(&self, job: &Job, status: JobStatus) {
        let Some(sink) = self.base().sink() else {
            debug!(job = %job.id(), %status, "no record sink configured");
            return;
        };
        let entry = ExecutionRecord::new(self.workflow(), job, status);
        if let Err(e) = sink.record(&entry) {
            warn!(job = %job.id(), error = %e, "failed to record job outcome");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::SchedulerError;
    use chrono::{TimeZone, Utc};
    use scribe_core::types::VideoId;
    use scribe_jobs::{Context, PresenceCache};
    use std::sync::Mutex;

    /// Collects records in memory.
    #[derive(Default)]
    pub(crate) struct MemorySink(pub Mutex<Vec<ExecutionRecord>>);

    impl RecordSink for MemorySink {
        fn record(&self, entry: &ExecutionRecord) -> Result<()> {
            self.0.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    struct FailingSink;

    impl RecordSink for FailingSink {
        fn record(&self, _entry: &ExecutionRecord) -> Result<()> {
            Err(SchedulerError::Io(std::io::Error::other("disk full")))
        }
    }

    /// One download job per request, plus a high-priority merge that
    /// consumes it. Video 99 fails to schedule.
    struct ToyScheduler {
        base: SchedulerBase,
    }

    impl JobScheduler for ToyScheduler {
        fn base(&self) -> &SchedulerBase {
            &self.base
        }

        fn workflow(&self) -> Workflow {
            Workflow::Transcribe
        }

        fn schedule(&self, request: &Request) -> Result<Vec<Job>> {
            if request.video_id == VideoId(99) {
                return Err(SchedulerError::DependencyCycle { jobs: vec!["x".into()] });
            }
            let video = self.base.paths().data_file(request.video_id, "video.mp4");
            let out = self.base.paths().data_file(request.video_id, "transcript.csv");
            let scope = request.video_id.to_string();
            Ok(vec![
                Job::function("download", Context::new(priority::DOWNLOAD).with_output(&video), || Ok(()))
                    .in_scope(&scope),
                Job::function(
                    "merge",
                    Context::new(priority::MERGE).with_input(&video).with_output(&out),
                    || Ok(()),
                )
                .in_scope(&scope),
            ])
        }
    }

    fn request(id: i64, day: u32) -> Request {
        Request {
            video_id: VideoId(id),
            source_url: format!("https://example.jp/{id}/playlist.m3u8"),
            timestamp: Utc.with_ymd_and_hms(2023, 3, day, 9, 0, 0).unwrap(),
            download_only: false,
        }
    }

    fn toy(root: &std::path::Path, force: bool) -> ToyScheduler {
        ToyScheduler {
            base: SchedulerBase::new(PathHelper::new(root), Arc::new(PresenceCache), force),
        }
    }

    fn ids(jobs: &[Job]) -> Vec<String> {
        jobs.iter().map(Job::id).collect()
    }

    #[test]
    fn newer_request_wins_priority_ties() {
        let dir = tempfile::tempdir().expect("tempdir");
        let jobs = toy(dir.path(), false).schedule_batch(&[request(1, 1), request(2, 2)]);
        assert_eq!(ids(&jobs), vec!["2/download", "2/merge", "1/download", "1/merge"]);
    }

    #[test]
    fn forced_batch_keeps_producers_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let jobs = toy(dir.path(), true).schedule_batch(&[request(1, 1), request(2, 2)]);
        assert_eq!(ids(&jobs), vec!["2/download", "2/merge", "1/download", "1/merge"]);
    }

    #[test]
    fn failing_request_does_not_block_others() {
        let dir = tempfile::tempdir().expect("tempdir");
        let jobs = toy(dir.path(), false).schedule_batch(&[request(99, 5), request(1, 1)]);
        assert_eq!(ids(&jobs), vec!["1/download", "1/merge"]);
    }

    #[test]
    fn record_is_best_effort() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = Arc::new(MemorySink::default());
        let mut scheduler = toy(dir.path(), false);
        scheduler.base = scheduler.base.with_sink(sink.clone());
        let job = Job::function("segment", Context::new(0), || Ok(())).in_scope("4");

        scheduler.record(&job, JobStatus::Success);
        let records = sink.0.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].job_id, "4/segment");
        assert_eq!(records[0].status, JobStatus::Success);
        drop(records);

        scheduler.base = SchedulerBase::new(PathHelper::new(dir.path()), Arc::new(PresenceCache), false)
            .with_sink(Arc::new(FailingSink));
        scheduler.record(&job, JobStatus::Failure);
    }
}
