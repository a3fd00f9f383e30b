use std::sync::Arc;
use std::time::Duration;

use scribe_core::types::VideoId;
use scribe_jobs::{Job, JobError, JobStatus, RunOptions};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    catalog::Catalog,
    error::Result,
    scheduler::JobScheduler,
    types::Request,
};

/// Where the control loop is between two steps.
#[derive(Debug)]
pub enum EngineState {
    /// Ready to read the catalog.
    Idle,
    /// Requests built from the catalog, waiting to be scheduled.
    Selecting(Vec<Request>),
    /// Head job of the batch, about to run.
    Executing(Job),
    /// Finished job and its outcome, about to be recorded.
    Recording(Job, JobStatus),
    /// Nothing runnable; wait this long before polling again.
    Sleeping(Duration),
}

impl EngineState {
    pub fn name(&self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::Selecting(_) => "selecting",
            EngineState::Executing(_) => "executing",
            EngineState::Recording(..) => "recording",
            EngineState::Sleeping(_) => "sleeping",
        }
    }
}

/// Single-slot control loop: poll the catalog, schedule a batch, run only its
/// head job, record it, repeat. Exactly one job runs at a time and there is
/// no in-memory state between polls.
pub struct Engine {
    scheduler: Box<dyn JobScheduler>,
    catalog: Arc<dyn Catalog>,
    poll_interval: Duration,
    download_only: bool,
    only_video: Option<VideoId>,
    state: EngineState,
}

impl Engine {
    pub fn new(scheduler: Box<dyn JobScheduler>, catalog: Arc<dyn Catalog>, poll_interval: Duration) -> Self {
        Self {
            scheduler,
            catalog,
            poll_interval,
            download_only: false,
            only_video: None,
            state: EngineState::Idle,
        }
    }

    /// Mark every request download-only.
    pub fn download_only(mut self, download_only: bool) -> Self {
        self.download_only = download_only;
        self
    }

    /// Restrict scheduling to one video.
    pub fn only_video(mut self, video: Option<VideoId>) -> Self {
        self.only_video = video;
        self
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Requests for this poll, rebuilt from the catalog.
    fn requests(&self) -> Result<Vec<Request>> {
        let requests = self
            .catalog
            .videos()?
            .iter()
            .filter(|v| self.only_video.map_or(true, |id| v.id == id))
            .map(|v| Request::from_record(v, self.download_only))
            .collect();
        Ok(requests)
    }

    /// Advance the state machine by one transition.
    ///
    /// Never sleeps: `Sleeping` moves straight back to `Idle` and the wait is
    /// left to [`Engine::run`]. The only error is a job whose inputs vanished
    /// between scheduling and execution; it is recorded as a failure first.
    pub async fn step(&mut self) -> Result<()> {
        let state = std::mem::replace(&mut self.state, EngineState::Idle);
        self.state = match state {
            EngineState::Idle => match self.requests() {
                Ok(requests) => EngineState::Selecting(requests),
                Err(e) => {
                    error!(error = %e, "catalog read failed");
                    EngineState::Sleeping(self.poll_interval)
                }
            },
            EngineState::Selecting(requests) => {
                let batch = self.scheduler.schedule_batch(&requests);
                debug!(requests = requests.len(), jobs = batch.len(), "batch scheduled");
                match batch.into_iter().next() {
                    Some(job) => EngineState::Executing(job),
                    None => EngineState::Sleeping(self.poll_interval),
                }
            }
            EngineState::Executing(mut job) => {
                let options = RunOptions {
                    force: self.scheduler.base().force_execute(),
                    ..RunOptions::default()
                };
                match job.run(self.scheduler.base().cache(), &options).await {
                    Ok(status) => EngineState::Recording(job, status),
                    Err(e) => {
                        self.scheduler.record(&job, JobStatus::Failure);
                        return Err(e.into());
                    }
                }
            }
            EngineState::Recording(job, status) => {
                self.scheduler.record(&job, status);
                EngineState::Idle
            }
            EngineState::Sleeping(_) => EngineState::Idle,
        };
        Ok(())
    }

    /// Step until nothing is runnable. Returns the number of jobs executed.
    pub async fn run_until_idle(&mut self) -> Result<usize> {
        let mut executed = 0;
        loop {
            self.step().await?;
            match &self.state {
                EngineState::Recording(..) => executed += 1,
                EngineState::Sleeping(_) => {
                    self.state = EngineState::Idle;
                    return Ok(executed);
                }
                _ => {}
            }
        }
    }

    /// Run every job of one forced batch in list order, then return the
    /// number of jobs that executed.
    ///
    /// Presence filtering is off when forced, so the polling loop would never
    /// converge; a forced run is a single pass. A job whose inputs are still
    /// missing because an upstream job failed is recorded as a failure and
    /// skipped.
    pub async fn run_forced_batch(&mut self) -> Result<usize> {
        let requests = self.requests()?;
        let batch = self.scheduler.schedule_batch(&requests);
        info!(jobs = batch.len(), "running forced batch");

        let options = RunOptions::forced();
        let mut executed = 0;
        for mut job in batch {
            match job.run(self.scheduler.base().cache(), &options).await {
                Ok(status) => {
                    self.scheduler.record(&job, status);
                    executed += 1;
                }
                Err(JobError::UnsatisfiedPrecondition { job: id, missing }) => {
                    warn!(job = %id, ?missing, "inputs missing after upstream failure; skipped");
                    self.scheduler.record(&job, JobStatus::Failure);
                }
                Err(e) => {
                    self.scheduler.record(&job, JobStatus::Failure);
                    return Err(e.into());
                }
            }
        }
        Ok(executed)
    }

    /// Main loop. Runs until `shutdown` broadcasts `true` (or its sender is
    /// dropped). A running job is never interrupted; shutdown is observed
    /// between steps and during sleeps.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            workflow = %self.scheduler.workflow(),
            poll_secs = self.poll_interval.as_secs(),
            "engine started"
        );

        if self.scheduler.base().force_execute() {
            let executed = self.run_forced_batch().await?;
            info!(executed, "forced batch finished");
            return Ok(());
        }

        loop {
            if *shutdown.borrow() {
                info!("engine shutting down");
                return Ok(());
            }
            if let EngineState::Sleeping(wait) = &self.state {
                debug!(secs = wait.as_secs(), "nothing runnable; sleeping");
                tokio::select! {
                    _ = tokio::time::sleep(*wait) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            warn!("shutdown channel closed; stopping engine");
                            return Ok(());
                        }
                    }
                }
            }
            self.step().await?;
        }
    }
}
