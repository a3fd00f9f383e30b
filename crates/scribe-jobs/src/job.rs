use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use scribe_core::ToolCommand;
use tracing::{debug, error, info, warn};

use crate::{
    cache::ArtifactCache,
    context::Context,
    error::{JobError, Result},
    process::run_process,
    types::{JobStatus, RunOptions},
};

/// Body of an in-process job. Runs on a blocking thread.
pub type JobFn = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// How a job does its work.
#[derive(Clone)]
pub enum JobAction {
    /// Spawn an external tool; success is a zero exit code.
    Process(ToolCommand),
    /// Call a function; success is `Ok(())`.
    Function(JobFn),
}

impl fmt::Debug for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobAction::Process(cmd) => f.debug_tuple("Process").field(&cmd.to_string()).finish(),
            JobAction::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// One schedulable unit of work.
///
/// Jobs are rebuilt from disk state on every scheduling pass and dropped once
/// their outcome has been recorded.
#[derive(Debug, Clone)]
pub struct Job {
    name: String,
    scope: String,
    context: Context,
    action: JobAction,
    log_path: Option<PathBuf>,
    status: JobStatus,
}

impl Job {
    /// An external-process job.
    pub fn process(name: impl Into<String>, context: Context, command: ToolCommand) -> Self {
        Self::with_action(name, context, JobAction::Process(command))
    }

    /// An in-process job.
    pub fn function<F>(name: impl Into<String>, context: Context, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::with_action(name, context, JobAction::Function(Arc::new(f)))
    }

    fn with_action(name: impl Into<String>, context: Context, action: JobAction) -> Self {
        Self {
            name: name.into(),
            scope: String::new(),
            context,
            action,
            log_path: None,
            status: JobStatus::Pending,
        }
    }

    /// Group the job under a request, e.g. the video id. Used in
    /// [`Job::id`] so equally named jobs of different videos stay distinct.
    pub fn in_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Default log destination for process output.
    pub fn with_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `scope/name`, or just `name` when unscoped.
    pub fn id(&self) -> String {
        if self.scope.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.scope, self.name)
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn action(&self) -> &JobAction {
        &self.action
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Execute the job unless it is already satisfied.
    ///
    /// Tool and function failures are logged and returned as
    /// [`JobStatus::Failure`]; outputs left behind by a failed run are removed
    /// so the next poll retries the job. The only error is
    /// [`JobError::UnsatisfiedPrecondition`], raised before anything runs.
    pub async fn run(&mut self, cache: &dyn ArtifactCache, options: &RunOptions) -> Result<JobStatus> {
        let id = self.id();

        if !options.force && cache.is_satisfied(&self.context) {
            debug!(job = %id, "outputs present; skipping");
            self.status = JobStatus::Success;
            return Ok(self.status);
        }

        let missing = self.context.missing_inputs();
        if !missing.is_empty() {
            self.status = JobStatus::Failure;
            return Err(JobError::UnsatisfiedPrecondition { job: id, missing });
        }

        self.status = JobStatus::Running;
        info!(job = %id, forced = options.force, "job started");

        let log_path = options.log_path.clone().or_else(|| self.log_path.clone());
        let outcome = match self.prepare_dirs(log_path.as_deref()) {
            Ok(()) => self.execute(log_path.as_deref()).await,
            Err(e) => Err(e),
        };

        self.status = match outcome {
            Ok(()) => {
                let absent: Vec<&PathBuf> =
                    self.context.outputs().iter().filter(|p| !p.exists()).collect();
                if !absent.is_empty() {
                    warn!(job = %id, ?absent, "job succeeded without producing every output");
                }
                info!(job = %id, "job succeeded");
                JobStatus::Success
            }
            Err(e) => {
                error!(job = %id, error = %e, "job failed");
                self.discard_outputs();
                JobStatus::Failure
            }
        };
        Ok(self.status)
    }

    async fn execute(&self, log_path: Option<&Path>) -> Result<()> {
        match &self.action {
            JobAction::Process(command) => run_process(command, log_path).await,
            JobAction::Function(f) => {
                let f = Arc::clone(f);
                match tokio::task::spawn_blocking(move || f()).await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(JobError::InProcess(format!("{e:#}"))),
                    Err(join) => Err(JobError::InProcess(format!("panicked: {join}"))),
                }
            }
        }
    }

    fn prepare_dirs(&self, log_path: Option<&Path>) -> Result<()> {
        let parents = self
            .context
            .outputs()
            .iter()
            .map(PathBuf::as_path)
            .chain(log_path)
            .filter_map(Path::parent)
            .filter(|p| !p.as_os_str().is_empty());
        for dir in parents {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    fn discard_outputs(&self) {
        for path in self.context.outputs() {
            if path.exists() {
                match std::fs::remove_file(path) {
                    Ok(()) => debug!(path = %path.display(), "removed partial output"),
                    Err(e) => warn!(path = %path.display(), error = %e, "could not remove partial output"),
                }
            }
        }
    }
}
