use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Lifecycle of one job within a single scheduling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Built by a scheduler, not yet run.
    Pending,
    /// Currently executing.
    Running,
    /// Finished (or found already satisfied).
    Success,
    /// The process or function failed.
    Failure,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Failure => "failure",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "success" => Ok(JobStatus::Success),
            "failure" => Ok(JobStatus::Failure),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Per-run knobs for [`crate::Job::run`].
///
/// Callers that want the job's own settings can use `RunOptions::default()`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Overrides the log file the job was built with (process jobs only).
    pub log_path: Option<PathBuf>,

    /// Execute even when every output already exists.
    pub force: bool,
}

impl RunOptions {
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }
}
