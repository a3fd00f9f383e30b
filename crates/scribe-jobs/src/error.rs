//! Error types for the scribe-jobs crate.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    /// Declared inputs are absent when the job starts. The sorter should make
    /// this impossible, so it indicates a workflow bug.
    #[error("Job {job} started with missing inputs: {missing:?}")]
    UnsatisfiedPrecondition { job: String, missing: Vec<PathBuf> },

    /// The external program exited unsuccessfully.
    #[error("{program} exited with {status}{detail}")]
    ExternalTool {
        program: String,
        status: String,
        detail: String,
    },

    /// The external program could not be started at all.
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An in-process job function returned an error or panicked.
    #[error("In-process job failed: {0}")]
    InProcess(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, JobError>;
