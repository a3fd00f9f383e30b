use scribe_jobs::JobError;
use scribe_media::MediaError;
use thiserror::Error;

/// Errors that can occur while scheduling or driving jobs.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An upstream artifact exists but cannot be read as the expected table.
    /// Aborts scheduling for that request only.
    #[error("Malformed artifact: {0}")]
    MalformedArtifact(MediaError),

    /// A workflow declared jobs that depend on their own outputs.
    #[error("Dependency cycle among jobs: {}", jobs.join(", "))]
    DependencyCycle { jobs: Vec<String> },

    /// Media-layer failure that is not about artifact shape (I/O, HTTP).
    #[error("Media error: {0}")]
    Media(MediaError),

    /// A job could not start; see [`JobError::UnsatisfiedPrecondition`].
    #[error(transparent)]
    Job(#[from] JobError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MediaError> for SchedulerError {
    fn from(e: MediaError) -> Self {
        if e.is_malformed_artifact() {
            SchedulerError::MalformedArtifact(e)
        } else {
            SchedulerError::Media(e)
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
