use std::path::PathBuf;

use crate::types::VideoId;

/// Resolves the on-disk layout of per-video working directories.
///
/// ```text
/// <root>/<video_id>/data/   media, tables, transcripts
/// <root>/<video_id>/log/    one log file per process job
/// ```
#[derive(Debug, Clone)]
pub struct PathHelper {
    root: PathBuf,
}

impl PathHelper {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn work_dir(&self, video_id: VideoId) -> PathBuf {
        self.root.join(video_id.to_string())
    }

    pub fn data_dir(&self, video_id: VideoId) -> PathBuf {
        self.work_dir(video_id).join("data")
    }

    pub fn log_dir(&self, video_id: VideoId) -> PathBuf {
        self.work_dir(video_id).join("log")
    }

    pub fn data_file(&self, video_id: VideoId, name: &str) -> PathBuf {
        self.data_dir(video_id).join(name)
    }

    pub fn log_file(&self, video_id: VideoId, job_name: &str) -> PathBuf {
        self.log_dir(video_id).join(format!("{job_name}.log"))
    }
}
