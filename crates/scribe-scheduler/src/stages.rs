//! Job builders shared by the transcription and patch workflows.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use scribe_core::{types::VideoId, PathHelper, ToolCommand};
use scribe_jobs::{Context, Job};
use scribe_media::{
    commands::whisper_result_path,
    merge::merge_clip_results,
    tables::{read_whisper, write_transcript, Clip},
    Toolbox,
};
use tracing::info;

use crate::scheduler::priority;

/// Reads a clip table (`segment.csv`, `patch.csv`).
pub(crate) type ClipReader<C> = fn(&Path) -> scribe_media::Result<Vec<C>>;

/// Builds the jobs of one video.
pub(crate) struct Stages<'a> {
    toolbox: &'a Toolbox,
    paths: &'a PathHelper,
    video_id: VideoId,
}

impl<'a> Stages<'a> {
    pub fn new(toolbox: &'a Toolbox, paths: &'a PathHelper, video_id: VideoId) -> Self {
        Self {
            toolbox,
            paths,
            video_id,
        }
    }

    pub fn toolbox(&self) -> &Toolbox {
        self.toolbox
    }

    pub fn data(&self, name: &str) -> PathBuf {
        self.paths.data_file(self.video_id, name)
    }

    /// An external-tool job logging to `log/<name>.log`.
    pub fn process(&self, name: &str, context: Context, command: ToolCommand) -> Job {
        Job::process(name, context, command)
            .in_scope(self.video_id.to_string())
            .with_log(self.paths.log_file(self.video_id, name))
    }

    pub fn function<F>(&self, name: &str, context: Context, f: F) -> Job
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Job::function(name, context, f).in_scope(self.video_id.to_string())
    }

    /// `split_<id>` and `whisper_<id>` for every clip, plus the whisper
    /// result paths in clip order.
    pub fn clip_jobs<C: Clip>(&self, audio: &Path, clips: &[C]) -> (Vec<Job>, Vec<PathBuf>) {
        let mut jobs = Vec::with_capacity(clips.len() * 2);
        let mut results = Vec::with_capacity(clips.len());
        for clip in clips {
            let id = clip.clip_id();
            let wav = self.data(&format!("{id}.wav"));
            let result = whisper_result_path(&wav);

            let split = self.toolbox.split_audio(audio, clip.start_sec(), clip.end_sec(), &wav);
            jobs.push(self.process(
                &format!("split_{id}"),
                Context::new(priority::SPLIT).with_input(audio).with_output(&wav),
                split,
            ));
            jobs.push(self.process(
                &format!("whisper_{id}"),
                Context::new(priority::WHISPER).with_input(&wav).with_output(&result),
                self.toolbox.whisper(&wav),
            ));
            results.push(result);
        }
        (jobs, results)
    }

    /// Merge per-clip whisper results listed in `table` into one
    /// transcript at `out`, offsetting each clip by its start.
    pub fn merge_clips<C>(
        &self,
        name: &str,
        table: PathBuf,
        read: ClipReader<C>,
        results: &[PathBuf],
        out: PathBuf,
    ) -> Job
    where
        C: Clip + Send + Sync + 'static,
    {
        let context = Context::new(priority::MERGE)
            .with_input(&table)
            .with_inputs(results)
            .with_output(&out);
        let data_dir = self.paths.data_dir(self.video_id);
        self.function(name, context, move || {
            let clips = read(&table).with_context(|| format!("reading {}", table.display()))?;
            let mut pairs = Vec::with_capacity(clips.len());
            for clip in clips {
                let result = whisper_result_path(&data_dir.join(format!("{}.wav", clip.clip_id())));
                let rows = read_whisper(&result)
                    .with_context(|| format!("reading {}", result.display()))?;
                pairs.push((clip, rows));
            }
            let merged = merge_clip_results(&pairs);
            write_transcript(&out, &merged)?;
            info!(clips = pairs.len(), rows = merged.len(), out = %out.display(), "clip results merged");
            Ok(())
        })
    }
}
