//! Video → audio → silence-delimited segments → whisper → `transcript.csv`.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context as _;
use scribe_jobs::{Context, Job};
use scribe_media::{
    playlist::{is_playlist_url, resolve_playlist},
    silence::{read_silences, to_segments},
    tables::{read_segments, write_segments},
    MediaError, Toolbox,
};
use tracing::{debug, info};

use crate::{
    error::Result,
    scheduler::{priority, JobScheduler, SchedulerBase},
    stages::Stages,
    types::{Request, Workflow},
};

/// Schedules the transcription pipeline of each video.
///
/// The segment fan-out is two-phase: split and whisper jobs are emitted
/// only once `segment.csv` exists, one pair per row.
pub struct TranscriptionScheduler {
    base: SchedulerBase,
    toolbox: Toolbox,
}

impl TranscriptionScheduler {
    pub fn new(base: SchedulerBase, toolbox: Toolbox) -> Self {
        Self { base, toolbox }
    }
}

impl JobScheduler for TranscriptionScheduler {
    fn base(&self) -> &SchedulerBase {
        &self.base
    }

    fn workflow(&self) -> Workflow {
        Workflow::Transcribe
    }

    fn schedule(&self, request: &Request) -> Result<Vec<Job>> {
        let stages = Stages::new(&self.toolbox, self.base.paths(), request.video_id);
        let playlist = stages.data("playlist.txt");
        let video = stages.data("video.mp4");
        let audio = stages.data("audio.mp3");
        let silence = stages.data("silence.txt");
        let segment = stages.data("segment.csv");
        let transcript = stages.data("transcript.csv");

        let mut jobs = Vec::new();

        let playlist_url = if is_playlist_url(&request.source_url) {
            Some(request.source_url.clone())
        } else {
            if !video.exists() {
                jobs.push(resolve_job(&stages, &request.source_url, &playlist));
            }
            read_playlist(&playlist)?
        };
        if let Some(url) = playlist_url {
            jobs.push(stages.process(
                "download",
                Context::new(priority::DOWNLOAD).with_output(&video),
                stages.toolbox().download(&url, &video),
            ));
        }
        jobs.push(stages.process(
            "audio",
            Context::new(priority::AUDIO).with_input(&video).with_output(&audio),
            stages.toolbox().extract_audio(&video, &audio),
        ));

        if request.download_only {
            return self.base.finalize(jobs);
        }

        jobs.push(stages.process(
            "silence",
            Context::new(priority::SILENCE).with_input(&audio).with_output(&silence),
            stages.toolbox().detect_silence(&audio, &silence),
        ));
        jobs.push(segment_job(&stages, &silence, &segment));

        if segment.exists() {
            let segments = read_segments(&segment)?;
            debug!(video_id = %request.video_id, count = segments.len(), "segments found");
            let (clip_jobs, results) = stages.clip_jobs(&audio, &segments);
            jobs.extend(clip_jobs);
            jobs.push(stages.merge_clips("merge_transcript", segment, read_segments, &results, transcript));
        }

        self.base.finalize(jobs)
    }
}

fn resolve_job(stages: &Stages<'_>, page_url: &str, playlist: &Path) -> Job {
    let page = page_url.to_string();
    let out = playlist.to_path_buf();
    stages.function(
        "resolve_playlist",
        Context::new(priority::RESOLVE).with_output(playlist),
        move || {
            let url = resolve_playlist(&page).with_context(|| format!("resolving {page}"))?;
            fs::write(&out, format!("{url}\n"))?;
            info!(page = %page, playlist = %url, "playlist resolved");
            Ok(())
        },
    )
}

fn segment_job(stages: &Stages<'_>, silence: &Path, segment: &Path) -> Job {
    let input = silence.to_path_buf();
    let out = segment.to_path_buf();
    stages.function(
        "segment",
        Context::new(priority::SEGMENT).with_input(silence).with_output(segment),
        move || {
            let silences = read_silences(&input).with_context(|| format!("reading {}", input.display()))?;
            let segments = to_segments(&silences);
            write_segments(&out, &segments)?;
            info!(silences = silences.len(), segments = segments.len(), "segments written");
            Ok(())
        },
    )
}

/// The resolved playlist URL, if the resolve job has run.
fn read_playlist(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => {
            let url = text.trim();
            if url.is_empty() {
                return Err(MediaError::malformed(path, "empty playlist file").into());
            }
            Ok(Some(url.to_string()))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
