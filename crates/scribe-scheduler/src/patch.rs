//! Re-transcribe looping regions of a finished transcript and splice the
//! corrections back in.
//!
//! ```text
//! transcript.csv ─define_patch─▶ patch.csv ─split/whisper per entry─▶ p<n>.wav.csv
//!        │                          │                                     │
//!        │                          └──────────────merge_patch────────────┴─▶ transcript_patch.csv
//!        └──────────────────────apply_patch─────────────────────────────────▶ transcript_merged.csv
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use scribe_core::config::PatchConfig;
use scribe_jobs::{Context, Job};
use scribe_media::{
    loops::detect_loops,
    merge::{apply_patch, check_disjoint},
    tables::{read_patches, read_transcript, write_patches, write_transcript},
    Toolbox,
};
use tracing::{debug, info};

use crate::{
    error::Result,
    scheduler::{priority, JobScheduler, SchedulerBase},
    stages::Stages,
    types::{Request, Workflow},
};

/// Schedules the patch pipeline. Videos without `transcript.csv` are
/// skipped; everything upstream of it belongs to the transcription workflow.
pub struct PatchScheduler {
    base: SchedulerBase,
    toolbox: Toolbox,
    settings: PatchConfig,
}

impl PatchScheduler {
    pub fn new(base: SchedulerBase, toolbox: Toolbox, settings: PatchConfig) -> Self {
        Self {
            base,
            toolbox,
            settings,
        }
    }
}

impl JobScheduler for PatchScheduler {
    fn base(&self) -> &SchedulerBase {
        &self.base
    }

    fn workflow(&self) -> Workflow {
        Workflow::Patch
    }

    fn schedule(&self, request: &Request) -> Result<Vec<Job>> {
        let stages = Stages::new(&self.toolbox, self.base.paths(), request.video_id);
        let audio = stages.data("audio.mp3");
        let transcript = stages.data("transcript.csv");
        let patch = stages.data("patch.csv");
        let transcript_patch = stages.data("transcript_patch.csv");
        let merged = stages.data("transcript_merged.csv");

        if !transcript.exists() {
            debug!(video_id = %request.video_id, "no transcript yet; nothing to patch");
            return Ok(Vec::new());
        }

        let mut jobs = vec![define_patch_job(
            &stages,
            transcript.clone(),
            patch.clone(),
            self.settings.loop_duration_sec,
        )];

        if patch.exists() {
            let entries = read_patches(&patch)?;
            check_disjoint(&entries)?;
            debug!(video_id = %request.video_id, count = entries.len(), "patch entries found");

            let (clip_jobs, results) = stages.clip_jobs(&audio, &entries);
            jobs.extend(clip_jobs);
            jobs.push(stages.merge_clips(
                "merge_patch",
                patch.clone(),
                read_patches,
                &results,
                transcript_patch.clone(),
            ));
            jobs.push(apply_patch_job(&stages, transcript, patch, transcript_patch, merged));
        }

        self.base.finalize(jobs)
    }
}

fn define_patch_job(stages: &Stages<'_>, transcript: PathBuf, out: PathBuf, min_duration_sec: u32) -> Job {
    let context = Context::new(priority::DEFINE_PATCH)
        .with_input(&transcript)
        .with_output(&out);
    stages.function("define_patch", context, move || {
        let rows = read_transcript(&transcript)
            .with_context(|| format!("reading {}", transcript.display()))?;
        let entries = detect_loops(&rows, min_duration_sec);
        write_patches(&out, &entries)?;
        info!(rows = rows.len(), loops = entries.len(), "patch defined");
        Ok(())
    })
}

fn apply_patch_job(
    stages: &Stages<'_>,
    transcript: PathBuf,
    patch: PathBuf,
    transcript_patch: PathBuf,
    out: PathBuf,
) -> Job {
    let context = Context::new(priority::APPLY_PATCH)
        .with_inputs([&transcript, &patch, &transcript_patch])
        .with_output(&out);
    stages.function("apply_patch", context, move || {
        let original = read_transcript(&transcript)
            .with_context(|| format!("reading {}", transcript.display()))?;
        let entries = read_patches(&patch).with_context(|| format!("reading {}", patch.display()))?;
        let corrected = read_transcript(&transcript_patch)
            .with_context(|| format!("reading {}", transcript_patch.display()))?;
        let before = original.len();
        let rows = apply_patch(original, &entries, corrected)?;
        write_transcript(&out, &rows)?;
        info!(entries = entries.len(), before, after = rows.len(), "patch applied");
        Ok(())
    })
}
