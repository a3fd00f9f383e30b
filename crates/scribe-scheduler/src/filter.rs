use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use scribe_jobs::{ArtifactCache, Job};
use tracing::debug;

/// Drops jobs whose work is already done.
///
/// A job is removed iff execution is not forced and the cache reports it
/// satisfied. Jobs with no outputs are never satisfied and always survive.
#[derive(Clone)]
pub struct DependencyFilter {
    cache: Arc<dyn ArtifactCache>,
    force_execute: bool,
}

impl DependencyFilter {
    pub fn new(cache: Arc<dyn ArtifactCache>, force_execute: bool) -> Self {
        Self {
            cache,
            force_execute,
        }
    }

    pub fn cache(&self) -> &dyn ArtifactCache {
        self.cache.as_ref()
    }

    pub fn force_execute(&self) -> bool {
        self.force_execute
    }

    pub fn apply(&self, jobs: Vec<Job>) -> Vec<Job> {
        if self.force_execute {
            return jobs;
        }
        jobs.into_iter()
            .filter(|job| {
                let done = self.cache.is_satisfied(job.context());
                if done {
                    debug!(job = %job.id(), "satisfied; filtered out");
                }
                !done
            })
            .collect()
    }
}

/// Drop jobs that cannot start this pass: some input is missing from disk
/// and no remaining job produces it. Repeats until stable, since dropping a
/// producer can block its consumers.
pub fn prune_blocked(mut jobs: Vec<Job>) -> Vec<Job> {
    loop {
        let produced: HashSet<&Path> = jobs
            .iter()
            .flat_map(|j| j.context().outputs().iter().map(|p| p.as_path()))
            .collect();
        let blocked: Vec<usize> = jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| {
                job.context()
                    .inputs()
                    .iter()
                    .any(|input| !input.exists() && !produced.contains(input.as_path()))
            })
            .map(|(i, _)| i)
            .collect();
        if blocked.is_empty() {
            return jobs;
        }
        for i in blocked.into_iter().rev() {
            let job = jobs.remove(i);
            debug!(job = %job.id(), "inputs unavailable this pass; deferred");
        }
    }
}
