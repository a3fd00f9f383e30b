//! Stable topological ordering of jobs by shared artifact paths.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use scribe_jobs::Job;

use crate::error::{Result, SchedulerError};

/// Order `jobs` so every producer precedes its consumers.
///
/// Job A produces for job B when some output of A is an input of B. Among
/// jobs with no such relation the incoming order is kept (Kahn's algorithm,
/// always emitting the earliest ready job). A job that consumes its own
/// output, directly or through others, is a [`SchedulerError::DependencyCycle`].
pub fn sort_jobs(jobs: Vec<Job>) -> Result<Vec<Job>> {
    let order = topo_order(&jobs)?;
    Ok(permute(jobs, &order))
}

/// Indices of `jobs` in dependency order.
pub fn topo_order(jobs: &[Job]) -> Result<Vec<usize>> {
    let n = jobs.len();

    let mut producers: HashMap<&Path, Vec<usize>> = HashMap::new();
    for (i, job) in jobs.iter().enumerate() {
        for out in job.context().outputs() {
            producers.entry(out.as_path()).or_default().push(i);
        }
    }

    // dependents[i] = jobs consuming something i produces (forward edges)
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut in_degree: Vec<usize> = vec![0; n];
    for (j, job) in jobs.iter().enumerate() {
        for input in job.context().inputs() {
            if let Some(from) = producers.get(input.as_path()) {
                for &i in from {
                    dependents[i].push(j);
                    in_degree[j] += 1;
                }
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &j in &dependents[i] {
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                ready.insert(j);
            }
        }
    }

    if order.len() < n {
        let jobs = (0..n)
            .filter(|&i| in_degree[i] > 0)
            .map(|i| jobs[i].id())
            .collect();
        return Err(SchedulerError::DependencyCycle { jobs });
    }
    Ok(order)
}

/// Rearrange `jobs` into `order` (a permutation of its indices).
pub fn permute(jobs: Vec<Job>, order: &[usize]) -> Vec<Job> {
    let mut slots: Vec<Option<Job>> = jobs.into_iter().map(Some).collect();
    order.iter().filter_map(|&i| slots[i].take()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_jobs::Context;

    fn job(name: &str, inputs: &[&str], outputs: &[&str]) -> Job {
        let mut ctx = Context::new(0).with_inputs(inputs);
        for out in outputs {
            ctx = ctx.with_output(out);
        }
        Job::function(name, ctx, || Ok(()))
    }

    fn names(jobs: &[Job]) -> Vec<&str> {
        jobs.iter().map(|j| j.name()).collect()
    }

    #[test]
    fn producers_move_ahead_of_consumers() {
        let jobs = vec![
            job("whisper_s1", &["s1.wav"], &["s1.wav.csv"]),
            job("merge", &["segment.csv", "s1.wav.csv"], &["transcript.csv"]),
            job("split_s1", &["audio.mp3"], &["s1.wav"]),
        ];
        let sorted = sort_jobs(jobs).unwrap();
        assert_eq!(names(&sorted), vec!["split_s1", "whisper_s1", "merge"]);
    }

    #[test]
    fn unrelated_jobs_keep_their_order() {
        let jobs = vec![
            job("c", &[], &["c"]),
            job("a", &[], &["a"]),
            job("b", &["x"], &["b"]),
        ];
        assert_eq!(names(&sort_jobs(jobs).unwrap()), vec!["c", "a", "b"]);
    }

    #[test]
    fn interleaves_per_segment_pairs() {
        let jobs = vec![
            job("whisper_s1", &["s1.wav"], &["s1.wav.csv"]),
            job("whisper_s2", &["s2.wav"], &["s2.wav.csv"]),
            job("split_s1", &["audio.mp3"], &["s1.wav"]),
            job("split_s2", &["audio.mp3"], &["s2.wav"]),
        ];
        assert_eq!(
            names(&sort_jobs(jobs).unwrap()),
            vec!["split_s1", "whisper_s1", "split_s2", "whisper_s2"]
        );
    }

    #[test]
    fn cycles_fail_fast() {
        let jobs = vec![
            job("a", &["b.out"], &["a.out"]),
            job("b", &["a.out"], &["b.out"]),
            job("free", &[], &["free.out"]),
        ];
        match sort_jobs(jobs) {
            Err(SchedulerError::DependencyCycle { jobs }) => assert_eq!(jobs, vec!["a", "b"]),
            other => panic!("expected cycle, got {:?}", other.map(|j| j.len())),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let jobs = vec![job("loop", &["x"], &["x"])];
        assert!(matches!(sort_jobs(jobs), Err(SchedulerError::DependencyCycle { .. })));
    }
}
