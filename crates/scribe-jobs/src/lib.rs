//! `scribe-jobs` — schedulable units of work with declared artifacts.
//!
//! A [`Job`] pairs a [`Context`] (inputs, outputs, priority) with an action:
//!
//! | Action     | Runs                                   | Fails when                      |
//! |------------|----------------------------------------|---------------------------------|
//! | `Process`  | an external program, output to a log   | non-zero exit or spawn failure  |
//! | `Function` | a closure on a blocking thread         | it returns `Err` or panics      |
//!
//! Both variants share one scheduling contract: a job whose outputs all exist
//! is satisfied and skipped unless forced, and a job whose inputs are missing
//! refuses to start.

pub mod cache;
pub mod context;
pub mod error;
pub mod job;
mod process;
pub mod types;

pub use cache::{ArtifactCache, PresenceCache};
pub use context::Context;
pub use error::{JobError, Result};
pub use job::{Job, JobAction, JobFn};
pub use types::{JobStatus, RunOptions};
