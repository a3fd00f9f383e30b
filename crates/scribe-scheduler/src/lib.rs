//! `scribe-scheduler` — turns video requests into an ordered, idempotent
//! job list and drives it one job at a time.
//!
//! # Overview
//!
//! Every poll the [`engine::Engine`] reads the catalog, asks a
//! [`scheduler::JobScheduler`] for a batch, runs only the head job and records
//! its outcome. Nothing is remembered between polls: jobs whose outputs exist
//! are filtered out, so the batch shrinks as work completes.
//!
//! # Workflows
//!
//! | Workflow     | Produces                    | Fan-out source  |
//! |--------------|-----------------------------|-----------------|
//! | `transcribe` | `data/transcript.csv`       | `segment.csv`   |
//! | `patch`      | `data/transcript_merged.csv`| `patch.csv`     |

pub mod catalog;
pub mod db;
pub mod engine;
pub mod error;
pub mod filter;
pub mod patch;
pub mod record;
pub mod scheduler;
pub mod sort;
mod stages;
pub mod transcribe;
pub mod types;

pub use catalog::{Catalog, SqliteCatalog};
pub use engine::{Engine, EngineState};
pub use error::{Result, SchedulerError};
pub use filter::DependencyFilter;
pub use patch::PatchScheduler;
pub use record::{ExecutionRecord, RecordSink, SqliteRecordSink};
pub use scheduler::{JobScheduler, SchedulerBase};
pub use transcribe::TranscriptionScheduler;
pub use types::{Request, Workflow};
