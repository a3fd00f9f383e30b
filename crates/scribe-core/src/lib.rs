//! `scribe-core` — configuration, shared types and path layout used by every
//! other scribe crate.

pub mod command;
pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use command::ToolCommand;
pub use config::ScribeConfig;
pub use error::{Result, ScribeError};
pub use paths::PathHelper;
pub use types::VideoRecord;
