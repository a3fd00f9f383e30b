//! Run one external tool to completion. No timeout is applied.

use std::fs::File;
use std::path::Path;
use std::process::Stdio;

use scribe_core::ToolCommand;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

use crate::error::{JobError, Result};

/// Lines of stderr kept in the error when no log file captures them.
const STDERR_TAIL_LINES: usize = 20;

pub(crate) async fn run_process(command: &ToolCommand, log_path: Option<&Path>) -> Result<()> {
    debug!(command = %command, log = ?log_path, "spawning process");

    let mut cmd = AsyncCommand::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let spawn_err = |source| JobError::Spawn {
        program: command.program.clone(),
        source,
    };

    let (status, detail) = match log_path {
        Some(path) => {
            let log = File::create(path)?;
            cmd.stdout(Stdio::from(log.try_clone()?))
                .stderr(Stdio::from(log));
            let status = cmd.status().await.map_err(spawn_err)?;
            (status, format!(" (see {})", path.display()))
        }
        None => {
            cmd.stdout(Stdio::null()).stderr(Stdio::piped());
            let output = cmd.output().await.map_err(spawn_err)?;
            let tail = stderr_tail(&output.stderr, STDERR_TAIL_LINES);
            let detail = if tail.is_empty() {
                String::new()
            } else {
                format!(":\n{tail}")
            };
            (output.status, detail)
        }
    };

    if status.success() {
        Ok(())
    } else {
        Err(JobError::ExternalTool {
            program: command.program.clone(),
            status: status.to_string(),
            detail,
        })
    }
}

/// The last `max_lines` lines of a process's stderr, lossily decoded.
fn stderr_tail(stderr: &[u8], max_lines: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let from = lines.len().saturating_sub(max_lines);
    lines[from..].join("\n")
}
