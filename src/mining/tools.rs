use std::path::Path;
use std::process::{Output, Stdio};

use tokio::process::Command;

use crate::error::{MinerError, Result};

/// Runs an external tool to completion and captures its output.
///
/// There is no timeout: a hung tool blocks the pipeline.
pub async fn run_tool(program: &str, args: &[&str], cwd: Option<&Path>) -> Result<Output> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    command.output().await.map_err(|e| MinerError::Tool {
        tool: program.to_string(),
        message: format!("could not run '{program} {}': {e}", args.join(" ")),
    })
}

/// Turns a non-zero exit status into a tool error carrying stderr.
pub fn check_output(output: &Output, tool: &str) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(MinerError::Tool {
        tool: tool.to_string(),
        message: format!("exited with {}: {}", output.status, stderr.trim()),
    })
}
