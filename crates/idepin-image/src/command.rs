//! External command execution.

use std::path::Path;
use std::process::Stdio;

use idepin_state::{SourceError, SourceResult};
use tokio::process::Command;
use tracing::debug;

/// Split a command line on whitespace into program and arguments.
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

/// Run `argv` to completion and return its stdout.
///
/// A non-zero exit is an error carrying the trimmed stderr.
pub async fn run_capture(argv: &[String]) -> SourceResult<String> {
    let (exe, args) = argv
        .split_first()
        .ok_or_else(|| SourceError::CommandFailed("empty command".to_string()))?;

    debug!("Running {}", argv.join(" "));
    let output = Command::new(exe)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| SourceError::CommandFailed(format!("failed to run {exe}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SourceError::CommandFailed(format!(
            "{} exited with {}: {}",
            argv.join(" "),
            output.status.code().unwrap_or(-1),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Check whether `program` resolves to a file, directly or through `PATH`.
pub fn is_command_available(program: &str) -> bool {
    if program.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(program).is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}
