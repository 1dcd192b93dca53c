//! Synchronous external command execution.
use std::{ffi::OsStr, path::Path, process::Command};

use tracing::debug;

use crate::error::CommandError;

/// Output of a command that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code of the child.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Runs `argv` to completion, optionally inside `cwd`.
///
/// Blocks until the child exits; there is no timeout. Output is captured, not
/// streamed. A non-zero exit (or death by signal) becomes
/// [`CommandError::CommandFailed`] carrying the child's stderr; failure to spawn
/// becomes [`CommandError::LaunchFailed`].
pub fn run<S: AsRef<OsStr>>(
    argv: &[S],
    cwd: Option<&Path>,
) -> Result<ExecutionResult, CommandError> {
    let command_line = argv
        .iter()
        .map(|arg| arg.as_ref().to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");

    let Some((program, args)) = argv.split_first() else {
        return Err(CommandError::LaunchFailed {
            program: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        });
    };

    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    debug!("Running `{}` in {:?}", command_line, cwd);

    let output = cmd.output().map_err(|source| CommandError::LaunchFailed {
        program: program.as_ref().to_string_lossy().into_owned(),
        source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    for line in stdout.lines() {
        debug!("[{command_line}] {line}");
    }
    for line in stderr.lines() {
        debug!("[{command_line} stderr] {line}");
    }

    match output.status.code() {
        Some(0) => Ok(ExecutionResult {
            exit_code: 0,
            stdout,
            stderr,
        }),
        code => Err(CommandError::CommandFailed {
            command: command_line,
            code,
            stderr: stderr.trim().to_string(),
        }),
    }
}
