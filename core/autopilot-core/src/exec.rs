//! Bounded external command execution.
//!
//! Every external command the controller awaits runs through here with an
//! explicit timeout, after which the child is killed and the run reported as
//! failed rather than blocking the hook indefinitely. Spawn failures are
//! folded into the same result shape - callers never see a process fault
//! from a command that could not run.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Timeout for quality-gate and trigger commands (tests, build, lint).
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for git operations.
pub const GIT_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Outcome of one awaited command.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub success: bool,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutcome {
    fn spawn_failed(error: &std::io::Error) -> Self {
        ExecOutcome {
            success: false,
            timed_out: false,
            stdout: String::new(),
            stderr: format!("failed to spawn: {}", error),
        }
    }

    /// Stdout and stderr joined, for failure parsing.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Runs a configured command string under `sh -c` in `cwd`.
///
/// Used for user-configured check/fix/test/build commands, which are full
/// shell command lines by contract.
pub fn run_shell(command: &str, cwd: &Path, timeout: Duration) -> ExecOutcome {
    tracing::debug!(command, cwd = %cwd.display(), "Running shell command");
    let child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();

    match child {
        Ok(child) => await_child(child, command, timeout),
        Err(e) => {
            tracing::warn!(command, error = %e, "Failed to spawn shell command");
            ExecOutcome::spawn_failed(&e)
        }
    }
}

/// Runs `program` with an argument array in `cwd`.
///
/// No shell is involved, so arguments are never interpreted - this is the
/// only way git is invoked.
pub fn run_argv(program: &str, args: &[&str], cwd: &Path, timeout: Duration) -> ExecOutcome {
    let cmdline = format!("{} {}", program, args.join(" "));
    tracing::debug!(command = %cmdline, cwd = %cwd.display(), "Running command");
    let child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();

    match child {
        Ok(child) => await_child(child, &cmdline, timeout),
        Err(e) => {
            tracing::warn!(command = %cmdline, error = %e, "Failed to spawn command");
            ExecOutcome::spawn_failed(&e)
        }
    }
}

/// Waits for the child with a deadline, killing it on timeout.
///
/// Stdout and stderr are drained on reader threads; a child that fills a
/// pipe while we poll would otherwise deadlock.
fn await_child(mut child: Child, command: &str, timeout: Duration) -> ExecOutcome {
    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let deadline = Instant::now() + timeout;
    let mut timed_out = false;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if Instant::now() >= deadline {
                    timed_out = true;
                    let _ = child.kill();
                    break child.wait().ok();
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                tracing::warn!(command, error = %e, "Failed to wait for command");
                let _ = child.kill();
                break None;
            }
        }
    };

    if timed_out {
        tracing::warn!(command, timeout_secs = timeout.as_secs(), "Command timed out");
        // Grandchildren may keep the pipes open well past the kill; the
        // reader threads are left to drain on their own rather than making
        // the controller wait out someone else's lifetime.
        return ExecOutcome {
            success: false,
            timed_out: true,
            stdout: String::new(),
            stderr: String::new(),
        };
    }

    let stdout = join_reader(stdout_reader);
    let stderr = join_reader(stderr_reader);
    let success = status.map(|s| s.success()).unwrap_or(false);
    if !success {
        tracing::debug!(command, "Command failed");
    }

    ExecOutcome {
        success,
        timed_out,
        stdout,
        stderr,
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut source: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = source.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_reader(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_successful_command_captures_stdout() {
        let temp = tempdir().unwrap();
        let outcome = run_shell("echo hello", temp.path(), COMMAND_TIMEOUT);
        assert!(outcome.success);
        assert!(!outcome.timed_out);
        assert_eq!(outcome.stdout.trim(), "hello");
    }

    #[test]
    fn test_failing_command_reports_failure() {
        let temp = tempdir().unwrap();
        let outcome = run_shell("exit 3", temp.path(), COMMAND_TIMEOUT);
        assert!(!outcome.success);
        assert!(!outcome.timed_out);
    }

    #[test]
    fn test_timeout_kills_and_reports() {
        let temp = tempdir().unwrap();
        let outcome = run_shell("sleep 5", temp.path(), Duration::from_millis(100));
        assert!(!outcome.success);
        assert!(outcome.timed_out);
    }

    #[test]
    fn test_missing_program_is_a_failure_not_a_fault() {
        let temp = tempdir().unwrap();
        let outcome = run_argv(
            "definitely-not-a-real-binary",
            &["--version"],
            temp.path(),
            GIT_TIMEOUT,
        );
        assert!(!outcome.success);
        assert!(outcome.stderr.contains("failed to spawn"));
    }

    #[test]
    fn test_combined_output_joins_both_streams() {
        let temp = tempdir().unwrap();
        let outcome = run_shell("echo out; echo err >&2", temp.path(), COMMAND_TIMEOUT);
        let combined = outcome.combined_output();
        assert!(combined.contains("out"));
        assert!(combined.contains("err"));
    }

    #[test]
    fn test_runs_in_requested_directory() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("marker"), "x").unwrap();
        let outcome = run_shell("ls", temp.path(), COMMAND_TIMEOUT);
        assert!(outcome.stdout.contains("marker"));
    }
}
