use crate::registry::Registry;
use std::io::{BufReader, Read};
use std::process::{Command, Stdio};
use std::thread;

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("command `{command_id}` is not in the registry")]
    NotAllowed { command_id: String },
    #[error("command `{command_id}` failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        command_id: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("io error spawning `{command_id}`: {source}")]
    Io {
        command_id: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result of one completed child process. Ephemeral; nothing persists it.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub command_id: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs registry-listed commands and nothing else.
///
/// The argv was tokenized once at registry load; it is executed directly with
/// no shell interpreter in between, so nothing in the command string or in
/// user utterance text can be reinterpreted as shell syntax. The child runs to
/// completion synchronously with no deadline of its own; callers needing
/// bounded latency must wrap `execute` in one.
#[derive(Debug)]
pub struct CommandExecutor {
    registry: Registry,
}

impl CommandExecutor {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn execute(&self, command_id: &str) -> Result<ExecutionOutcome, ExecutorError> {
        // The membership check lives here, not in callers: no process may be
        // spawned for an identifier the registry never admitted.
        let entry = self
            .registry
            .get(command_id)
            .ok_or_else(|| ExecutorError::NotAllowed {
                command_id: command_id.to_string(),
            })?;

        let (program, args) = entry
            .argv
            .split_first()
            .ok_or_else(|| ExecutorError::NotAllowed {
                command_id: command_id.to_string(),
            })?;

        let mut command = Command::new(program);
        command.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExecutorError::ExecutionFailed {
                    command_id: command_id.to_string(),
                    exit_code: None,
                    stderr: format!("executable not found: {program}"),
                })
            }
            Err(source) => {
                return Err(ExecutorError::Io {
                    command_id: command_id.to_string(),
                    source,
                })
            }
        };

        let stdout = child.stdout.take().ok_or_else(|| ExecutorError::Io {
            command_id: command_id.to_string(),
            source: std::io::Error::other("missing stdout pipe"),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| ExecutorError::Io {
            command_id: command_id.to_string(),
            source: std::io::Error::other("missing stderr pipe"),
        })?;

        let stdout_reader = thread::spawn(move || {
            let mut buf = String::new();
            let mut reader = BufReader::new(stdout);
            let _ = reader.read_to_string(&mut buf);
            buf
        });
        let stderr_reader = thread::spawn(move || {
            let mut buf = String::new();
            let mut reader = BufReader::new(stderr);
            let _ = reader.read_to_string(&mut buf);
            buf
        });

        let status = child.wait().map_err(|source| ExecutorError::Io {
            command_id: command_id.to_string(),
            source,
        })?;
        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();

        if !status.success() {
            return Err(ExecutorError::ExecutionFailed {
                command_id: command_id.to_string(),
                exit_code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(ExecutionOutcome {
            command_id: command_id.to_string(),
            exit_code: status.code().unwrap_or(0),
            stdout,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::parse_source;

    #[test]
    fn unknown_identifier_fails_before_any_spawn() {
        let registry = parse_source("SAY = echo hi").expect("registry");
        let executor = CommandExecutor::new(registry);
        let err = executor.execute("NOT_THERE").expect_err("not allowed");
        match err {
            ExecutorError::NotAllowed { command_id } => assert_eq!(command_id, "NOT_THERE"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn successful_command_captures_stdout() {
        let registry = parse_source("SAY = echo hello").expect("registry");
        let executor = CommandExecutor::new(registry);
        let outcome = executor.execute("SAY").expect("outcome");
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout.trim(), "hello");
    }

    #[test]
    fn missing_executable_reports_not_found() {
        let registry =
            parse_source("GHOST = definitely-not-a-real-binary-7b3f").expect("registry");
        let executor = CommandExecutor::new(registry);
        let err = executor.execute("GHOST").expect_err("missing binary");
        match err {
            ExecutorError::ExecutionFailed {
                exit_code, stderr, ..
            } => {
                assert_eq!(exit_code, None);
                assert!(stderr.contains("executable not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_zero_exit_reports_failure() {
        let registry = parse_source("FAIL = false").expect("registry");
        let executor = CommandExecutor::new(registry);
        let err = executor.execute("FAIL").expect_err("failure");
        match err {
            ExecutorError::ExecutionFailed { exit_code, .. } => {
                assert_eq!(exit_code, Some(1));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
