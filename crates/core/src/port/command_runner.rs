// Command Runner Port
// Abstraction for spawning one external probe process under a deadline

use crate::port::deadline::Deadline;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// One process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Raw result of a completed process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// None when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout followed by stderr, for attaching to result details
    pub fn combined(&self) -> String {
        let mut text = self.stdout.trim_end().to_string();
        let stderr = self.stderr.trim_end();
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr);
        }
        text
    }
}

/// Probe errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("{0} is not installed or not on PATH")]
    Unavailable(String),

    #[error("Probe timed out after {0}ms")]
    Timeout(u64),

    #[error("Probe cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(String),
}

/// Command Runner trait
///
/// Implementations:
/// - SubprocessRunner: spawns a real child process (infra-system)
/// - mocks::ScriptedRunner: canned responses for tests
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion
    ///
    /// # Errors
    /// - ProbeError::Unavailable if the binary cannot be spawned
    /// - ProbeError::Timeout if the deadline elapses (the child is terminated)
    /// - ProbeError::Cancelled if the run's cancel token fires (the child is terminated)
    async fn run(
        &self,
        request: &CommandRequest,
        deadline: &Deadline,
    ) -> Result<CommandOutput, ProbeError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Canned reply for matching requests
    #[derive(Debug, Clone)]
    pub struct ScriptedReply {
        program: String,
        args_prefix: Vec<String>,
        latency: Duration,
        outcome: Result<CommandOutput, ProbeError>,
    }

    /// Mock Command Runner with per-command replies and a call log
    #[derive(Clone, Default)]
    pub struct ScriptedRunner {
        replies: Arc<Mutex<Vec<ScriptedReply>>>,
        calls: Arc<Mutex<Vec<CommandRequest>>>,
    }

    impl ScriptedRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Reply with exit code and stdout when `program` runs with args starting with `args_prefix`
        pub fn on(self, program: &str, args_prefix: &[&str], exit_code: i32, stdout: &str) -> Self {
            self.on_after(program, args_prefix, Duration::ZERO, exit_code, stdout)
        }

        /// Same as `on`, but the reply arrives after `latency`
        pub fn on_after(
            self,
            program: &str,
            args_prefix: &[&str],
            latency: Duration,
            exit_code: i32,
            stdout: &str,
        ) -> Self {
            let output = CommandOutput {
                exit_code: Some(exit_code),
                stdout: stdout.to_string(),
                stderr: String::new(),
                duration: latency,
            };
            self.push(program, args_prefix, latency, Ok(output))
        }

        /// Fail matching requests with `error`
        pub fn on_error(self, program: &str, args_prefix: &[&str], error: ProbeError) -> Self {
            self.push(program, args_prefix, Duration::ZERO, Err(error))
        }

        fn push(
            self,
            program: &str,
            args_prefix: &[&str],
            latency: Duration,
            outcome: Result<CommandOutput, ProbeError>,
        ) -> Self {
            self.replies.lock().unwrap().push(ScriptedReply {
                program: program.to_string(),
                args_prefix: args_prefix.iter().map(|s| s.to_string()).collect(),
                latency,
                outcome,
            });
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        /// Number of calls to `program` whose first argument is `first_arg`
        pub fn calls_to(&self, program: &str, first_arg: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.program == program && c.args.first().map(String::as_str) == Some(first_arg))
                .count()
        }

        pub fn calls(&self) -> Vec<CommandRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(
            &self,
            request: &CommandRequest,
            _deadline: &Deadline,
        ) -> Result<CommandOutput, ProbeError> {
            self.calls.lock().unwrap().push(request.clone());

            // Last registration wins so tests can override defaults
            let reply = self
                .replies
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|r| r.program == request.program && request.args.starts_with(&r.args_prefix))
                .cloned();

            match reply {
                Some(reply) => {
                    if !reply.latency.is_zero() {
                        tokio::time::sleep(reply.latency).await;
                    }
                    reply.outcome
                }
                None => Err(ProbeError::Unavailable(request.program.clone())),
            }
        }
    }
}
