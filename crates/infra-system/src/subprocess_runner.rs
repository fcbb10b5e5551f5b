// Subprocess runner
// reason: tokio::process for non-blocking spawns, nix for process-group signals
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

use vmdoctor_core::port::{CommandOutput, CommandRequest, CommandRunner, Deadline, ProbeError};

/// Time a terminated probe gets between SIGTERM and SIGKILL
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_millis(500);

/// Spawns each probe in its own process group so that terminating it also
/// reaches grandchildren (`vagrant ssh` forks `ssh`).
pub struct SubprocessRunner {
    kill_grace: Duration,
}

impl SubprocessRunner {
    pub fn new() -> Self {
        Self {
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    fn command(request: &CommandRequest) -> Command {
        let mut command = Command::new(&request.program);
        command
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        command.process_group(0);

        // Unix children are terminated through their group by ProcessGroupGuard
        #[cfg(not(unix))]
        command.kill_on_drop(true);

        command
    }
}

impl Default for SubprocessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for SubprocessRunner {
    async fn run(
        &self,
        request: &CommandRequest,
        deadline: &Deadline,
    ) -> Result<CommandOutput, ProbeError> {
        let started = Instant::now();

        let child = Self::command(request).spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => ProbeError::Unavailable(request.program.clone()),
            _ => ProbeError::Io(format!("failed to spawn {}: {}", request.program, e)),
        })?;

        let pid = child.id();
        let wait = child.wait_with_output();
        let mut guard = ProcessGroupGuard::new(pid, self.kill_grace);

        let output = tokio::select! {
            result = wait => result.map_err(|e| ProbeError::Io(e.to_string()))?,
            _ = tokio::time::sleep(deadline.timeout) => {
                warn!(command = %request, timeout_ms = deadline.timeout_ms(), "Probe timed out, terminating");
                return Err(ProbeError::Timeout(deadline.timeout_ms()));
            }
            _ = deadline.token.cancelled() => {
                debug!(command = %request, "Probe cancelled, terminating");
                return Err(ProbeError::Cancelled);
            }
        };
        guard.disarm();

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration: started.elapsed(),
        })
    }
}

/// Terminates a probe's process group unless disarmed
///
/// SIGTERM on drop, then SIGKILL once the grace period has passed.
struct ProcessGroupGuard {
    pid: Option<u32>,
    grace: Duration,
}

impl ProcessGroupGuard {
    fn new(pid: Option<u32>, grace: Duration) -> Self {
        Self { pid, grace }
    }

    fn disarm(&mut self) {
        self.pid = None;
    }
}

#[cfg(unix)]
impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let Some(pid) = self.pid.take() else {
            return;
        };
        let group = Pid::from_raw(pid as i32);

        if killpg(group, Signal::SIGTERM).is_err() {
            // Already gone
            return;
        }
        debug!(pgid = pid, "Sent SIGTERM to probe process group");

        let grace = self.grace;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(grace).await;
                    if killpg(group, Signal::SIGKILL).is_ok() {
                        warn!(pgid = pid, "Probe process group ignored SIGTERM, sent SIGKILL");
                    }
                });
            }
            Err(_) => {
                let _ = killpg(group, Signal::SIGKILL);
            }
        }
    }
}

#[cfg(not(unix))]
impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {}
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use vmdoctor_core::port::CancelToken;

    fn deadline(ms: u64) -> Deadline {
        Deadline::new(Duration::from_millis(ms), CancelToken::never())
    }

    #[tokio::test]
    async fn test_run_captures_output() {
        let runner = SubprocessRunner::new();
        let request = CommandRequest::new("echo", ["hello"]);

        let output = runner.run(&request, &deadline(5_000)).await.unwrap();

        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let runner = SubprocessRunner::new();
        let request = CommandRequest::new("vmdoctor-no-such-binary", ["--version"]);

        let result = runner.run(&request, &deadline(5_000)).await;

        assert_eq!(
            result,
            Err(ProbeError::Unavailable("vmdoctor-no-such-binary".to_string()))
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_output_not_error() {
        let runner = SubprocessRunner::new();
        let request = CommandRequest::new("sh", ["-c", "echo oops >&2; exit 3"]);

        let output = runner.run(&request, &deadline(5_000)).await.unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_timeout_terminates_child() {
        let runner = SubprocessRunner::new().with_kill_grace(Duration::from_millis(50));
        let request = CommandRequest::new("sleep", ["10"]);

        let started = Instant::now();
        let result = runner.run(&request, &deadline(100)).await;

        assert_eq!(result, Err(ProbeError::Timeout(100)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancel_stops_child() {
        let (tx, token) = vmdoctor_core::port::cancel_channel();
        let runner = SubprocessRunner::new();
        let request = CommandRequest::new("sleep", ["10"]);
        let deadline = Deadline::new(Duration::from_secs(30), token);

        tx.cancel();
        let result = runner.run(&request, &deadline).await;

        assert_eq!(result, Err(ProbeError::Cancelled));
    }

    /// `sh` that records its own pid and a backgrounded grandchild's, then waits
    #[cfg(target_os = "linux")]
    fn family_script(pid_file: &std::path::Path, prelude: &str) -> CommandRequest {
        let file = pid_file.display();
        let script = format!("{prelude}echo $$ > '{file}'; sleep 30 & echo $! >> '{file}'; wait");
        CommandRequest::new("sh", ["-c".to_string(), script])
    }

    #[cfg(target_os = "linux")]
    fn recorded_pids(pid_file: &std::path::Path) -> Vec<u32> {
        std::fs::read_to_string(pid_file)
            .unwrap()
            .lines()
            .map(|line| line.trim().parse().unwrap())
            .collect()
    }

    /// Running or sleeping; gone and zombie processes are not alive
    #[cfg(target_os = "linux")]
    fn alive(pid: u32) -> bool {
        let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) else {
            return false;
        };
        // The state field follows the parenthesized command name
        let state = stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next());
        !matches!(state, None | Some("Z") | Some("X"))
    }

    #[cfg(target_os = "linux")]
    fn assert_family_dead(pid_file: &std::path::Path) {
        let pids = recorded_pids(pid_file);
        assert_eq!(pids.len(), 2, "expected shell and grandchild pids, got {:?}", pids);
        for pid in pids {
            assert!(!alive(pid), "pid {} outlived the run", pid);
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timeout_kills_whole_process_group() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pids");
        let runner = SubprocessRunner::new().with_kill_grace(Duration::from_millis(100));

        let result = runner.run(&family_script(&pid_file, ""), &deadline(300)).await;

        assert_eq!(result, Err(ProbeError::Timeout(300)));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_family_dead(&pid_file);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_cancel_kills_whole_process_group() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pids");
        let (tx, token) = vmdoctor_core::port::cancel_channel();
        let runner = SubprocessRunner::new().with_kill_grace(Duration::from_millis(100));
        let request = family_script(&pid_file, "");
        let deadline = Deadline::new(Duration::from_secs(30), token);

        let cancel = async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            tx.cancel();
        };
        let (result, _) = tokio::join!(runner.run(&request, &deadline), cancel);

        assert_eq!(result, Err(ProbeError::Cancelled));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_family_dead(&pid_file);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_sigterm_ignoring_group_is_killed_after_grace() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pids");
        let runner = SubprocessRunner::new().with_kill_grace(Duration::from_millis(200));

        // Ignored dispositions survive exec, so the grandchild ignores SIGTERM too
        let result = runner.run(&family_script(&pid_file, "trap '' TERM; "), &deadline(300)).await;

        assert_eq!(result, Err(ProbeError::Timeout(300)));
        let pids = recorded_pids(&pid_file);
        assert!(pids.iter().any(|&pid| alive(pid)), "SIGTERM alone should not stop the group");

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_family_dead(&pid_file);
    }
}
