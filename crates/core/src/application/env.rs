//! Check environment - the ports and settings every check runs against
//!
//! All probes go through [`CheckEnv::probe`], which applies the deadline and the
//! run's cancel token the same way for every caller.

use crate::application::constants::*;
use crate::domain::{CheckContext, Platform, ProjectConfig};
use crate::port::{
    CancelToken, CommandOutput, CommandRequest, CommandRunner, ConfigError, ConfigLoader,
    Deadline, HostProbe, ProbeError, VersionError, VersionSource,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Runtime settings for one diagnostic run
#[derive(Debug, Clone)]
pub struct DoctorSettings {
    /// VM tool binary name or path
    pub tool: String,
    /// Project config file; relative paths resolve against the target path
    pub config_file: PathBuf,
    pub probe_timeout: Duration,
    pub detect_timeout: Duration,
    pub remote_timeout: Duration,
    pub upstream_timeout: Duration,
    pub platform: Platform,
}

impl Default for DoctorSettings {
    fn default() -> Self {
        Self {
            tool: DEFAULT_TOOL.to_string(),
            config_file: PathBuf::from(crate::domain::config::DEFAULT_CONFIG_FILE),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            detect_timeout: DEFAULT_DETECT_TIMEOUT,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            platform: Platform::current(),
        }
    }
}

/// Ports bundle handed to every check
pub struct CheckEnv {
    runner: Arc<dyn CommandRunner>,
    host: Arc<dyn HostProbe>,
    versions: Arc<dyn VersionSource>,
    config_loader: Arc<dyn ConfigLoader>,
    settings: DoctorSettings,
    cancel: CancelToken,
    /// Project config as first loaded during the current run, keyed by path
    config_snapshot: Mutex<Option<(PathBuf, Result<ProjectConfig, ConfigError>)>>,
}

impl CheckEnv {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        host: Arc<dyn HostProbe>,
        versions: Arc<dyn VersionSource>,
        config_loader: Arc<dyn ConfigLoader>,
        settings: DoctorSettings,
        cancel: CancelToken,
    ) -> Self {
        Self {
            runner,
            host,
            versions,
            config_loader,
            settings,
            cancel,
            config_snapshot: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &DoctorSettings {
        &self.settings
    }

    pub fn host(&self) -> &dyn HostProbe {
        self.host.as_ref()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Run one probe under `timeout` and the run's cancel token
    ///
    /// Dropping the runner future on expiry is what terminates the child;
    /// runners must not outlive it.
    pub async fn probe(
        &self,
        request: &CommandRequest,
        timeout: Duration,
    ) -> Result<CommandOutput, ProbeError> {
        if self.cancel.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }

        let deadline = Deadline::new(timeout, self.cancel.clone());
        debug!(command = %request, timeout_ms = deadline.timeout_ms(), "Starting probe");

        let result = tokio::select! {
            outcome = tokio::time::timeout(timeout, self.runner.run(request, &deadline)) => {
                outcome.unwrap_or(Err(ProbeError::Timeout(deadline.timeout_ms())))
            }
            _ = self.cancel.cancelled() => Err(ProbeError::Cancelled),
        };

        match &result {
            Ok(output) => debug!(
                command = %request,
                exit_code = ?output.exit_code,
                duration_ms = output.duration.as_millis() as u64,
                "Probe completed"
            ),
            Err(e) => debug!(command = %request, error = %e, "Probe failed"),
        }

        result
    }

    /// `<tool> <args...>` with the local probe timeout
    pub async fn tool(&self, args: &[&str]) -> Result<CommandOutput, ProbeError> {
        let request = CommandRequest::new(self.settings.tool.clone(), args.iter().copied());
        self.probe(&request, self.settings.probe_timeout).await
    }

    /// `<tool> ssh -c "<script>" -- -T` with the remote timeout
    pub async fn remote(&self, script: &str) -> Result<CommandOutput, ProbeError> {
        let request =
            CommandRequest::new(self.settings.tool.clone(), ["ssh", "-c", script, "--", "-T"]);
        self.probe(&request, self.settings.remote_timeout).await
    }

    /// Latest upstream version, bounded by the upstream timeout
    pub async fn latest_version(&self) -> Result<String, VersionError> {
        let timeout = self.settings.upstream_timeout;
        tokio::select! {
            outcome = tokio::time::timeout(timeout, self.versions.latest_version()) => {
                outcome.unwrap_or_else(|_| {
                    Err(VersionError::Request(format!("timed out after {}ms", timeout.as_millis())))
                })
            }
            _ = self.cancel.cancelled() => Err(VersionError::Request("cancelled".to_string())),
        }
    }

    /// Absolute path of the project config file for this run
    pub fn config_path(&self, ctx: &CheckContext) -> PathBuf {
        if self.settings.config_file.is_absolute() {
            self.settings.config_file.clone()
        } else {
            ctx.target_path().join(&self.settings.config_file)
        }
    }

    /// Project config for this run
    ///
    /// The file is read once, off the runtime thread; every later call in the
    /// run sees the same snapshot, including the same error.
    pub async fn load_config(&self, ctx: &CheckContext) -> Result<ProjectConfig, ConfigError> {
        let path = self.config_path(ctx);
        let mut snapshot = self.config_snapshot.lock().await;
        if let Some((loaded_from, result)) = snapshot.as_ref() {
            if *loaded_from == path {
                return result.clone();
            }
        }

        let loader = Arc::clone(&self.config_loader);
        let load_path = path.clone();
        let result = tokio::task::spawn_blocking(move || loader.load(&load_path))
            .await
            .unwrap_or_else(|e| Err(ConfigError::Invalid(format!("config loader crashed: {}", e))));

        debug!(path = %path.display(), loaded = result.is_ok(), "Project config snapshot taken");
        *snapshot = Some((path, result.clone()));
        result
    }

    /// Drop the config snapshot so the next run reads the file again
    pub(crate) async fn forget_config(&self) {
        self.config_snapshot.lock().await.take();
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::port::command_runner::mocks::ScriptedRunner;
    use crate::port::config_loader::mocks::StaticConfigLoader;
    use crate::port::host_probe::mocks::MockHostProbe;
    use crate::port::version_source::mocks::FixedVersionSource;

    /// CheckEnv over mocks, keeping handles for assertions
    pub struct MockEnv {
        pub runner: ScriptedRunner,
        pub host: MockHostProbe,
        pub versions: FixedVersionSource,
        pub config: StaticConfigLoader,
        pub settings: DoctorSettings,
        pub cancel: CancelToken,
    }

    impl MockEnv {
        pub fn new(runner: ScriptedRunner) -> Self {
            Self {
                runner,
                host: MockHostProbe::healthy(),
                versions: FixedVersionSource::latest("2.4.1"),
                config: StaticConfigLoader::missing(),
                settings: DoctorSettings {
                    platform: Platform::Linux,
                    ..DoctorSettings::default()
                },
                cancel: CancelToken::never(),
            }
        }

        pub fn with_config(mut self, config: StaticConfigLoader) -> Self {
            self.config = config;
            self
        }

        pub fn with_host(mut self, host: MockHostProbe) -> Self {
            self.host = host;
            self
        }

        pub fn with_versions(mut self, versions: FixedVersionSource) -> Self {
            self.versions = versions;
            self
        }

        pub fn with_settings(mut self, settings: DoctorSettings) -> Self {
            self.settings = settings;
            self
        }

        pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
            self.cancel = cancel;
            self
        }

        pub fn build(&self) -> CheckEnv {
            CheckEnv::new(
                Arc::new(self.runner.clone()),
                Arc::new(self.host.clone()),
                Arc::new(self.versions.clone()),
                Arc::new(self.config.clone()),
                self.settings.clone(),
                self.cancel.clone(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::MockEnv;
    use super::*;
    use crate::port::cancel_channel;
    use crate::port::command_runner::mocks::ScriptedRunner;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test(start_paused = true)]
    async fn test_probe_enforces_timeout_on_slow_runner() {
        let runner = ScriptedRunner::new().on_after(
            "vagrant",
            &["status"],
            Duration::from_secs(120),
            0,
            "",
        );
        let env = MockEnv::new(runner).build();

        let request = CommandRequest::new("vagrant", ["status"]);
        let result = env.probe(&request, Duration::from_millis(500)).await;

        assert_eq!(result, Err(ProbeError::Timeout(500)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_returns_cancelled_when_token_fires() {
        let (tx, token) = cancel_channel();
        let runner = ScriptedRunner::new().on_after(
            "vagrant",
            &["ssh"],
            Duration::from_secs(60),
            0,
            "",
        );
        let env = MockEnv::new(runner).with_cancel(token).build();

        let probe = env.remote("uptime");
        let cancel = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            tx.cancel();
        };
        let (result, _) = tokio::join!(probe, cancel);

        assert_eq!(result, Err(ProbeError::Cancelled));
        // A cancelled run issues no further probes
        assert_eq!(env.tool(&["--version"]).await, Err(ProbeError::Cancelled));
    }

    #[tokio::test]
    async fn test_remote_builds_ssh_invocation() {
        let runner = ScriptedRunner::new().on("vagrant", &["ssh"], 0, "ok");
        let mock = MockEnv::new(runner);
        let env = mock.build();

        assert_ok!(env.remote("uptime").await);
        assert_err!(env.tool(&["plugin", "list"]).await);

        let calls = mock.runner.calls();
        assert_eq!(calls[0].args, vec!["ssh", "-c", "uptime", "--", "-T"]);
    }

    #[tokio::test]
    async fn test_config_is_read_once_per_run() {
        use crate::port::config_loader::mocks::StaticConfigLoader;

        let mock = MockEnv::new(ScriptedRunner::new())
            .with_config(StaticConfigLoader::invalid("line 3: unexpected `=`"));
        let env = mock.build();
        let ctx = CheckContext::new("/work/project");

        for _ in 0..4 {
            let error = assert_err!(env.load_config(&ctx).await);
            assert_eq!(error, ConfigError::Invalid("line 3: unexpected `=`".to_string()));
        }
        assert_eq!(mock.config.load_count(), 1);

        // Another target path is another file
        assert_err!(env.load_config(&CheckContext::new("/work/other")).await);
        assert_eq!(mock.config.load_count(), 2);

        env.forget_config().await;
        assert_err!(env.load_config(&CheckContext::new("/work/other")).await);
        assert_eq!(mock.config.load_count(), 3);
    }

    #[test]
    fn test_config_path_resolution() {
        let mock = MockEnv::new(ScriptedRunner::new());
        let env = mock.build();
        let ctx = CheckContext::new("/work/project");
        assert_eq!(env.config_path(&ctx), PathBuf::from("/work/project/vm.toml"));

        let absolute = MockEnv::new(ScriptedRunner::new())
            .with_settings(DoctorSettings {
                config_file: PathBuf::from("/etc/vm.toml"),
                ..DoctorSettings::default()
            })
            .build();
        assert_eq!(absolute.config_path(&ctx), PathBuf::from("/etc/vm.toml"));
    }
}
