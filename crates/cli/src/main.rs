//! vmdoctor - diagnose a Vagrant development environment and its host

mod progress;
mod report;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use colored::Colorize;
use std::future::Future;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vmdoctor_core::application::constants::{
    DEFAULT_DETECT_TIMEOUT, DEFAULT_PROBE_TIMEOUT, DEFAULT_REMOTE_TIMEOUT, DEFAULT_TOOL,
    DEFAULT_UPSTREAM_TIMEOUT,
};
use vmdoctor_core::application::{CheckEnv, Doctor, DoctorSettings};
use vmdoctor_core::domain::config::DEFAULT_CONFIG_FILE;
use vmdoctor_core::domain::Platform;
use vmdoctor_core::port::cancel_channel;
use vmdoctor_infra_system::subprocess_runner::DEFAULT_KILL_GRACE;
use vmdoctor_infra_system::{CheckpointClient, FileConfigLoader, SubprocessRunner, SystemHostProbe};

use progress::StderrProgress;
use report::{render_json, render_text};

const EXIT_SETUP_ERROR: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

/// How long an interrupted run may take to wind down before exiting
const INTERRUPT_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "vmdoctor")]
#[command(about = "Diagnose a Vagrant development environment and its host", long_about = None)]
#[command(version)]
struct Cli {
    /// Project directory containing the Vagrantfile
    #[arg(short, long, env = "VMDOCTOR_PATH", default_value = ".")]
    path: String,

    /// Report format
    #[arg(short, long, env = "VMDOCTOR_FORMAT", value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Project config file (TOML, YAML or JSON); relative paths resolve against --path
    #[arg(short, long, env = "VMDOCTOR_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// VM tool binary
    #[arg(long, env = "VMDOCTOR_TOOL", default_value = DEFAULT_TOOL)]
    tool: String,

    /// Timeout for local tool probes, in seconds
    #[arg(long, env = "VMDOCTOR_PROBE_TIMEOUT", default_value_t = DEFAULT_PROBE_TIMEOUT.as_secs())]
    probe_timeout: u64,

    /// Per-provider detection timeout, in seconds
    #[arg(long, env = "VMDOCTOR_DETECT_TIMEOUT", default_value_t = DEFAULT_DETECT_TIMEOUT.as_secs())]
    detect_timeout: u64,

    /// Timeout for the batched guest round trip, in seconds
    #[arg(long, env = "VMDOCTOR_REMOTE_TIMEOUT", default_value_t = DEFAULT_REMOTE_TIMEOUT.as_secs())]
    remote_timeout: u64,

    /// Timeout for the latest-release lookup, in seconds
    #[arg(long, env = "VMDOCTOR_UPSTREAM_TIMEOUT", default_value_t = DEFAULT_UPSTREAM_TIMEOUT.as_secs())]
    upstream_timeout: u64,

    /// Suppress per-phase progress on stderr
    #[arg(short, long)]
    quiet: bool,

    /// Disable colored output (NO_COLOR is honored too)
    #[arg(long)]
    no_color: bool,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn settings(&self) -> DoctorSettings {
        DoctorSettings {
            tool: self.tool.clone(),
            config_file: expand(&self.config),
            probe_timeout: Duration::from_secs(self.probe_timeout),
            detect_timeout: Duration::from_secs(self.detect_timeout),
            remote_timeout: Duration::from_secs(self.remote_timeout),
            upstream_timeout: Duration::from_secs(self.upstream_timeout),
            platform: Platform::current(),
        }
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// Logs go to stderr so stdout carries only the report
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "vmdoctor=warn",
        1 => "vmdoctor=info",
        _ => "vmdoctor=debug",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_format = std::env::var("VMDOCTOR_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    match log_format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

/// Resolves on Ctrl+C; if the handler cannot be installed, never resolves
async fn wait_for_interrupt<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!(error = %e, "Cannot listen for Ctrl+C; the run cannot be interrupted");
        std::future::pending::<()>().await;
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let settings = cli.settings();
    let target = expand(&cli.path);
    info!(
        target = %target.display(),
        tool = %settings.tool,
        platform = %settings.platform,
        "vmdoctor v{} starting",
        vmdoctor_core::VERSION
    );

    // DI wiring
    let (cancel_tx, cancel) = cancel_channel();
    let env = CheckEnv::new(
        Arc::new(SubprocessRunner::new()),
        Arc::new(SystemHostProbe::new()),
        Arc::new(CheckpointClient::new(settings.upstream_timeout)),
        Arc::new(FileConfigLoader::new()),
        settings,
        cancel,
    );

    let mut doctor = Doctor::new(env).context("Cannot build the diagnostic plan")?;
    if cli.format == OutputFormat::Text && !cli.quiet && std::io::stderr().is_terminal() {
        doctor = doctor.with_observer(Arc::new(StderrProgress));
    }

    let pipeline = doctor.run(&target);
    tokio::pin!(pipeline);

    let (outcome, interrupted) = tokio::select! {
        outcome = &mut pipeline => (Some(outcome), false),
        () = wait_for_interrupt(tokio::signal::ctrl_c()) => {
            warn!("Interrupt received, cancelling outstanding probes");
            cancel_tx.cancel();
            let outcome = tokio::time::timeout(INTERRUPT_GRACE, &mut pipeline).await.ok();
            // Let pending SIGKILL escalations fire before the runtime goes away
            tokio::time::sleep(DEFAULT_KILL_GRACE).await;
            (outcome, true)
        }
    };

    let report = match outcome {
        Some(result) => Some(result.with_context(|| format!("Cannot diagnose {}", target.display()))?),
        None => None,
    };

    if let Some(report) = &report {
        match cli.format {
            OutputFormat::Json => println!("{}", render_json(report)?),
            OutputFormat::Text => print!("{}", render_text(report)),
        }
    }

    if interrupted {
        eprintln!("{}", "Interrupted".yellow().bold());
        return Ok(EXIT_INTERRUPTED);
    }

    Ok(report.map_or(EXIT_SETUP_ERROR, |r| r.exit_code() as u8))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(EXIT_SETUP_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["vmdoctor"]);
        let settings = cli.settings();

        assert_eq!(cli.format, OutputFormat::Text);
        assert_eq!(settings.tool, "vagrant");
        assert_eq!(settings.config_file, PathBuf::from("vm.toml"));
        assert_eq!(settings.probe_timeout, DEFAULT_PROBE_TIMEOUT);
        assert_eq!(settings.remote_timeout, DEFAULT_REMOTE_TIMEOUT);
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "vmdoctor",
            "--format",
            "json",
            "--tool",
            "/opt/vagrant/bin/vagrant",
            "--detect-timeout",
            "2",
            "-vv",
        ]);
        let settings = cli.settings();

        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(settings.tool, "/opt/vagrant/bin/vagrant");
        assert_eq!(settings.detect_timeout, Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_fires_on_signal() {
        let fired = tokio::time::timeout(Duration::from_secs(1), wait_for_interrupt(async { Ok(()) })).await;
        assert!(fired.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_signal_handler_does_not_interrupt() {
        let failing = async { Err(std::io::Error::other("signal driver unavailable")) };

        let fired = tokio::time::timeout(Duration::from_secs(60), wait_for_interrupt(failing)).await;

        assert!(fired.is_err(), "a handler error must not count as an interrupt");
    }

    #[test]
    fn test_tilde_expansion() {
        let expanded = expand("~/project/vm.toml");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert_eq!(expand("vm.toml"), PathBuf::from("vm.toml"));
    }
}
