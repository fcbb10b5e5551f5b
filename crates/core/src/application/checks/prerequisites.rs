//! Prerequisites - host tooling and resources
//!
//! Owns `tool_version` and `available_providers`.

use super::probe_failure;
use crate::application::constants::*;
use crate::application::detector::ProviderDetector;
use crate::application::env::CheckEnv;
use crate::application::scheduler::{Check, CheckOutput};
use crate::domain::{Category, CheckContext, CheckResult, ContextFact, ContextField, Version};
use async_trait::async_trait;

const CATEGORY: Category = Category::Prerequisites;

fn gib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}

/// `vagrant --version`
pub struct ToolInstalledCheck;

impl ToolInstalledCheck {
    pub const NAME: &'static str = "Vagrant installed";
}

#[async_trait]
impl Check for ToolInstalledCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn writes(&self) -> Option<ContextField> {
        Some(ContextField::ToolVersion)
    }

    async fn run(&self, _ctx: &CheckContext, env: &CheckEnv) -> crate::Result<CheckOutput> {
        let output = match env.tool(&["--version"]).await {
            Ok(output) => output,
            Err(e) => {
                return Ok(probe_failure(Self::NAME, CATEGORY, "`vagrant --version`", &e).into());
            }
        };

        if !output.success() {
            return Ok(CheckResult::fail(
                Self::NAME,
                CATEGORY,
                format!("`vagrant --version` exited with {:?}", output.exit_code),
            )
            .with_details(output.combined())
            .with_suggestion("Reinstall Vagrant")
            .into());
        }

        let raw = output.stdout.trim().to_string();
        let Some(version) = Version::extract(&raw) else {
            // Installed, but the banner is unrecognized
            return Ok(CheckOutput::single(
                CheckResult::warn(Self::NAME, CATEGORY, "Vagrant is installed but its version could not be parsed")
                    .with_details(raw.clone()),
            )
            .with_fact(ContextFact::ToolVersion(raw)));
        };

        let minimum = Version::parse(MIN_TOOL_VERSION);
        let result = match minimum {
            Some(min) if version < min => CheckResult::warn(
                Self::NAME,
                CATEGORY,
                format!("Vagrant {} is older than the supported minimum {}", version, min),
            )
            .with_suggestion(format!("Upgrade Vagrant from {}", super::INSTALL_URL)),
            _ => CheckResult::pass(Self::NAME, CATEGORY, format!("Vagrant {}", version)),
        };

        Ok(CheckOutput::single(result).with_fact(ContextFact::ToolVersion(version.to_string())))
    }
}

/// Concurrent provider detection
pub struct ProvidersCheck;

impl ProvidersCheck {
    pub const NAME: &'static str = "Virtualization providers";
}

#[async_trait]
impl Check for ProvidersCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn writes(&self) -> Option<ContextField> {
        Some(ContextField::AvailableProviders)
    }

    async fn run(&self, _ctx: &CheckContext, env: &CheckEnv) -> crate::Result<CheckOutput> {
        let settings = env.settings();
        let detector = ProviderDetector::for_platform(settings.platform, settings.detect_timeout);
        let outcomes = detector.probe_all(env).await;

        let available: Vec<_> = outcomes.iter().filter(|o| o.available).collect();
        let names: Vec<String> = available.iter().map(|o| o.probe.name.to_string()).collect();

        let result = if available.is_empty() {
            let details = outcomes
                .iter()
                .map(|o| {
                    format!(
                        "{}: {}",
                        o.probe.display_name,
                        o.reason.as_deref().unwrap_or("unavailable")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            CheckResult::fail(Self::NAME, CATEGORY, "No virtualization provider detected")
                .with_suggestion("Install VirtualBox, VMware, libvirt, Parallels, Hyper-V or Docker")
                .with_details(details)
        } else {
            let display: Vec<&str> = available.iter().map(|o| o.probe.display_name).collect();
            CheckResult::pass(Self::NAME, CATEGORY, format!("Available: {}", display.join(", ")))
        };

        Ok(CheckOutput::single(result).with_fact(ContextFact::AvailableProviders(names)))
    }
}

/// Free disk on the volume holding the project
pub struct HostDiskCheck;

impl HostDiskCheck {
    pub const NAME: &'static str = "Host disk space";
}

#[async_trait]
impl Check for HostDiskCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, ctx: &CheckContext, env: &CheckEnv) -> crate::Result<CheckOutput> {
        let metrics = env.host().metrics(ctx.target_path()).await;

        let result = match metrics.disk_available_bytes {
            None => CheckResult::warn(Self::NAME, CATEGORY, "Could not determine free disk space")
                .with_details(format!("No volume matched {}", ctx.target_path().display())),
            Some(free) if free < HOST_DISK_FAIL_BYTES => CheckResult::fail(
                Self::NAME,
                CATEGORY,
                format!("Only {:.1} GiB free", gib(free)),
            )
            .with_suggestion("Free disk space before starting the VM"),
            Some(free) if free < HOST_DISK_WARN_BYTES => CheckResult::warn(
                Self::NAME,
                CATEGORY,
                format!("Low disk space ({:.1} GiB free)", gib(free)),
            )
            .with_suggestion("Boxes and VM disks need several GiB; consider freeing space"),
            Some(free) => {
                CheckResult::pass(Self::NAME, CATEGORY, format!("{:.1} GiB free", gib(free)))
            }
        };

        Ok(result.into())
    }
}

/// Available host memory
pub struct HostMemoryCheck;

impl HostMemoryCheck {
    pub const NAME: &'static str = "Host memory";
}

#[async_trait]
impl Check for HostMemoryCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, ctx: &CheckContext, env: &CheckEnv) -> crate::Result<CheckOutput> {
        let metrics = env.host().metrics(ctx.target_path()).await;
        let available = metrics.memory_available_bytes;
        let message = format!(
            "{:.1} GiB of {:.1} GiB available",
            gib(available),
            gib(metrics.memory_total_bytes)
        );

        let result = if available < HOST_MEMORY_FAIL_BYTES {
            CheckResult::fail(Self::NAME, CATEGORY, message)
                .with_suggestion("Close memory-heavy applications before starting the VM")
        } else if available < HOST_MEMORY_WARN_BYTES {
            CheckResult::warn(Self::NAME, CATEGORY, message)
                .with_suggestion("The VM may swap; consider lowering vm.memory_mb")
        } else {
            CheckResult::pass(Self::NAME, CATEGORY, message)
        };

        Ok(result.into())
    }
}
