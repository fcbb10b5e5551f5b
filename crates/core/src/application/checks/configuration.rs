//! Configuration - project environment file and resource requests
//!
//! Each check loads the config on its own so an invalid file fails every
//! check individually instead of hiding the rest of the phase.

use super::config_failure;
use crate::application::constants::MEMORY_ALLOCATION_WARN_PERCENT;
use crate::application::env::CheckEnv;
use crate::application::scheduler::{Check, CheckOutput};
use crate::domain::{Category, CheckContext, CheckResult};
use async_trait::async_trait;

const CATEGORY: Category = Category::Configuration;

const MIB: u64 = 1024 * 1024;

pub struct ConfigFileCheck;

impl ConfigFileCheck {
    pub const NAME: &'static str = "Configuration file";
}

#[async_trait]
impl Check for ConfigFileCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, ctx: &CheckContext, env: &CheckEnv) -> crate::Result<CheckOutput> {
        let path = env.config_path(ctx);
        let result = match env.load_config(ctx).await {
            Ok(config) => CheckResult::pass(
                Self::NAME,
                CATEGORY,
                format!(
                    "Loaded {} ({} forwarded ports, {} required services)",
                    path.display(),
                    config.ports.len(),
                    config.services.len()
                ),
            ),
            Err(e) => config_failure(Self::NAME, CATEGORY, &e),
        };
        Ok(result.into())
    }
}

pub struct BoxCheck;

impl BoxCheck {
    pub const NAME: &'static str = "Box configured";
}

#[async_trait]
impl Check for BoxCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, ctx: &CheckContext, env: &CheckEnv) -> crate::Result<CheckOutput> {
        let config = match env.load_config(ctx).await {
            Ok(config) => config,
            Err(e) => return Ok(config_failure(Self::NAME, CATEGORY, &e).into()),
        };

        let result = match config.vm.box_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                CheckResult::pass(Self::NAME, CATEGORY, format!("Box {}", name))
            }
            _ => CheckResult::warn(Self::NAME, CATEGORY, "No box set; the Vagrantfile default applies")
                .with_suggestion("Set vm.box to pin the base image"),
        };
        Ok(result.into())
    }
}

/// Requested guest memory against host total
pub struct MemoryCheck;

impl MemoryCheck {
    pub const NAME: &'static str = "Memory allocation";
}

#[async_trait]
impl Check for MemoryCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, ctx: &CheckContext, env: &CheckEnv) -> crate::Result<CheckOutput> {
        let config = match env.load_config(ctx).await {
            Ok(config) => config,
            Err(e) => return Ok(config_failure(Self::NAME, CATEGORY, &e).into()),
        };
        let Some(requested_mb) = config.vm.memory_mb else {
            return Ok(CheckResult::skip(Self::NAME, CATEGORY, "vm.memory_mb not set").into());
        };

        let host_mb = env.host().metrics(ctx.target_path()).await.memory_total_bytes / MIB;
        let message = format!("{} MiB requested of {} MiB host memory", requested_mb, host_mb);

        let result = if requested_mb > host_mb {
            CheckResult::fail(Self::NAME, CATEGORY, message)
                .with_suggestion(format!("Lower vm.memory_mb below {}", host_mb))
        } else if requested_mb * 100 > host_mb * MEMORY_ALLOCATION_WARN_PERCENT {
            CheckResult::warn(Self::NAME, CATEGORY, message).with_suggestion(format!(
                "Leave at least {}% of host memory for the host",
                100 - MEMORY_ALLOCATION_WARN_PERCENT
            ))
        } else {
            CheckResult::pass(Self::NAME, CATEGORY, message)
        };
        Ok(result.into())
    }
}

/// Requested guest CPUs against host cores
pub struct CpuCheck;

impl CpuCheck {
    pub const NAME: &'static str = "CPU allocation";
}

#[async_trait]
impl Check for CpuCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, ctx: &CheckContext, env: &CheckEnv) -> crate::Result<CheckOutput> {
        let config = match env.load_config(ctx).await {
            Ok(config) => config,
            Err(e) => return Ok(config_failure(Self::NAME, CATEGORY, &e).into()),
        };
        let Some(cpus) = config.vm.cpus else {
            return Ok(CheckResult::skip(Self::NAME, CATEGORY, "vm.cpus not set").into());
        };

        let cores = env.host().metrics(ctx.target_path()).await.cpu_count;
        let message = format!("{} CPUs requested of {} host cores", cpus, cores);

        let result = if cpus == 0 {
            CheckResult::fail(Self::NAME, CATEGORY, "vm.cpus must be at least 1")
        } else if cpus > cores {
            CheckResult::fail(Self::NAME, CATEGORY, message)
                .with_suggestion(format!("Lower vm.cpus to at most {}", cores))
        } else if cpus == cores {
            CheckResult::warn(Self::NAME, CATEGORY, message)
                .with_suggestion("Giving the guest every core starves the host")
        } else {
            CheckResult::pass(Self::NAME, CATEGORY, message)
        };
        Ok(result.into())
    }
}
