//! VM Health - guest facts gathered in one remote round trip
//!
//! A single [`GuestHealthCheck`] builds one [`RemoteBatch`], runs it over
//! `vagrant ssh` once, and turns each fact block into its own result.

use crate::application::constants::*;
use crate::application::env::CheckEnv;
use crate::application::remote::{FactBlocks, RemoteBatch};
use crate::application::scheduler::{Check, CheckOutput};
use crate::domain::{Category, CheckContext, CheckResult, ProjectConfig};
use async_trait::async_trait;
use tracing::{debug, warn};

const CATEGORY: Category = Category::VmHealth;

const DISK: &str = "disk";
const MEMORY: &str = "memory";
const LOGS: &str = "logs";
const SYNCED: &str = "synced";
const DNS: &str = "dns";

/// A guest service probed for presence and state
#[derive(Debug, Clone, Copy)]
pub struct GuestService {
    /// Name used in `services` of the project config
    pub name: &'static str,
    pub display_name: &'static str,
    /// Binary whose presence means the service is installed
    pub binary: &'static str,
    pub unit: &'static str,
}

impl GuestService {
    fn key(&self) -> String {
        format!("service:{}", self.name)
    }

    fn result_name(&self) -> String {
        format!("{} service", self.display_name)
    }

    fn command(&self) -> String {
        format!(
            "if command -v {} >/dev/null 2>&1; then systemctl is-active {}; else echo absent; fi",
            self.binary, self.unit
        )
    }
}

pub const GUEST_SERVICES: &[GuestService] = &[
    GuestService {
        name: "docker",
        display_name: "Docker",
        binary: "docker",
        unit: "docker",
    },
    GuestService {
        name: "postgresql",
        display_name: "PostgreSQL",
        binary: "psql",
        unit: "postgresql",
    },
    GuestService {
        name: "redis",
        display_name: "Redis",
        binary: "redis-server",
        unit: "redis-server",
    },
];

/// Result names in emission order
pub fn result_names() -> Vec<String> {
    let mut names: Vec<String> = [
        GuestHealthCheck::DISK,
        GuestHealthCheck::MEMORY,
        GuestHealthCheck::LOGS,
        GuestHealthCheck::SYNCED_FOLDER,
        GuestHealthCheck::DNS,
    ]
    .iter()
    .map(|name| name.to_string())
    .collect();
    names.extend(GUEST_SERVICES.iter().map(GuestService::result_name));
    names
}

pub struct GuestHealthCheck;

impl GuestHealthCheck {
    pub const NAME: &'static str = "Guest health";
    pub const DISK: &'static str = "Guest disk usage";
    pub const MEMORY: &'static str = "Guest memory";
    pub const LOGS: &'static str = "Guest log size";
    pub const SYNCED_FOLDER: &'static str = "Synced folder";
    pub const DNS: &'static str = "Guest DNS";

    fn batch(config: &ProjectConfig) -> RemoteBatch {
        let folder = config.synced_folder().replace('\'', "");
        let mut batch = RemoteBatch::new()
            .fact(DISK, "df -P / | tail -n 1")
            .fact(MEMORY, "free -m | awk '/^Mem:/ {print $2, $7}'")
            .fact(LOGS, "du -sm /var/log 2>/dev/null | tail -n 1")
            .fact(SYNCED, format!("test -d '{}' && echo present || echo missing", folder))
            .fact(DNS, "getent hosts example.com >/dev/null && echo ok || echo failed");
        for service in GUEST_SERVICES {
            batch = batch.fact(service.key(), service.command());
        }
        batch
    }
}

fn first_line<'a>(blocks: &'a FactBlocks, key: &str) -> Option<&'a str> {
    blocks.get(key).and_then(|lines| lines.first()).map(|line| line.trim())
}

fn missing(name: &str, key: &str) -> CheckResult {
    CheckResult::warn(name, CATEGORY, "No output from the guest")
        .with_details(format!("Block `{}` was missing or empty", key))
}

fn unparsable(name: &str, raw: &str) -> CheckResult {
    CheckResult::warn(name, CATEGORY, "Unrecognized guest output").with_details(raw.to_string())
}

/// `df -P` data line: the capacity column is the fifth field, e.g. `42%`
pub fn parse_disk_percent(line: &str) -> Option<u64> {
    line.split_whitespace()
        .nth(4)?
        .strip_suffix('%')?
        .parse()
        .ok()
}

fn disk_result(blocks: &FactBlocks) -> CheckResult {
    let name = GuestHealthCheck::DISK;
    let Some(line) = first_line(blocks, DISK) else {
        return missing(name, DISK);
    };
    let Some(used) = parse_disk_percent(line) else {
        return unparsable(name, line);
    };

    let message = format!("Root filesystem {}% used", used);
    if used >= GUEST_DISK_FAIL_PERCENT {
        CheckResult::fail(name, CATEGORY, message)
            .with_suggestion("Free space in the guest or grow its disk")
    } else if used >= GUEST_DISK_WARN_PERCENT {
        CheckResult::warn(name, CATEGORY, message)
            .with_suggestion("Clean package caches and old logs in the guest")
    } else {
        CheckResult::pass(name, CATEGORY, message)
    }
}

/// `<total> <available>` in MiB
pub fn parse_memory(line: &str) -> Option<(u64, u64)> {
    let mut fields = line.split_whitespace().map(str::parse::<u64>);
    match (fields.next(), fields.next()) {
        (Some(Ok(total)), Some(Ok(available))) if total > 0 => Some((total, available)),
        _ => None,
    }
}

fn memory_result(blocks: &FactBlocks) -> CheckResult {
    let name = GuestHealthCheck::MEMORY;
    let Some(line) = first_line(blocks, MEMORY) else {
        return missing(name, MEMORY);
    };
    let Some((total, available)) = parse_memory(line) else {
        return unparsable(name, line);
    };

    let (Some(available_share), Some(warn_share)) =
        (available.checked_mul(100), total.checked_mul(GUEST_MEMORY_WARN_PERCENT))
    else {
        return unparsable(name, line);
    };

    let message = format!("{} MiB of {} MiB available", available, total);
    if available_share < warn_share {
        CheckResult::warn(name, CATEGORY, message)
            .with_suggestion("Raise vm.memory_mb or stop memory-heavy guest processes")
    } else {
        CheckResult::pass(name, CATEGORY, message)
    }
}

fn logs_result(blocks: &FactBlocks) -> CheckResult {
    let name = GuestHealthCheck::LOGS;
    let Some(line) = first_line(blocks, LOGS) else {
        return missing(name, LOGS);
    };
    let Some(size_mb) = line.split_whitespace().next().and_then(|s| s.parse::<u64>().ok()) else {
        return unparsable(name, line);
    };

    let message = format!("/var/log uses {} MiB", size_mb);
    if size_mb > GUEST_LOG_WARN_MB {
        CheckResult::warn(name, CATEGORY, message)
            .with_suggestion("Rotate or vacuum logs, e.g. `sudo journalctl --vacuum-size=200M`")
    } else {
        CheckResult::pass(name, CATEGORY, message)
    }
}

fn synced_folder_result(blocks: &FactBlocks, folder: &str) -> CheckResult {
    let name = GuestHealthCheck::SYNCED_FOLDER;
    match first_line(blocks, SYNCED) {
        None => missing(name, SYNCED),
        Some("present") => CheckResult::pass(name, CATEGORY, format!("{} is mounted", folder)),
        Some("missing") => CheckResult::fail(name, CATEGORY, format!("{} is not mounted in the guest", folder))
            .with_suggestion("Run `vagrant reload` to remount synced folders"),
        Some(other) => unparsable(name, other),
    }
}

fn dns_result(blocks: &FactBlocks) -> CheckResult {
    let name = GuestHealthCheck::DNS;
    match first_line(blocks, DNS) {
        None => missing(name, DNS),
        Some("ok") => CheckResult::pass(name, CATEGORY, "Guest resolves external hostnames"),
        Some("failed") => CheckResult::fail(name, CATEGORY, "Guest cannot resolve external hostnames")
            .with_suggestion("Check /etc/resolv.conf in the guest or the host's network"),
        Some(other) => unparsable(name, other),
    }
}

/// Optional absent → skip, optional stopped → warn, required not active → fail
fn service_result(blocks: &FactBlocks, service: &GuestService, required: bool) -> CheckResult {
    let name = service.result_name();
    let key = service.key();
    let Some(state) = first_line(blocks, &key) else {
        return missing(&name, &key);
    };

    match (state, required) {
        ("active", _) => CheckResult::pass(&name, CATEGORY, format!("{} is running", service.display_name)),
        ("absent", false) => {
            CheckResult::skip(&name, CATEGORY, format!("{} is not installed", service.display_name))
        }
        ("absent", true) => CheckResult::fail(
            &name,
            CATEGORY,
            format!("{} is required but not installed", service.display_name),
        )
        .with_suggestion(format!("Provision {} in the guest", service.display_name)),
        (state, false) => CheckResult::warn(
            &name,
            CATEGORY,
            format!("{} is installed but {}", service.display_name, state),
        )
        .with_suggestion(format!("sudo systemctl start {}", service.unit)),
        (state, true) => CheckResult::fail(
            &name,
            CATEGORY,
            format!("{} is required but {}", service.display_name, state),
        )
        .with_suggestion(format!("sudo systemctl start {}", service.unit)),
    }
}

#[async_trait]
impl Check for GuestHealthCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, ctx: &CheckContext, env: &CheckEnv) -> crate::Result<CheckOutput> {
        let config = env.load_config(ctx).await.unwrap_or_else(|e| {
            debug!(error = %e, "Using default project config for guest checks");
            ProjectConfig::default()
        });
        let batch = Self::batch(&config);

        let output = match env.remote(&batch.script()).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, facts = batch.len(), "Remote fact batch failed");
                return Ok(remote_failure(e.to_string()));
            }
        };

        let blocks = crate::application::remote::parse_blocks(&output.stdout);
        if blocks.is_empty() && !output.success() {
            return Ok(remote_failure(output.combined()));
        }
        debug!(facts = batch.len(), blocks = blocks.len(), "Remote facts collected");

        let mut results = vec![
            disk_result(&blocks),
            memory_result(&blocks),
            logs_result(&blocks),
            synced_folder_result(&blocks, config.synced_folder()),
            dns_result(&blocks),
        ];
        results.extend(
            GUEST_SERVICES
                .iter()
                .map(|service| service_result(&blocks, service, config.requires_service(service.name))),
        );

        Ok(CheckOutput::results(results))
    }
}

/// One failure per logical guest check
fn remote_failure(details: String) -> CheckOutput {
    CheckOutput::results(
        result_names()
            .into_iter()
            .map(|name| {
                CheckResult::fail(name, CATEGORY, "Could not reach the guest over ssh")
                    .with_details(details.clone())
                    .with_suggestion("Run `vagrant ssh` manually to diagnose")
            })
            .collect(),
    )
}
