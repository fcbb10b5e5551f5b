//! Updates - upstream release and plugin health

use crate::application::env::CheckEnv;
use crate::application::scheduler::{Check, CheckOutput};
use crate::domain::{Category, CheckContext, CheckResult, ContextField, Version};
use async_trait::async_trait;
use tracing::debug;

const CATEGORY: Category = Category::Updates;

/// Compare the installed version against the latest upstream release
pub struct UpToDateCheck;

impl UpToDateCheck {
    pub const NAME: &'static str = "Vagrant up to date";
}

#[async_trait]
impl Check for UpToDateCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn reads(&self) -> &'static [ContextField] {
        &[ContextField::ToolVersion]
    }

    async fn run(&self, ctx: &CheckContext, env: &CheckEnv) -> crate::Result<CheckOutput> {
        let Some(installed) = ctx.tool_version().and_then(Version::parse) else {
            return Ok(CheckResult::skip(Self::NAME, CATEGORY, "Installed Vagrant version is unknown").into());
        };

        let latest = match env.latest_version().await {
            Ok(raw) => Version::parse(&raw),
            Err(e) => {
                debug!(error = %e, "Latest version lookup failed");
                return Ok(CheckResult::skip(
                    Self::NAME,
                    CATEGORY,
                    "Could not determine the latest Vagrant release",
                )
                .with_details(e.to_string())
                .into());
            }
        };

        let result = match latest {
            None => CheckResult::skip(Self::NAME, CATEGORY, "Latest Vagrant release is unknown"),
            Some(latest) if installed < latest => CheckResult::warn(
                Self::NAME,
                CATEGORY,
                format!("Vagrant {} is behind the latest release {}", installed, latest),
            )
            .with_suggestion(format!("Upgrade to Vagrant {}", latest)),
            Some(_) => CheckResult::pass(
                Self::NAME,
                CATEGORY,
                format!("Vagrant {} is the latest release", installed),
            ),
        };

        Ok(result.into())
    }
}

/// `vagrant plugin list`
pub struct PluginsCheck;

impl PluginsCheck {
    pub const NAME: &'static str = "Vagrant plugins";
}

/// Parse `vagrant plugin list` output into plugin names
///
/// Top-level lines look like `vagrant-vbguest (0.32.0, global)`; indented lines
/// carry per-plugin details. Returns None if any top-level line is unrecognized.
pub fn parse_plugins(stdout: &str) -> Option<Vec<String>> {
    if stdout.contains("No plugins installed") {
        return Some(Vec::new());
    }

    let mut plugins = Vec::new();
    for line in stdout.lines() {
        if line.trim().is_empty() || line.starts_with(char::is_whitespace) {
            continue;
        }
        let (name, rest) = line.split_once(" (")?;
        if name.is_empty() || name.contains(char::is_whitespace) || !rest.trim_end().ends_with(')') {
            return None;
        }
        plugins.push(name.to_string());
    }
    Some(plugins)
}

#[async_trait]
impl Check for PluginsCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, _ctx: &CheckContext, env: &CheckEnv) -> crate::Result<CheckOutput> {
        let output = match env.tool(&["plugin", "list"]).await {
            Ok(output) => output,
            Err(e) => {
                return Ok(CheckResult::warn(Self::NAME, CATEGORY, "Could not list plugins")
                    .with_details(e.to_string())
                    .into());
            }
        };

        if !output.success() {
            return Ok(CheckResult::warn(Self::NAME, CATEGORY, "Plugin list failed; plugin state may be corrupt")
                .with_suggestion("Run `vagrant plugin repair`")
                .with_details(output.combined())
                .into());
        }

        let result = match parse_plugins(&output.stdout) {
            None => CheckResult::warn(Self::NAME, CATEGORY, "Unrecognized plugin list output")
                .with_details(output.stdout.trim().to_string()),
            Some(plugins) if plugins.is_empty() => {
                CheckResult::pass(Self::NAME, CATEGORY, "No plugins installed")
            }
            Some(plugins) => CheckResult::pass(
                Self::NAME,
                CATEGORY,
                format!("{} installed: {}", plugins.len(), plugins.join(", ")),
            ),
        };

        Ok(result.into())
    }
}
