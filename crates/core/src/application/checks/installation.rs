//! Installation - project files and provider selection
//!
//! Sequential: `Provider available` reads what `Configured provider` writes.

use crate::application::env::CheckEnv;
use crate::application::scheduler::{Check, CheckOutput};
use crate::domain::provider::display_name;
use crate::domain::{Category, CheckContext, CheckResult, ContextFact, ContextField};
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

const CATEGORY: Category = Category::Installation;

/// `Vagrantfile` in the target directory
pub struct VagrantfileCheck;

impl VagrantfileCheck {
    pub const NAME: &'static str = "Vagrantfile present";
}

#[async_trait]
impl Check for VagrantfileCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, ctx: &CheckContext, _env: &CheckEnv) -> crate::Result<CheckOutput> {
        let path = ctx.target_path().join("Vagrantfile");

        let result = if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
            CheckResult::pass(Self::NAME, CATEGORY, format!("Found {}", path.display()))
        } else {
            CheckResult::fail(Self::NAME, CATEGORY, format!("No Vagrantfile in {}", ctx.target_path().display()))
                .with_suggestion("Run `vagrant init` or point --path at the project root")
        };

        Ok(result.into())
    }
}

/// Provider from `vm.provider`, else from an existing `.vagrant/machines/<name>/<provider>` directory
pub struct ConfiguredProviderCheck;

impl ConfiguredProviderCheck {
    pub const NAME: &'static str = "Configured provider";
}

/// Provider of an already-created machine, if any
async fn machine_provider(target: &Path) -> Option<String> {
    let machines = target.join(".vagrant").join("machines");
    let mut machine_dirs = tokio::fs::read_dir(&machines).await.ok()?;

    while let Ok(Some(machine)) = machine_dirs.next_entry().await {
        let Ok(mut providers) = tokio::fs::read_dir(machine.path()).await else {
            continue;
        };
        while let Ok(Some(provider)) = providers.next_entry().await {
            if provider.file_type().await.is_ok_and(|t| t.is_dir()) {
                return provider.file_name().to_str().map(str::to_string);
            }
        }
    }
    None
}

#[async_trait]
impl Check for ConfiguredProviderCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn writes(&self) -> Option<ContextField> {
        Some(ContextField::ConfiguredProvider)
    }

    async fn run(&self, ctx: &CheckContext, env: &CheckEnv) -> crate::Result<CheckOutput> {
        let from_config = match env.load_config(ctx).await {
            Ok(config) => config.vm.provider,
            Err(e) => {
                debug!(error = %e, "Config unavailable for provider lookup");
                None
            }
        };

        if let Some(provider) = from_config {
            let result = CheckResult::pass(
                Self::NAME,
                CATEGORY,
                format!("{} (from configuration)", display_name(&provider)),
            );
            return Ok(CheckOutput::single(result).with_fact(ContextFact::ConfiguredProvider(provider)));
        }

        if let Some(provider) = machine_provider(ctx.target_path()).await {
            let result = CheckResult::pass(
                Self::NAME,
                CATEGORY,
                format!("{} (from existing machine)", display_name(&provider)),
            );
            return Ok(CheckOutput::single(result).with_fact(ContextFact::ConfiguredProvider(provider)));
        }

        Ok(CheckResult::skip(
            Self::NAME,
            CATEGORY,
            "No provider configured; Vagrant will pick its default",
        )
        .into())
    }
}

/// The configured provider is among the detected ones
pub struct ProviderAvailableCheck;

impl ProviderAvailableCheck {
    pub const NAME: &'static str = "Provider available";
}

#[async_trait]
impl Check for ProviderAvailableCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn reads(&self) -> &'static [ContextField] {
        &[ContextField::ConfiguredProvider, ContextField::AvailableProviders]
    }

    async fn run(&self, ctx: &CheckContext, _env: &CheckEnv) -> crate::Result<CheckOutput> {
        let Some(provider) = ctx.configured_provider() else {
            return Ok(CheckResult::skip(Self::NAME, CATEGORY, "No provider configured").into());
        };
        let available = ctx.available_providers();
        let display = display_name(provider);

        let result = if available.iter().any(|p| p == provider) {
            CheckResult::pass(Self::NAME, CATEGORY, format!("{} is available", display))
        } else if available.is_empty() {
            CheckResult::fail(
                Self::NAME,
                CATEGORY,
                format!("{} is configured but no providers were detected", display),
            )
            .with_suggestion(format!("Install {}", display))
        } else {
            CheckResult::fail(
                Self::NAME,
                CATEGORY,
                format!("{} is configured but not available", display),
            )
            .with_suggestion(format!(
                "Install {} or set vm.provider to one of: {}",
                display,
                available.join(", ")
            ))
        };

        Ok(result.into())
    }
}
