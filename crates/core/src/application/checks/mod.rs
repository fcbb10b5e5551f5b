// Check functions, one module per phase

pub mod configuration;
pub mod installation;
pub mod network;
pub mod prerequisites;
pub mod updates;
pub mod vm_health;
pub mod vm_state;

use crate::domain::{Category, CheckResult};
use crate::port::{ConfigError, ProbeError};

const INSTALL_URL: &str = "https://developer.hashicorp.com/vagrant/install";

/// Result for a probe that never produced output
pub(crate) fn probe_failure(
    name: &str,
    category: Category,
    what: &str,
    error: &ProbeError,
) -> CheckResult {
    match error {
        ProbeError::Unavailable(program) => CheckResult::fail(
            name,
            category,
            format!("{} is not installed or not on PATH", program),
        )
        .with_suggestion(format!("Install Vagrant from {}", INSTALL_URL)),
        ProbeError::Timeout(ms) => {
            CheckResult::fail(name, category, format!("{} timed out after {}ms", what, ms))
                .with_suggestion("Re-run with a larger --probe-timeout, or check for a hung VM process")
        }
        ProbeError::Cancelled => CheckResult::fail(name, category, format!("{} was interrupted", what)),
        ProbeError::Io(e) => {
            CheckResult::fail(name, category, format!("{} failed", what)).with_details(e.clone())
        }
    }
}

/// Result for a check that needs the project config but could not load it
pub(crate) fn config_failure(name: &str, category: Category, error: &ConfigError) -> CheckResult {
    let result = CheckResult::fail(name, category, error.to_string());
    match error {
        ConfigError::NotFound(_) => result
            .with_suggestion("Create vm.toml in the project root or pass --config <path>"),
        ConfigError::Invalid(_) => result.with_suggestion("Fix the syntax errors in the configuration file"),
    }
}
