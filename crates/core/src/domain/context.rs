// CheckContext - state threaded across phases within one run
//
// Field ownership:
//
// | field               | owner phase   |
// |---------------------|---------------|
// | available_providers | Prerequisites |
// | tool_version        | Prerequisites |
// | configured_provider | Installation  |
// | vm_running          | VmState       |
//
// Checks only ever see `&CheckContext`. Writes travel as `ContextFact`s that the
// scheduler applies after checking the owner table.

use crate::domain::check::Category;
use std::path::{Path, PathBuf};

/// Identifies one writable context field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextField {
    AvailableProviders,
    ToolVersion,
    ConfiguredProvider,
    VmRunning,
}

impl ContextField {
    /// The only phase allowed to write this field
    pub fn owner(&self) -> Category {
        match self {
            ContextField::AvailableProviders | ContextField::ToolVersion => Category::Prerequisites,
            ContextField::ConfiguredProvider => Category::Installation,
            ContextField::VmRunning => Category::VmState,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextField::AvailableProviders => "available_providers",
            ContextField::ToolVersion => "tool_version",
            ContextField::ConfiguredProvider => "configured_provider",
            ContextField::VmRunning => "vm_running",
        }
    }
}

/// A typed write to the context, produced by a check and applied by the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextFact {
    AvailableProviders(Vec<String>),
    ToolVersion(String),
    ConfiguredProvider(String),
    VmRunning(bool),
}

impl ContextFact {
    pub fn field(&self) -> ContextField {
        match self {
            ContextFact::AvailableProviders(_) => ContextField::AvailableProviders,
            ContextFact::ToolVersion(_) => ContextField::ToolVersion,
            ContextFact::ConfiguredProvider(_) => ContextField::ConfiguredProvider,
            ContextFact::VmRunning(_) => ContextField::VmRunning,
        }
    }
}

/// Shared run state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckContext {
    target_path: PathBuf,
    vm_running: bool,
    configured_provider: Option<String>,
    available_providers: Vec<String>,
    tool_version: Option<String>,
}

impl CheckContext {
    /// Fresh context with defaults for a run against `target_path`
    pub fn new(target_path: impl Into<PathBuf>) -> Self {
        Self {
            target_path: target_path.into(),
            vm_running: false,
            configured_provider: None,
            available_providers: Vec::new(),
            tool_version: None,
        }
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn vm_running(&self) -> bool {
        self.vm_running
    }

    pub fn configured_provider(&self) -> Option<&str> {
        self.configured_provider.as_deref()
    }

    pub fn available_providers(&self) -> &[String] {
        &self.available_providers
    }

    pub fn tool_version(&self) -> Option<&str> {
        self.tool_version.as_deref()
    }

    /// Apply a fact. Visible to the crate only so that the scheduler stays the sole writer.
    pub(crate) fn apply(&mut self, fact: ContextFact) {
        match fact {
            ContextFact::AvailableProviders(providers) => self.available_providers = providers,
            ContextFact::ToolVersion(version) => self.tool_version = Some(version),
            ContextFact::ConfiguredProvider(provider) => self.configured_provider = Some(provider),
            ContextFact::VmRunning(running) => self.vm_running = running,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ctx = CheckContext::new("/tmp/project");

        assert!(!ctx.vm_running());
        assert!(ctx.configured_provider().is_none());
        assert!(ctx.available_providers().is_empty());
        assert!(ctx.tool_version().is_none());
        assert_eq!(ctx.target_path(), Path::new("/tmp/project"));
    }

    #[test]
    fn test_ownership_table() {
        assert_eq!(ContextField::AvailableProviders.owner(), Category::Prerequisites);
        assert_eq!(ContextField::ToolVersion.owner(), Category::Prerequisites);
        assert_eq!(ContextField::ConfiguredProvider.owner(), Category::Installation);
        assert_eq!(ContextField::VmRunning.owner(), Category::VmState);
    }

    #[test]
    fn test_apply_fact() {
        let mut ctx = CheckContext::new(".");
        ctx.apply(ContextFact::VmRunning(true));
        ctx.apply(ContextFact::AvailableProviders(vec!["virtualbox".to_string()]));

        assert!(ctx.vm_running());
        assert_eq!(ctx.available_providers(), ["virtualbox".to_string()]);
    }
}
