// Check result model
// Results are immutable once built; only the aggregator and reporter consume them

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome severity of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Skip,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Fail => "fail",
            CheckStatus::Warn => "warn",
            CheckStatus::Skip => "skip",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check category, one per phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Prerequisites,
    Updates,
    Installation,
    Configuration,
    VmState,
    VmHealth,
    Network,
}

impl Category {
    /// Human-readable heading used by the text reporter
    pub fn title(&self) -> &'static str {
        match self {
            Category::Prerequisites => "Prerequisites",
            Category::Updates => "Updates",
            Category::Installation => "Installation",
            Category::Configuration => "Configuration",
            Category::VmState => "VM State",
            Category::VmHealth => "VM Health",
            Category::Network => "Network",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Result of one logical check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub category: Category,
    pub status: CheckStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CheckResult {
    fn new(
        name: impl Into<String>,
        category: Category,
        status: CheckStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            status,
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    pub fn pass(name: impl Into<String>, category: Category, message: impl Into<String>) -> Self {
        Self::new(name, category, CheckStatus::Pass, message)
    }

    pub fn fail(name: impl Into<String>, category: Category, message: impl Into<String>) -> Self {
        Self::new(name, category, CheckStatus::Fail, message)
    }

    pub fn warn(name: impl Into<String>, category: Category, message: impl Into<String>) -> Self {
        Self::new(name, category, CheckStatus::Warn, message)
    }

    pub fn skip(name: impl Into<String>, category: Category, message: impl Into<String>) -> Self {
        Self::new(name, category, CheckStatus::Skip, message)
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
