// Domain Layer - Pure diagnostic model

pub mod check;
pub mod config;
pub mod context;
pub mod error;
pub mod provider;
pub mod report;
pub mod version;

// Re-exports
pub use check::{Category, CheckResult, CheckStatus};
pub use config::{PortForward, ProjectConfig, VmSettings};
pub use context::{CheckContext, ContextFact, ContextField};
pub use error::PlanError;
pub use provider::{Platform, ProviderProbe, SuccessRule};
pub use report::{Report, Summary};
pub use version::Version;
