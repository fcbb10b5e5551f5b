// Crate-wide error type. Check code returns it; the guard turns it into a `fail` result.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid phase plan: {0}")]
    Plan(#[from] crate::domain::PlanError),

    #[error("Probe failed: {0}")]
    Probe(#[from] crate::port::ProbeError),

    #[error("Project config: {0}")]
    Config(#[from] crate::port::ConfigError),

    #[error("Latest version lookup: {0}")]
    Version(#[from] crate::port::VersionError),

    /// Target path missing or not a directory; raised before any check runs
    #[error("Invalid target path: {0}")]
    InvalidTarget(String),

    /// Invariant broken inside a check
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
