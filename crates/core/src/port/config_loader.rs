// Project config loader port

use crate::domain::ProjectConfig;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Loads and parses the project config. Errors on missing or invalid files.
pub trait ConfigLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<ProjectConfig, ConfigError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Mock ConfigLoader returning a fixed config or error regardless of path
    #[derive(Clone)]
    pub struct StaticConfigLoader {
        answer: Result<ProjectConfig, ConfigError>,
        loads: Arc<AtomicUsize>,
    }

    impl StaticConfigLoader {
        fn answering(answer: Result<ProjectConfig, ConfigError>) -> Self {
            Self {
                answer,
                loads: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn new(config: ProjectConfig) -> Self {
            Self::answering(Ok(config))
        }

        pub fn missing() -> Self {
            Self::answering(Err(ConfigError::NotFound("vm.toml".to_string())))
        }

        pub fn invalid(reason: &str) -> Self {
            Self::answering(Err(ConfigError::Invalid(reason.to_string())))
        }

        /// Number of times the file was "read"
        pub fn load_count(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    impl ConfigLoader for StaticConfigLoader {
        fn load(&self, _path: &Path) -> Result<ProjectConfig, ConfigError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }
}
