// Upstream version port
// One bounded outbound lookup of the latest released tool version

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Version lookup failed: {0}")]
    Request(String),

    #[error("Unexpected version response: {0}")]
    Parse(String),
}

#[async_trait]
pub trait VersionSource: Send + Sync {
    /// Latest released version string, e.g. "2.4.1"
    async fn latest_version(&self) -> Result<String, VersionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock VersionSource returning a fixed answer
    #[derive(Clone)]
    pub struct FixedVersionSource {
        answer: Result<String, VersionError>,
        calls: Arc<Mutex<usize>>,
    }

    impl FixedVersionSource {
        pub fn latest(version: &str) -> Self {
            Self {
                answer: Ok(version.to_string()),
                calls: Arc::new(Mutex::new(0)),
            }
        }

        pub fn offline() -> Self {
            Self {
                answer: Err(VersionError::Request("network unreachable".to_string())),
                calls: Arc::new(Mutex::new(0)),
            }
        }

        pub fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl VersionSource for FixedVersionSource {
        async fn latest_version(&self) -> Result<String, VersionError> {
            *self.calls.lock().unwrap() += 1;
            self.answer.clone()
        }
    }
}
