// Host resource probe port
// reason: async-trait needed for adapters doing blocking sysinfo/network work
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Host resource facts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostMetrics {
    /// Free space on the volume holding the target path; None if no volume matched
    pub disk_available_bytes: Option<u64>,
    pub memory_total_bytes: u64,
    pub memory_available_bytes: u64,
    pub cpu_count: usize,
}

/// Host probe port for prerequisite and allocation checks
#[async_trait]
pub trait HostProbe: Send + Sync {
    /// Collect resource metrics for the volume containing `path`
    async fn metrics(&self, path: &Path) -> HostMetrics;

    /// Whether something accepts TCP connections on 127.0.0.1:`port`
    async fn port_open(&self, port: u16, timeout: Duration) -> bool;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    pub const GIB: u64 = 1024 * 1024 * 1024;

    /// Mock HostProbe for testing
    #[derive(Clone)]
    pub struct MockHostProbe {
        metrics: Arc<Mutex<HostMetrics>>,
        open_ports: Arc<Mutex<HashSet<u16>>>,
        port_checks: Arc<Mutex<usize>>,
    }

    impl MockHostProbe {
        /// A comfortable host: 100 GiB free disk, 16 GiB RAM (8 available), 8 cores
        pub fn healthy() -> Self {
            Self::new(HostMetrics {
                disk_available_bytes: Some(100 * GIB),
                memory_total_bytes: 16 * GIB,
                memory_available_bytes: 8 * GIB,
                cpu_count: 8,
            })
        }

        pub fn new(metrics: HostMetrics) -> Self {
            Self {
                metrics: Arc::new(Mutex::new(metrics)),
                open_ports: Arc::new(Mutex::new(HashSet::new())),
                port_checks: Arc::new(Mutex::new(0)),
            }
        }

        pub fn with_open_port(self, port: u16) -> Self {
            self.open_ports.lock().unwrap().insert(port);
            self
        }

        pub fn set_disk_available(&self, bytes: Option<u64>) {
            self.metrics.lock().unwrap().disk_available_bytes = bytes;
        }

        pub fn set_memory(&self, total: u64, available: u64) {
            let mut metrics = self.metrics.lock().unwrap();
            metrics.memory_total_bytes = total;
            metrics.memory_available_bytes = available;
        }

        pub fn port_checks(&self) -> usize {
            *self.port_checks.lock().unwrap()
        }
    }

    #[async_trait]
    impl HostProbe for MockHostProbe {
        async fn metrics(&self, _path: &Path) -> HostMetrics {
            self.metrics.lock().unwrap().clone()
        }

        async fn port_open(&self, port: u16, _timeout: Duration) -> bool {
            *self.port_checks.lock().unwrap() += 1;
            self.open_ports.lock().unwrap().contains(&port)
        }
    }
}
