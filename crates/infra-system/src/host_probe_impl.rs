// Host probe implementation
// reason: sysinfo for cross-platform disk/memory/CPU facts
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sysinfo::{Disks, System};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use vmdoctor_core::port::{HostMetrics, HostProbe};

/// Host probe backed by sysinfo and loopback TCP connects
pub struct SystemHostProbe {
    system: Arc<Mutex<System>>,
}

impl SystemHostProbe {
    pub fn new() -> Self {
        Self {
            system: Arc::new(Mutex::new(System::new())),
        }
    }
}

impl Default for SystemHostProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Free bytes on the disk with the longest mount point that prefixes `path`
fn disk_available_for(path: &Path) -> Option<u64> {
    let path: PathBuf = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let disks = Disks::new_with_refreshed_list();

    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}

#[async_trait]
impl HostProbe for SystemHostProbe {
    async fn metrics(&self, path: &Path) -> HostMetrics {
        let system = Arc::clone(&self.system);
        let path = path.to_path_buf();

        // sysinfo refreshes are blocking syscalls
        let collect = move || {
            let (memory_total_bytes, memory_available_bytes, cpu_count) = {
                let mut sys = system.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                sys.refresh_memory();
                sys.refresh_cpu();
                (sys.total_memory(), sys.available_memory(), sys.cpus().len())
            };

            HostMetrics {
                disk_available_bytes: disk_available_for(&path),
                memory_total_bytes,
                memory_available_bytes,
                cpu_count,
            }
        };

        let metrics = match tokio::task::spawn_blocking(collect).await {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!(error = %e, "Host metrics collection aborted");
                HostMetrics {
                    disk_available_bytes: None,
                    memory_total_bytes: 0,
                    memory_available_bytes: 0,
                    cpu_count: 0,
                }
            }
        };

        debug!(
            disk_available = ?metrics.disk_available_bytes,
            mem_total = metrics.memory_total_bytes,
            mem_available = metrics.memory_available_bytes,
            cpus = metrics.cpu_count,
            "Host metrics collected"
        );

        metrics
    }

    async fn port_open(&self, port: u16, timeout: Duration) -> bool {
        let open = matches!(
            tokio::time::timeout(timeout, TcpStream::connect(("127.0.0.1", port))).await,
            Ok(Ok(_))
        );
        debug!(port, open, "Forwarded port probed");
        open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_metrics_are_populated() {
        let probe = SystemHostProbe::new();
        let dir = tempfile::tempdir().unwrap();

        let metrics = probe.metrics(dir.path()).await;

        assert!(metrics.memory_total_bytes > 0);
        assert!(metrics.memory_available_bytes <= metrics.memory_total_bytes);
        assert!(metrics.cpu_count > 0);
    }

    #[tokio::test]
    async fn test_port_open_detects_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let probe = SystemHostProbe::new();

        assert!(probe.port_open(port, Duration::from_secs(1)).await);

        drop(listener);
        assert!(!probe.port_open(port, Duration::from_secs(1)).await);
    }
}
