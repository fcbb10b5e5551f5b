// Diagnostic constants (no magic values)
use std::time::Duration;

/// Default VM tool binary
pub const DEFAULT_TOOL: &str = "vagrant";

/// Default timeout for local tool probes (`vagrant --version`, `vagrant status`)
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Per-probe timeout for provider detection
pub const DEFAULT_DETECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for the batched `vagrant ssh` round trip
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the upstream "latest version" lookup
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for each forwarded-port TCP connect
pub const PORT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Oldest tool version that does not produce a warning
pub const MIN_TOOL_VERSION: &str = "2.2.0";

const GIB: u64 = 1024 * 1024 * 1024;

/// Host free disk below this fails
pub const HOST_DISK_FAIL_BYTES: u64 = GIB;

/// Host free disk below this warns
pub const HOST_DISK_WARN_BYTES: u64 = 5 * GIB;

/// Host available memory below this fails
pub const HOST_MEMORY_FAIL_BYTES: u64 = GIB;

/// Host available memory below this warns
pub const HOST_MEMORY_WARN_BYTES: u64 = 2 * GIB;

/// VM memory allocation above this share of host RAM warns (percent)
pub const MEMORY_ALLOCATION_WARN_PERCENT: u64 = 75;

/// Guest root filesystem usage at or above this fails (percent)
pub const GUEST_DISK_FAIL_PERCENT: u64 = 95;

/// Guest root filesystem usage at or above this warns (percent)
pub const GUEST_DISK_WARN_PERCENT: u64 = 80;

/// Guest available memory below this share of total warns (percent)
pub const GUEST_MEMORY_WARN_PERCENT: u64 = 10;

/// Guest /var/log above this size warns (MiB)
pub const GUEST_LOG_WARN_MB: u64 = 1024;
