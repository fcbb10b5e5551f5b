// Port Layer - Interfaces for external dependencies

pub mod command_runner;
pub mod config_loader;
pub mod deadline;
pub mod host_probe;
pub mod version_source;

// Re-exports
pub use command_runner::{CommandOutput, CommandRequest, CommandRunner, ProbeError};
pub use config_loader::{ConfigError, ConfigLoader};
pub use deadline::{cancel_channel, CancelSender, CancelToken, Deadline};
pub use host_probe::{HostMetrics, HostProbe};
pub use version_source::{VersionError, VersionSource};
