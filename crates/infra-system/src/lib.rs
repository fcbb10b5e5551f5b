// vmdoctor Infrastructure - System Adapters
// Implements: CommandRunner, HostProbe, VersionSource, ConfigLoader

pub mod config_loader_impl;
pub mod host_probe_impl;
pub mod subprocess_runner;
pub mod upstream_client;

pub use config_loader_impl::FileConfigLoader;
pub use host_probe_impl::SystemHostProbe;
pub use subprocess_runner::SubprocessRunner;
pub use upstream_client::CheckpointClient;
