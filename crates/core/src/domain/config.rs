// Project environment file model (vm.toml / vm.yaml / vm.json)

use serde::{Deserialize, Serialize};

/// Default guest mount point for the project folder
pub const DEFAULT_SYNCED_FOLDER: &str = "/vagrant";

/// Default project config file name, resolved against the target path
pub const DEFAULT_CONFIG_FILE: &str = "vm.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmSettings {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default, rename = "box")]
    pub box_name: Option<String>,
    #[serde(default)]
    pub memory_mb: Option<u64>,
    #[serde(default)]
    pub cpus: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortForward {
    pub guest: u16,
    pub host: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub vm: VmSettings,
    #[serde(default)]
    pub ports: Vec<PortForward>,
    /// Guest services the project requires
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub synced_folder: Option<String>,
}

impl ProjectConfig {
    pub fn synced_folder(&self) -> &str {
        self.synced_folder.as_deref().unwrap_or(DEFAULT_SYNCED_FOLDER)
    }

    /// Whether `service` is declared (and therefore required)
    pub fn requires_service(&self, service: &str) -> bool {
        self.services.iter().any(|s| s.eq_ignore_ascii_case(service))
    }
}
