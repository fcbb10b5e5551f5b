// Project config loader
// reason: `config` crate picks TOML/YAML/JSON by file extension
use config::{Config, File};
use std::path::Path;
use tracing::debug;

use vmdoctor_core::domain::ProjectConfig;
use vmdoctor_core::port::{ConfigError, ConfigLoader};

#[derive(Debug, Clone, Copy, Default)]
pub struct FileConfigLoader;

impl FileConfigLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ConfigLoader for FileConfigLoader {
    fn load(&self, path: &Path) -> Result<ProjectConfig, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let config = Config::builder()
            .add_source(File::from(path))
            .build()
            .and_then(|c| c.try_deserialize::<ProjectConfig>())
            .map_err(|e| ConfigError::Invalid(format!("{}: {}", path.display(), e)))?;

        debug!(
            path = %path.display(),
            ports = config.ports.len(),
            services = config.services.len(),
            "Project config loaded"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "vm.toml",
            r#"
services = ["postgresql"]
synced_folder = "/srv/app"

[vm]
provider = "virtualbox"
box = "ubuntu/jammy64"
memory_mb = 4096
cpus = 2

[[ports]]
guest = 80
host = 8080
"#,
        );

        let config = assert_ok!(FileConfigLoader::new().load(&path));

        assert_eq!(config.vm.provider.as_deref(), Some("virtualbox"));
        assert_eq!(config.vm.box_name.as_deref(), Some("ubuntu/jammy64"));
        assert_eq!(config.vm.memory_mb, Some(4096));
        assert_eq!(config.ports.len(), 1);
        assert_eq!(config.ports[0].host, 8080);
        assert_eq!(config.synced_folder(), "/srv/app");
        assert!(config.requires_service("postgresql"));
    }

    #[test]
    fn test_load_yaml_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "vm.yaml", "vm:\n  cpus: 4\nservices:\n  - redis\n");

        let config = FileConfigLoader::new().load(&path).unwrap();

        assert_eq!(config.vm.cpus, Some(4));
        assert!(config.requires_service("redis"));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = FileConfigLoader::new().load(&dir.path().join("vm.toml"));

        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "vm.toml", "[vm\nprovider = ");

        let error = assert_err!(FileConfigLoader::new().load(&path));

        assert!(matches!(error, ConfigError::Invalid(_)));
        assert!(error.to_string().contains("vm.toml"));
    }
}
