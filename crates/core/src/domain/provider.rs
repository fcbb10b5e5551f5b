// Virtualization provider probes (static table)

use std::fmt;

/// Host operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl Platform {
    /// Platform this binary was built for
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Other
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Linux => "linux",
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
            Platform::Other => "other",
        };
        f.write_str(name)
    }
}

/// How a completed probe is judged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessRule {
    /// Exit code 0
    ExitZero,
    /// Exit code 0 and stdout contains the marker
    ExitZeroAndContains(&'static str),
}

impl SuccessRule {
    pub fn is_satisfied(&self, exit_code: Option<i32>, stdout: &str) -> bool {
        match self {
            SuccessRule::ExitZero => exit_code == Some(0),
            SuccessRule::ExitZeroAndContains(marker) => {
                exit_code == Some(0) && stdout.contains(marker)
            }
        }
    }
}

/// One provider availability probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProbe {
    /// Provider name as Vagrant knows it (`--provider=<name>`)
    pub name: &'static str,
    pub display_name: &'static str,
    pub program: &'static str,
    pub args: &'static [&'static str],
    pub platform: Option<Platform>,
    pub success: SuccessRule,
}

impl ProviderProbe {
    pub fn applies_to(&self, platform: Platform) -> bool {
        self.platform.map_or(true, |p| p == platform)
    }
}

/// Built-in provider probes
pub const PROVIDER_PROBES: &[ProviderProbe] = &[
    ProviderProbe {
        name: "virtualbox",
        display_name: "VirtualBox",
        program: "VBoxManage",
        args: &["--version"],
        platform: None,
        success: SuccessRule::ExitZero,
    },
    ProviderProbe {
        name: "vmware_desktop",
        display_name: "VMware",
        program: "vmrun",
        args: &["list"],
        platform: None,
        success: SuccessRule::ExitZero,
    },
    ProviderProbe {
        name: "libvirt",
        display_name: "libvirt",
        program: "virsh",
        args: &["--version"],
        platform: Some(Platform::Linux),
        success: SuccessRule::ExitZero,
    },
    ProviderProbe {
        name: "parallels",
        display_name: "Parallels",
        program: "prlctl",
        args: &["--version"],
        platform: Some(Platform::MacOs),
        success: SuccessRule::ExitZero,
    },
    ProviderProbe {
        name: "hyperv",
        display_name: "Hyper-V",
        program: "powershell",
        args: &["-NoProfile", "-Command", "Get-Service vmms"],
        platform: Some(Platform::Windows),
        success: SuccessRule::ExitZeroAndContains("Running"),
    },
    ProviderProbe {
        name: "docker",
        display_name: "Docker",
        program: "docker",
        args: &["version"],
        platform: None,
        success: SuccessRule::ExitZero,
    },
];

/// Probes applicable to `platform`, in table order
pub fn probes_for(platform: Platform) -> Vec<ProviderProbe> {
    PROVIDER_PROBES
        .iter()
        .filter(|probe| probe.applies_to(platform))
        .cloned()
        .collect()
}

/// Display name for a provider, falling back to the raw name
pub fn display_name(name: &str) -> &str {
    PROVIDER_PROBES
        .iter()
        .find(|probe| probe.name == name)
        .map(|probe| probe.display_name)
        .unwrap_or(name)
}
