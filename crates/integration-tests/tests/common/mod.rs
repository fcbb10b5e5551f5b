//! Shared fixtures: a healthy Vagrant project and a scripted host that answers for it

#![allow(dead_code)]

use std::path::Path;
use tempfile::TempDir;
use vmdoctor_core::domain::{CheckResult, PortForward, ProjectConfig, Report, VmSettings};
use vmdoctor_core::port::command_runner::mocks::ScriptedRunner;

pub const STATUS_RUNNING: &str = "\
1700000000,default,metadata,provider,virtualbox
1700000000,default,provider-name,virtualbox
1700000000,default,state,running
1700000000,default,state-human-short,running
";

pub const STATUS_POWEROFF: &str = "\
1700000000,default,provider-name,virtualbox
1700000000,default,state,poweroff
";

pub const SSH_CONFIG: &str = "\
Host default
  HostName 127.0.0.1
  User vagrant
  Port 2222
  IdentityFile /home/dev/project/.vagrant/machines/default/virtualbox/private_key
";

pub const PLUGINS: &str = "\
vagrant-vbguest (0.32.0, global)
vagrant-hostmanager (1.8.9, global)
  - Version Constraint: > 0
";

/// Every guest fact in one ssh transcript, with login banner noise around it
pub const GUEST_HEALTHY: &str = "\
Welcome to Ubuntu 22.04.3 LTS (GNU/Linux 5.15.0-88-generic x86_64)
@@vmdoctor:disk@@
/dev/sda1  40581564 17045300 23519880  43% /
@@vmdoctor:memory@@
3931 2875
@@vmdoctor:logs@@
212\t/var/log
@@vmdoctor:synced@@
present
@@vmdoctor:dns@@
ok
@@vmdoctor:service:docker@@
active
@@vmdoctor:service:postgresql@@
active
@@vmdoctor:service:redis@@
absent
Connection to 127.0.0.1 closed.
";

/// Runner answering every probe a healthy, running project triggers
pub fn healthy_runner() -> ScriptedRunner {
    ScriptedRunner::new()
        .on("vagrant", &["--version"], 0, "Vagrant 2.4.1\n")
        .on("vagrant", &["plugin", "list"], 0, PLUGINS)
        .on("vagrant", &["status"], 0, STATUS_RUNNING)
        .on("vagrant", &["ssh-config"], 0, SSH_CONFIG)
        .on("vagrant", &["ssh"], 0, GUEST_HEALTHY)
        .on("VBoxManage", &["--version"], 0, "7.0.12r159484\n")
}

pub fn healthy_config() -> ProjectConfig {
    ProjectConfig {
        vm: VmSettings {
            provider: Some("virtualbox".into()),
            box_name: Some("ubuntu/jammy64".into()),
            memory_mb: Some(4096),
            cpus: Some(2),
        },
        ports: vec![PortForward {
            guest: 5432,
            host: 15432,
        }],
        services: vec!["docker".into()],
        synced_folder: None,
    }
}

/// Temp project directory containing a Vagrantfile
pub fn project_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_vagrantfile(dir.path());
    dir
}

pub fn write_vagrantfile(dir: &Path) {
    std::fs::write(
        dir.join("Vagrantfile"),
        "Vagrant.configure(\"2\") do |config|\n  config.vm.box = \"ubuntu/jammy64\"\nend\n",
    )
    .unwrap();
}

pub fn find<'a>(report: &'a Report, name: &str) -> &'a CheckResult {
    report
        .results
        .iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("no result named {:?} in {:#?}", name, report.results))
}
