//! Network - ssh reachability and forwarded ports

use super::probe_failure;
use crate::application::constants::PORT_CONNECT_TIMEOUT;
use crate::application::env::CheckEnv;
use crate::application::scheduler::{Check, CheckOutput};
use crate::domain::{Category, CheckContext, CheckResult, PortForward};
use async_trait::async_trait;
use futures::future::join_all;

const CATEGORY: Category = Category::Network;

/// `HostName` and `Port` from `vagrant ssh-config` output
pub fn parse_ssh_endpoint(stdout: &str) -> Option<(String, u16)> {
    let mut host = None;
    let mut port = None;

    for line in stdout.lines() {
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next()) {
            (Some("HostName"), Some(value)) => host = Some(value.to_string()),
            (Some("Port"), Some(value)) => port = value.parse().ok(),
            _ => {}
        }
    }

    Some((host?, port.unwrap_or(22)))
}

/// `vagrant ssh-config`
pub struct SshConfigCheck;

impl SshConfigCheck {
    pub const NAME: &'static str = "SSH configuration";
}

#[async_trait]
impl Check for SshConfigCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, _ctx: &CheckContext, env: &CheckEnv) -> crate::Result<CheckOutput> {
        let output = match env.tool(&["ssh-config"]).await {
            Ok(output) => output,
            Err(e) => return Ok(probe_failure(Self::NAME, CATEGORY, "`vagrant ssh-config`", &e).into()),
        };

        if !output.success() {
            return Ok(CheckResult::fail(Self::NAME, CATEGORY, "`vagrant ssh-config` failed")
                .with_details(output.combined())
                .with_suggestion("Run `vagrant reload` to regenerate the ssh configuration")
                .into());
        }

        let result = match parse_ssh_endpoint(&output.stdout) {
            Some((host, port)) => {
                CheckResult::pass(Self::NAME, CATEGORY, format!("ssh via {}:{}", host, port))
            }
            None => CheckResult::warn(Self::NAME, CATEGORY, "ssh-config has no HostName entry")
                .with_details(output.stdout.trim().to_string()),
        };
        Ok(result.into())
    }
}

/// Configured host ports accept TCP connections on 127.0.0.1
pub struct ForwardedPortsCheck;

impl ForwardedPortsCheck {
    pub const NAME: &'static str = "Forwarded ports";
}

fn describe(ports: &[&PortForward]) -> String {
    ports
        .iter()
        .map(|p| format!("{} -> {}", p.host, p.guest))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl Check for ForwardedPortsCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, ctx: &CheckContext, env: &CheckEnv) -> crate::Result<CheckOutput> {
        let ports = env.load_config(ctx).await.map(|config| config.ports).unwrap_or_default();
        if ports.is_empty() {
            return Ok(CheckResult::skip(Self::NAME, CATEGORY, "No forwarded ports configured").into());
        }

        let open = join_all(
            ports
                .iter()
                .map(|p| env.host().port_open(p.host, PORT_CONNECT_TIMEOUT)),
        )
        .await;

        let closed: Vec<&PortForward> = ports
            .iter()
            .zip(open)
            .filter(|(_, open)| !open)
            .map(|(port, _)| port)
            .collect();

        let result = if closed.is_empty() {
            CheckResult::pass(
                Self::NAME,
                CATEGORY,
                format!("{} forwarded port(s) reachable", ports.len()),
            )
        } else {
            CheckResult::warn(
                Self::NAME,
                CATEGORY,
                format!("{} of {} forwarded port(s) not accepting connections", closed.len(), ports.len()),
            )
            .with_details(describe(&closed))
            .with_suggestion("Start the guest service or check for a host port conflict")
        };
        Ok(result.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::checks::test_support::run;
    use crate::application::env::mocks::MockEnv;
    use crate::domain::{CheckStatus, ProjectConfig};
    use crate::port::command_runner::mocks::ScriptedRunner;
    use crate::port::config_loader::mocks::StaticConfigLoader;
    use crate::port::host_probe::mocks::MockHostProbe;

    const SSH_CONFIG: &str = "Host default\n  HostName 127.0.0.1\n  User vagrant\n  Port 2222\n  UserKnownHostsFile /dev/null\n";

    #[test]
    fn test_parse_ssh_endpoint() {
        assert_eq!(parse_ssh_endpoint(SSH_CONFIG), Some(("127.0.0.1".to_string(), 2222)));
        assert_eq!(parse_ssh_endpoint("Host default\n  User vagrant\n"), None);
    }

    #[tokio::test]
    async fn test_ssh_config() {
        let ok = MockEnv::new(ScriptedRunner::new().on("vagrant", &["ssh-config"], 0, SSH_CONFIG)).build();
        let garbled = MockEnv::new(ScriptedRunner::new().on("vagrant", &["ssh-config"], 0, "Host default\n")).build();
        let ctx = CheckContext::new(".");

        assert_eq!(run(&SshConfigCheck, &ctx, &ok).await.results[0].status, CheckStatus::Pass);
        assert_eq!(run(&SshConfigCheck, &ctx, &garbled).await.results[0].status, CheckStatus::Warn);
    }

    #[tokio::test]
    async fn test_no_ports_skips_without_connecting() {
        let host = MockHostProbe::healthy();
        let env = MockEnv::new(ScriptedRunner::new()).with_host(host.clone()).build();

        let output = run(&ForwardedPortsCheck, &CheckContext::new("."), &env).await;

        assert_eq!(output.results[0].status, CheckStatus::Skip);
        assert_eq!(host.port_checks(), 0);
    }

    #[tokio::test]
    async fn test_closed_port_warns() {
        let host = MockHostProbe::healthy().with_open_port(8080);
        let config = ProjectConfig {
            ports: vec![
                PortForward { guest: 80, host: 8080 },
                PortForward { guest: 5432, host: 15432 },
            ],
            ..ProjectConfig::default()
        };
        let env = MockEnv::new(ScriptedRunner::new())
            .with_host(host.clone())
            .with_config(StaticConfigLoader::new(config))
            .build();

        let output = run(&ForwardedPortsCheck, &CheckContext::new("."), &env).await;

        assert_eq!(output.results[0].status, CheckStatus::Warn);
        assert_eq!(output.results[0].details.as_deref(), Some("15432 -> 5432"));
        assert_eq!(host.port_checks(), 2);
    }
}
