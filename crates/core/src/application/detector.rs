//! Provider Detector - concurrent availability probing
//!
//! Every applicable probe is launched at once and raced against the same
//! per-probe timeout, so detection costs roughly the slowest probe (capped at
//! the timeout) rather than the sum of all probes.

use crate::application::env::CheckEnv;
use crate::domain::provider::{probes_for, ProviderProbe};
use crate::domain::Platform;
use crate::port::CommandRequest;
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, info};

/// Outcome of one provider probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub probe: ProviderProbe,
    pub available: bool,
    /// Why the provider is unavailable, when it is
    pub reason: Option<String>,
}

pub struct ProviderDetector {
    probes: Vec<ProviderProbe>,
    timeout: Duration,
}

impl ProviderDetector {
    pub fn new(probes: Vec<ProviderProbe>, timeout: Duration) -> Self {
        Self { probes, timeout }
    }

    /// Built-in probes applicable to `platform`
    pub fn for_platform(platform: Platform, timeout: Duration) -> Self {
        Self::new(probes_for(platform), timeout)
    }

    /// Probe every provider concurrently and collect all outcomes, in table order
    ///
    /// Never fails: spawn errors, timeouts and unexpected output all mean "unavailable".
    pub async fn probe_all(&self, env: &CheckEnv) -> Vec<ProbeOutcome> {
        let probes = self.probes.iter().map(|probe| self.probe_one(env, probe));
        let outcomes = join_all(probes).await;

        info!(
            probed = outcomes.len(),
            available = outcomes.iter().filter(|o| o.available).count(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Provider detection completed"
        );

        outcomes
    }

    /// Confirmed-available providers
    pub async fn detect(&self, env: &CheckEnv) -> Vec<ProviderProbe> {
        self.probe_all(env)
            .await
            .into_iter()
            .filter(|outcome| outcome.available)
            .map(|outcome| outcome.probe)
            .collect()
    }

    async fn probe_one(&self, env: &CheckEnv, probe: &ProviderProbe) -> ProbeOutcome {
        let request = CommandRequest::new(probe.program, probe.args.iter().copied());

        let (available, reason) = match env.probe(&request, self.timeout).await {
            Ok(output) if probe.success.is_satisfied(output.exit_code, &output.stdout) => {
                (true, None)
            }
            Ok(output) => (
                false,
                Some(format!("`{}` exited with {:?}", request, output.exit_code)),
            ),
            Err(e) => (false, Some(e.to_string())),
        };

        debug!(
            provider = probe.name,
            available,
            reason = ?reason,
            "Provider probed"
        );

        ProbeOutcome {
            probe: probe.clone(),
            available,
            reason,
        }
    }
}
