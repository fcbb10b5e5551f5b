//! VM State - owns `vm_running`

use super::probe_failure;
use crate::application::env::CheckEnv;
use crate::application::scheduler::{Check, CheckOutput};
use crate::domain::{Category, CheckContext, CheckResult, ContextFact, ContextField};
use async_trait::async_trait;

const CATEGORY: Category = Category::VmState;

/// State of the first machine in `status --machine-readable` output
///
/// Records are `timestamp,target,type,data...`; the wanted one has type `state`.
pub fn parse_machine_state(stdout: &str) -> Option<&str> {
    stdout.lines().find_map(|line| {
        let parts: Vec<&str> = line.trim().split(',').collect();
        match parts.as_slice() {
            [_, _, "state", state, ..] if !state.is_empty() => Some(*state),
            _ => None,
        }
    })
}

fn state_suggestion(state: &str) -> &'static str {
    match state {
        "saved" | "paused" => "Run `vagrant resume` or `vagrant up`",
        "aborted" | "gurumeditation" => "Run `vagrant reload` to restart the VM cleanly",
        _ => "Run `vagrant up`",
    }
}

/// `vagrant status --machine-readable`
pub struct VmStatusCheck;

impl VmStatusCheck {
    pub const NAME: &'static str = "VM status";
}

#[async_trait]
impl Check for VmStatusCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn writes(&self) -> Option<ContextField> {
        Some(ContextField::VmRunning)
    }

    async fn run(&self, _ctx: &CheckContext, env: &CheckEnv) -> crate::Result<CheckOutput> {
        let not_running = ContextFact::VmRunning(false);

        let output = match env.tool(&["status", "--machine-readable"]).await {
            Ok(output) => output,
            Err(e) => {
                let result = probe_failure(Self::NAME, CATEGORY, "`vagrant status`", &e);
                return Ok(CheckOutput::single(result).with_fact(not_running));
            }
        };

        if !output.success() {
            let result = CheckResult::fail(
                Self::NAME,
                CATEGORY,
                format!("`vagrant status` exited with {:?}", output.exit_code),
            )
            .with_details(output.combined())
            .with_suggestion("Check the Vagrantfile for errors with `vagrant validate`");
            return Ok(CheckOutput::single(result).with_fact(not_running));
        }

        let (result, running) = match parse_machine_state(&output.stdout) {
            Some("running") => (CheckResult::pass(Self::NAME, CATEGORY, "VM is running"), true),
            Some(state) => (
                CheckResult::warn(Self::NAME, CATEGORY, format!("VM is {}", state.replace('_', " ")))
                    .with_suggestion(state_suggestion(state)),
                false,
            ),
            None => (
                CheckResult::warn(Self::NAME, CATEGORY, "Could not determine VM state")
                    .with_details(output.stdout.trim().to_string()),
                false,
            ),
        };

        Ok(CheckOutput::single(result).with_fact(ContextFact::VmRunning(running)))
    }
}
