// Doctor - one diagnostic run over the default phase plan

use crate::application::checks::configuration::{BoxCheck, ConfigFileCheck, CpuCheck, MemoryCheck};
use crate::application::checks::installation::{
    ConfiguredProviderCheck, ProviderAvailableCheck, VagrantfileCheck,
};
use crate::application::checks::network::{ForwardedPortsCheck, SshConfigCheck};
use crate::application::checks::prerequisites::{
    HostDiskCheck, HostMemoryCheck, ProvidersCheck, ToolInstalledCheck,
};
use crate::application::checks::updates::{PluginsCheck, UpToDateCheck};
use crate::application::checks::vm_health::GuestHealthCheck;
use crate::application::checks::vm_state::VmStatusCheck;
use crate::application::env::CheckEnv;
use crate::application::scheduler::{Phase, PhaseObserver, PhasePlan, Precondition, Scheduler};
use crate::domain::{Category, CheckContext, PlanError, Report};
use crate::error::{AppError, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::info;

/// Built-in phases in run order
pub fn default_plan() -> std::result::Result<PhasePlan, PlanError> {
    PhasePlan::new(vec![
        Phase::parallel(Category::Prerequisites)
            .check(ToolInstalledCheck)
            .check(ProvidersCheck)
            .check(HostDiskCheck)
            .check(HostMemoryCheck),
        Phase::parallel(Category::Updates)
            .when(Precondition::ToolInstalled)
            .check(UpToDateCheck)
            .check(PluginsCheck),
        Phase::sequential(Category::Installation)
            .check(VagrantfileCheck)
            .check(ConfiguredProviderCheck)
            .check(ProviderAvailableCheck),
        Phase::parallel(Category::Configuration)
            .check(ConfigFileCheck)
            .check(BoxCheck)
            .check(MemoryCheck)
            .check(CpuCheck),
        Phase::sequential(Category::VmState)
            .when(Precondition::ToolInstalled)
            .check(VmStatusCheck),
        Phase::parallel(Category::VmHealth)
            .when(Precondition::VmRunning)
            .check(GuestHealthCheck),
        Phase::parallel(Category::Network)
            .when(Precondition::VmRunning)
            .check(SshConfigCheck)
            .check(ForwardedPortsCheck),
    ])
}

/// Diagnostic facade: validates the target, runs the plan, aggregates
pub struct Doctor {
    env: CheckEnv,
    scheduler: Scheduler,
}

impl Doctor {
    pub fn new(env: CheckEnv) -> Result<Self> {
        Ok(Self::with_plan(env, default_plan()?))
    }

    pub fn with_plan(env: CheckEnv, plan: PhasePlan) -> Self {
        Self {
            env,
            scheduler: Scheduler::new(plan),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PhaseObserver>) -> Self {
        self.scheduler = self.scheduler.with_observer(observer);
        self
    }

    pub fn env(&self) -> &CheckEnv {
        &self.env
    }

    /// Run every phase against `target`
    ///
    /// # Errors
    /// AppError::InvalidTarget if `target` is not a readable directory. Check
    /// failures never surface here; they are results in the report.
    pub async fn run(&self, target: impl AsRef<Path>) -> Result<Report> {
        self.run_with_context(target).await.map(|(report, _)| report)
    }

    /// Like [`Doctor::run`], also returning the final context
    pub async fn run_with_context(&self, target: impl AsRef<Path>) -> Result<(Report, CheckContext)> {
        let target = target.as_ref();
        let metadata = tokio::fs::metadata(target)
            .await
            .map_err(|e| AppError::InvalidTarget(format!("{}: {}", target.display(), e)))?;
        if !metadata.is_dir() {
            return Err(AppError::InvalidTarget(format!(
                "{} is not a directory",
                target.display()
            )));
        }

        let started = Instant::now();
        self.env.forget_config().await;
        let mut ctx = CheckContext::new(target);
        let results = self.scheduler.run(&mut ctx, &self.env).await;
        let report = Report::aggregate(results);

        info!(
            target = %target.display(),
            passed = report.summary.passed,
            failed = report.summary.failed,
            warnings = report.summary.warnings,
            skipped = report.summary.skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Diagnostic run completed"
        );

        Ok((report, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::env::mocks::MockEnv;
    use crate::domain::CheckStatus;
    use crate::port::command_runner::mocks::ScriptedRunner;
    use tokio_test::assert_ok;

    #[test]
    fn test_default_plan_is_valid_and_ordered() {
        let plan = assert_ok!(default_plan());
        let order: Vec<Category> = plan.phases().iter().map(|p| p.category()).collect();

        assert_eq!(
            order,
            vec![
                Category::Prerequisites,
                Category::Updates,
                Category::Installation,
                Category::Configuration,
                Category::VmState,
                Category::VmHealth,
                Category::Network,
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_target_is_rejected_before_any_probe() {
        let mock = MockEnv::new(ScriptedRunner::new());
        let doctor = Doctor::new(mock.build()).unwrap();

        let result = doctor.run("/definitely/not/a/real/path").await;

        assert!(matches!(result, Err(AppError::InvalidTarget(_))));
        assert_eq!(mock.runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_tool_still_completes_run() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockEnv::new(ScriptedRunner::new());
        let doctor = Doctor::new(mock.build()).unwrap();

        let (report, ctx) = doctor.run_with_context(dir.path()).await.unwrap();

        let installed = report.results.iter().find(|r| r.name == "Vagrant installed").unwrap();
        assert_eq!(installed.status, CheckStatus::Fail);
        assert!(ctx.tool_version().is_none());
        assert!(!ctx.vm_running());
        for name in ["Updates checks", "VM State checks", "VM Health checks", "Network checks"] {
            let skipped = report.results.iter().find(|r| r.name == name).unwrap();
            assert_eq!(skipped.status, CheckStatus::Skip);
        }
        assert_eq!(mock.runner.calls_to("vagrant", "ssh"), 0);
        assert_eq!(report.exit_code(), 1);
    }
}
