//! Phase Scheduler - runs an ordered, validated list of check phases
//!
//! - Phases run strictly in declared order
//! - A phase whose precondition does not hold yields exactly one `skip` result
//!   and none of its checks run
//! - Parallel phases fan out over their checks and join before the next phase;
//!   results keep registration order
//! - Checks only read the context; the writes they return as `ContextFact`s are
//!   applied here, and only for fields owned by the running phase

use crate::application::env::CheckEnv;
use crate::application::guard::run_guarded;
use crate::domain::{
    Category, CheckContext, CheckResult, ContextFact, ContextField, PlanError, Summary,
};
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// What a check hands back: results plus context writes
#[derive(Debug, Default)]
pub struct CheckOutput {
    pub results: Vec<CheckResult>,
    pub facts: Vec<ContextFact>,
}

impl CheckOutput {
    pub fn results(results: Vec<CheckResult>) -> Self {
        Self {
            results,
            facts: Vec::new(),
        }
    }

    pub fn single(result: CheckResult) -> Self {
        Self::results(vec![result])
    }

    pub fn with_fact(mut self, fact: ContextFact) -> Self {
        self.facts.push(fact);
        self
    }
}

impl From<CheckResult> for CheckOutput {
    fn from(result: CheckResult) -> Self {
        Self::single(result)
    }
}

/// One check function
#[async_trait]
pub trait Check: Send + Sync {
    /// Name used for the synthesized result when the check errors or panics
    fn name(&self) -> &'static str;

    /// Context fields this check reads
    fn reads(&self) -> &'static [ContextField] {
        &[]
    }

    /// Context field this check writes, if any
    fn writes(&self) -> Option<ContextField> {
        None
    }

    async fn run(&self, ctx: &CheckContext, env: &CheckEnv) -> crate::Result<CheckOutput>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyMode {
    Parallel,
    Sequential,
}

/// Run-precondition of a phase, evaluated against the context when the phase starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    Always,
    /// The VM tool answered `--version`
    ToolInstalled,
    /// The VM reported state `running`
    VmRunning,
}

impl Precondition {
    pub fn reads(&self) -> Option<ContextField> {
        match self {
            Precondition::Always => None,
            Precondition::ToolInstalled => Some(ContextField::ToolVersion),
            Precondition::VmRunning => Some(ContextField::VmRunning),
        }
    }

    pub fn holds(&self, ctx: &CheckContext) -> bool {
        match self {
            Precondition::Always => true,
            Precondition::ToolInstalled => ctx.tool_version().is_some(),
            Precondition::VmRunning => ctx.vm_running(),
        }
    }

    pub fn skip_message(&self) -> &'static str {
        match self {
            Precondition::Always => "Skipped",
            Precondition::ToolInstalled => "Skipped because Vagrant is not installed",
            Precondition::VmRunning => "Skipped because the VM is not running",
        }
    }
}

/// An ordered group of checks sharing a concurrency mode and a precondition
pub struct Phase {
    category: Category,
    mode: ConcurrencyMode,
    precondition: Precondition,
    checks: Vec<Box<dyn Check>>,
}

impl Phase {
    pub fn parallel(category: Category) -> Self {
        Self::new(category, ConcurrencyMode::Parallel)
    }

    pub fn sequential(category: Category) -> Self {
        Self::new(category, ConcurrencyMode::Sequential)
    }

    fn new(category: Category, mode: ConcurrencyMode) -> Self {
        Self {
            category,
            mode,
            precondition: Precondition::Always,
            checks: Vec::new(),
        }
    }

    pub fn when(mut self, precondition: Precondition) -> Self {
        self.precondition = precondition;
        self
    }

    pub fn check(mut self, check: impl Check + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    pub fn precondition(&self) -> Precondition {
        self.precondition
    }

    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    fn skip_result(&self, message: &str) -> CheckResult {
        CheckResult::skip(format!("{} checks", self.category.title()), self.category, message)
    }
}

/// Validated phase list
pub struct PhasePlan {
    phases: Vec<Phase>,
}

impl PhasePlan {
    /// Validate ownership and ordering of context reads/writes
    ///
    /// # Errors
    /// - PlanError::ForeignWrite if a check writes a field its phase does not own
    /// - PlanError::ConflictingAccess if parallel siblings read what another writes
    /// - PlanError::ReadBeforeWrite if a field is read before its owner has run
    /// - PlanError::DuplicatePhase if a category appears twice
    pub fn new(phases: Vec<Phase>) -> Result<Self, PlanError> {
        let mut seen = HashSet::new();
        let mut written: HashSet<ContextField> = HashSet::new();

        for phase in &phases {
            if !seen.insert(phase.category) {
                return Err(PlanError::DuplicatePhase(phase.category));
            }

            for check in &phase.checks {
                if let Some(field) = check.writes() {
                    if field.owner() != phase.category {
                        return Err(PlanError::ForeignWrite {
                            check: check.name().to_string(),
                            phase: phase.category,
                            field,
                        });
                    }
                }
            }

            if let Some(field) = phase.precondition.reads() {
                if !written.contains(&field) {
                    return Err(PlanError::ReadBeforeWrite {
                        reader: format!("{} precondition", phase.category.title()),
                        phase: phase.category,
                        field,
                    });
                }
            }

            match phase.mode {
                ConcurrencyMode::Parallel => Self::validate_parallel(phase, &written)?,
                ConcurrencyMode::Sequential => Self::validate_sequential(phase, &written)?,
            }

            written.extend(phase.checks.iter().filter_map(|c| c.writes()));
        }

        Ok(Self { phases })
    }

    fn validate_parallel(phase: &Phase, written: &HashSet<ContextField>) -> Result<(), PlanError> {
        for (i, reader) in phase.checks.iter().enumerate() {
            for &field in reader.reads() {
                let sibling_writer = phase
                    .checks
                    .iter()
                    .enumerate()
                    .find(|(j, w)| *j != i && w.writes() == Some(field));

                if let Some((_, writer)) = sibling_writer {
                    return Err(PlanError::ConflictingAccess {
                        phase: phase.category,
                        reader: reader.name().to_string(),
                        writer: writer.name().to_string(),
                        field,
                    });
                }
                if !written.contains(&field) {
                    return Err(PlanError::ReadBeforeWrite {
                        reader: reader.name().to_string(),
                        phase: phase.category,
                        field,
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_sequential(
        phase: &Phase,
        written: &HashSet<ContextField>,
    ) -> Result<(), PlanError> {
        let mut local = written.clone();
        for check in &phase.checks {
            for &field in check.reads() {
                if !local.contains(&field) {
                    return Err(PlanError::ReadBeforeWrite {
                        reader: check.name().to_string(),
                        phase: phase.category,
                        field,
                    });
                }
            }
            if let Some(field) = check.writes() {
                local.insert(field);
            }
        }
        Ok(())
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }
}

/// Progress summary emitted after each phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSummary {
    pub category: Category,
    pub counts: Summary,
    pub elapsed: Duration,
    /// The precondition did not hold (or the run was interrupted)
    pub skipped: bool,
}

/// Observer for phase progress. Purely observational.
pub trait PhaseObserver: Send + Sync {
    fn phase_completed(&self, summary: &PhaseSummary);
}

pub struct Scheduler {
    plan: PhasePlan,
    observer: Option<Arc<dyn PhaseObserver>>,
}

impl Scheduler {
    pub fn new(plan: PhasePlan) -> Self {
        Self {
            plan,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PhaseObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn plan(&self) -> &PhasePlan {
        &self.plan
    }

    /// Run every phase in order against `ctx`
    pub async fn run(&self, ctx: &mut CheckContext, env: &CheckEnv) -> Vec<CheckResult> {
        let mut results = Vec::new();

        for phase in self.plan.phases() {
            let started = Instant::now();

            let (phase_results, skipped) = if env.cancel_token().is_cancelled() {
                (vec![phase.skip_result("Skipped because the run was interrupted")], true)
            } else if !phase.precondition.holds(ctx) {
                debug!(
                    phase = %phase.category,
                    precondition = ?phase.precondition,
                    "Phase precondition not met"
                );
                (vec![phase.skip_result(phase.precondition.skip_message())], true)
            } else {
                (self.run_phase(phase, ctx, env).await, false)
            };

            let summary = PhaseSummary {
                category: phase.category,
                counts: Summary::from_results(&phase_results),
                elapsed: started.elapsed(),
                skipped,
            };
            self.report_progress(&summary);

            results.extend(phase_results);
        }

        results
    }

    async fn run_phase(
        &self,
        phase: &Phase,
        ctx: &mut CheckContext,
        env: &CheckEnv,
    ) -> Vec<CheckResult> {
        let mut results = Vec::new();

        match phase.mode {
            ConcurrencyMode::Parallel => {
                let shared: &CheckContext = ctx;
                let outputs = join_all(
                    phase
                        .checks
                        .iter()
                        .map(|check| run_guarded(check.as_ref(), phase.category, shared, env)),
                )
                .await;

                for (check, output) in phase.checks.iter().zip(outputs) {
                    apply_facts(phase, check.as_ref(), output.facts, ctx);
                    results.extend(output.results);
                }
            }
            ConcurrencyMode::Sequential => {
                for check in &phase.checks {
                    let output = run_guarded(check.as_ref(), phase.category, ctx, env).await;
                    apply_facts(phase, check.as_ref(), output.facts, ctx);
                    results.extend(output.results);
                }
            }
        }

        results
    }

    fn report_progress(&self, summary: &PhaseSummary) {
        info!(
            phase = %summary.category,
            passed = summary.counts.passed,
            failed = summary.counts.failed,
            warnings = summary.counts.warnings,
            skipped = summary.counts.skipped,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Phase completed"
        );
        if let Some(observer) = &self.observer {
            observer.phase_completed(summary);
        }
    }
}

fn apply_facts(phase: &Phase, check: &dyn Check, facts: Vec<ContextFact>, ctx: &mut CheckContext) {
    for fact in facts {
        let field = fact.field();
        if check.writes() == Some(field) && field.owner() == phase.category {
            debug!(check = check.name(), field = field.as_str(), "Context updated");
            ctx.apply(fact);
        } else {
            error!(
                check = check.name(),
                phase = %phase.category,
                field = field.as_str(),
                "Dropping context write outside the ownership table"
            );
        }
    }
}
