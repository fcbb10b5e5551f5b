// Application Layer - Detection, Scheduling and Check Functions

pub mod checks;
pub mod constants;
pub mod detector;
pub mod doctor;
pub mod env;
pub mod guard;
pub mod remote;
pub mod scheduler;

// Re-exports
pub use detector::{ProbeOutcome, ProviderDetector};
pub use doctor::{default_plan, Doctor};
pub use env::{CheckEnv, DoctorSettings};
pub use scheduler::{
    Check, CheckOutput, ConcurrencyMode, Phase, PhaseObserver, PhasePlan, PhaseSummary,
    Precondition, Scheduler,
};
