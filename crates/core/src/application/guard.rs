// Check isolation: an `Err` or a panic inside a check becomes a `fail` result

use crate::application::env::CheckEnv;
use crate::application::scheduler::{Check, CheckOutput};
use crate::domain::{Category, CheckContext, CheckResult};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::error;

/// Run one check to completion, whatever it does
///
/// Never propagates: the returned output always carries at least the check's
/// own results, or a single `fail` named after the check with the error text
/// in `details`.
pub async fn run_guarded(
    check: &dyn Check,
    category: Category,
    ctx: &CheckContext,
    env: &CheckEnv,
) -> CheckOutput {
    match AssertUnwindSafe(check.run(ctx, env)).catch_unwind().await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            error!(check = check.name(), error = %e, "Check returned an error");
            CheckOutput::single(
                CheckResult::fail(check.name(), category, "Check failed unexpectedly")
                    .with_details(e.to_string()),
            )
        }
        Err(payload) => {
            let text = panic_text(payload.as_ref());
            error!(check = check.name(), panic = %text, "Check panicked");
            CheckOutput::single(
                CheckResult::fail(check.name(), category, "Check crashed").with_details(text),
            )
        }
    }
}

fn panic_text(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic with a non-string payload".to_string())
}
