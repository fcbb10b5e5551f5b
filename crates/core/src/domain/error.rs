// Domain Error Types

use crate::domain::check::Category;
use crate::domain::context::ContextField;
use thiserror::Error;

/// Phase plan validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Check '{check}' in phase {phase} writes {} which is owned by {}", field.as_str(), field.owner())]
    ForeignWrite {
        check: String,
        phase: Category,
        field: ContextField,
    },

    #[error("Parallel phase {phase}: '{reader}' reads {} written by sibling '{writer}'", field.as_str())]
    ConflictingAccess {
        phase: Category,
        reader: String,
        writer: String,
        field: ContextField,
    },

    #[error("'{reader}' in phase {phase} reads {} before it is written", field.as_str())]
    ReadBeforeWrite {
        reader: String,
        phase: Category,
        field: ContextField,
    },

    #[error("Phase {0} is declared more than once")]
    DuplicatePhase(Category),
}

pub type Result<T> = std::result::Result<T, PlanError>;
