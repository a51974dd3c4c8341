//! Shared error types for the services crate.

use thiserror::Error;

use recovery_core::model::PlanError;
use storage::repository::StorageError;

/// Errors emitted by `PlanService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlanServiceError {
    #[error("no recovery plan yet; start one first")]
    NoActivePlan,
    #[error("a recovery plan is already in progress; reset it before starting another")]
    PlanAlreadyActive,
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
