mod mode;
mod plan;
mod policy;
mod status;
mod subject;

pub use mode::{ParseModeError, RecoveryMode};
pub use plan::{Plan, PlanError, PlanState};
pub use policy::{PolicyError, RecoveryPolicy};
pub use status::PlanStatus;
pub use subject::{Subject, SubjectPlan, SubjectPlanDraft};
