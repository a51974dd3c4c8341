#![forbid(unsafe_code)]

pub mod error;
pub mod plans;

pub use recovery_core::Clock;

pub use error::PlanServiceError;
pub use plans::{Dashboard, PlanService, SubjectProgress};
