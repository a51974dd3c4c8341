mod service;
mod view;

pub use service::PlanService;
pub use view::{Dashboard, SubjectProgress};
