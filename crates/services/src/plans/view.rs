use chrono::NaiveDate;

use recovery_core::allocator::Allocation;
use recovery_core::engine::{RecoveryEngine, Workload};
use recovery_core::model::{Plan, RecoveryMode};

/// Remaining and original backlog for one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectProgress {
    pub name: String,
    pub backlog: u32,
    pub original: u32,
}

/// Presentation-agnostic snapshot of a plan.
///
/// No pre-formatted strings: the front end decides how to draw progress,
/// dates, and the subject list.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub remaining: u32,
    pub original: u32,
    /// Share of the original backlog already reclaimed, in `[0, 1]`.
    pub progress: f64,
    pub daily_load: u32,
    pub todays_target: u32,
    pub days_remaining: u32,
    pub start_date: NaiveDate,
    pub finish_date: NaiveDate,

    /// Escalation state; `None` for subject plans, which never escalate.
    pub mode: Option<RecoveryMode>,
    pub missed_count: Option<u32>,

    /// Sequential preview of today's units; empty for single-backlog plans.
    pub todays_plan: Vec<Allocation>,
    pub subjects: Vec<SubjectProgress>,
    pub cleared: bool,
}

impl Dashboard {
    #[must_use]
    pub fn from_plan(engine: &RecoveryEngine, plan: &Plan) -> Self {
        let (mode, missed_count, todays_plan, subjects) = match plan {
            Plan::Single(state) => (
                Some(state.mode()),
                Some(state.missed_count()),
                Vec::new(),
                Vec::new(),
            ),
            Plan::Subjects(subject_plan) => (
                None,
                None,
                engine.todays_plan(subject_plan),
                subject_plan
                    .subjects()
                    .iter()
                    .map(|subject| SubjectProgress {
                        name: subject.name().to_owned(),
                        backlog: subject.backlog(),
                        original: subject.original(),
                    })
                    .collect(),
            ),
        };

        Self {
            remaining: plan.remaining(),
            original: Workload::original(plan),
            progress: engine.progress_fraction(plan),
            daily_load: plan.daily_load(),
            todays_target: engine.todays_target(plan),
            days_remaining: engine.days_remaining(plan),
            start_date: plan.start_date(),
            finish_date: engine.finish_date(plan),
            mode,
            missed_count,
            todays_plan,
            subjects,
            cleared: plan.is_cleared(),
        }
    }

    /// Progress as a whole percentage, rounded down.
    #[must_use]
    pub fn percent_complete(&self) -> u32 {
        if self.original == 0 {
            return 0;
        }
        let reclaimed = u64::from(self.original.saturating_sub(self.remaining));
        let percent = reclaimed * 100 / u64::from(self.original);
        u32::try_from(percent).unwrap_or(100)
    }
}
