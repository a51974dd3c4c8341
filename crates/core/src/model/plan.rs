use chrono::NaiveDate;
use thiserror::Error;

use crate::model::mode::RecoveryMode;
use crate::model::subject::SubjectPlan;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Setup inputs or persisted values that violate plan invariants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlanError {
    #[error("total backlog must be at least 1")]
    InvalidBacklog,

    #[error("daily load must be at least 1")]
    InvalidDailyLoad,

    #[error("subject name cannot be empty")]
    EmptySubjectName,

    #[error("backlog for subject {name:?} must be at least 1")]
    InvalidSubjectBacklog { name: String },

    #[error("a subject plan needs at least one subject")]
    NoSubjects,

    #[error("remaining backlog ({backlog}) exceeds original backlog ({original})")]
    BacklogExceedsOriginal { backlog: u32, original: u32 },

    #[error("combined subject backlog exceeds {max}", max = u32::MAX)]
    TotalBacklogOverflow,
}

//
// ─── SINGLE-BACKLOG PLAN ───────────────────────────────────────────────────────
//

/// Durable state of a single-backlog recovery plan.
///
/// Fields are private so that `0 <= backlog <= original_backlog` and
/// `daily_load >= 1` hold for every value that exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanState {
    backlog: u32,
    original_backlog: u32,
    daily_load: u32,
    missed_count: u32,
    mode: RecoveryMode,
    start_date: NaiveDate,
}

impl PlanState {
    /// Creates a fresh plan in `Normal Recovery` with no misses.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidBacklog` if `total_backlog` is zero.
    /// Returns `PlanError::InvalidDailyLoad` if `daily_load` is zero.
    pub fn new(
        total_backlog: u32,
        daily_load: u32,
        start_date: NaiveDate,
    ) -> Result<Self, PlanError> {
        if total_backlog == 0 {
            return Err(PlanError::InvalidBacklog);
        }
        if daily_load == 0 {
            return Err(PlanError::InvalidDailyLoad);
        }

        Ok(Self {
            backlog: total_backlog,
            original_backlog: total_backlog,
            daily_load,
            missed_count: 0,
            mode: RecoveryMode::NormalRecovery,
            start_date,
        })
    }

    /// Rehydrate a plan from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `PlanError` if the persisted values break plan invariants.
    pub fn from_persisted(
        backlog: u32,
        original_backlog: u32,
        daily_load: u32,
        missed_count: u32,
        mode: RecoveryMode,
        start_date: NaiveDate,
    ) -> Result<Self, PlanError> {
        if original_backlog == 0 {
            return Err(PlanError::InvalidBacklog);
        }
        if daily_load == 0 {
            return Err(PlanError::InvalidDailyLoad);
        }
        if backlog > original_backlog {
            return Err(PlanError::BacklogExceedsOriginal {
                backlog,
                original: original_backlog,
            });
        }

        Ok(Self {
            backlog,
            original_backlog,
            daily_load,
            missed_count,
            mode,
            start_date,
        })
    }

    // Accessors
    #[must_use]
    pub fn backlog(&self) -> u32 {
        self.backlog
    }

    #[must_use]
    pub fn original_backlog(&self) -> u32 {
        self.original_backlog
    }

    #[must_use]
    pub fn daily_load(&self) -> u32 {
        self.daily_load
    }

    #[must_use]
    pub fn missed_count(&self) -> u32 {
        self.missed_count
    }

    #[must_use]
    pub fn mode(&self) -> RecoveryMode {
        self.mode
    }

    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// True once every unit of the backlog has been reclaimed.
    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.backlog == 0
    }

    /// Removes up to `units` from the backlog and resets the miss streak.
    ///
    /// Returns the number of units actually removed.
    pub(crate) fn reclaim(&mut self, units: u32) -> u32 {
        let completed = units.min(self.backlog);
        self.backlog -= completed;
        self.missed_count = 0;
        completed
    }

    /// Extends the miss streak by one and returns the new streak length.
    pub(crate) fn register_miss(&mut self) -> u32 {
        self.missed_count = self.missed_count.saturating_add(1);
        self.missed_count
    }

    /// Lowers the daily load (never raises it) and escalates the mode.
    pub(crate) fn relax(&mut self, daily_load: u32, mode: RecoveryMode) {
        self.daily_load = self.daily_load.min(daily_load.max(1));
        self.mode = self.mode.escalate_to(mode);
    }
}

//
// ─── PLAN VARIANTS ─────────────────────────────────────────────────────────────
//

/// A recovery plan in either of its two shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// One undivided backlog with miss escalation.
    Single(PlanState),
    /// Backlog split across ordered subjects sharing one daily load.
    Subjects(SubjectPlan),
}

impl Plan {
    /// Remaining units across the whole plan.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        match self {
            Plan::Single(state) => state.backlog(),
            Plan::Subjects(plan) => plan.total_backlog(),
        }
    }

    #[must_use]
    pub fn daily_load(&self) -> u32 {
        match self {
            Plan::Single(state) => state.daily_load(),
            Plan::Subjects(plan) => plan.daily_load(),
        }
    }

    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        match self {
            Plan::Single(state) => state.start_date(),
            Plan::Subjects(plan) => plan.start_date(),
        }
    }

    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.remaining() == 0
    }
}

impl From<PlanState> for Plan {
    fn from(state: PlanState) -> Self {
        Plan::Single(state)
    }
}

impl From<SubjectPlan> for Plan {
    fn from(plan: SubjectPlan) -> Self {
        Plan::Subjects(plan)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
