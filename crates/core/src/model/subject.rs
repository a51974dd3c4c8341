use chrono::NaiveDate;

use crate::model::plan::PlanError;

//
// ─── SUBJECT ───────────────────────────────────────────────────────────────────
//

/// A named slice of the backlog, e.g. one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    name: String,
    backlog: u32,
    original: u32,
}

impl Subject {
    /// Creates a subject whose whole backlog is still pending.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::EmptySubjectName` if the name is empty or whitespace-only.
    /// Returns `PlanError::InvalidSubjectBacklog` if `backlog` is zero.
    pub fn new(name: impl Into<String>, backlog: u32) -> Result<Self, PlanError> {
        let name = normalize_name(name.into())?;
        if backlog == 0 {
            return Err(PlanError::InvalidSubjectBacklog { name });
        }
        Ok(Self {
            name,
            backlog,
            original: backlog,
        })
    }

    /// Rehydrate a subject from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `PlanError` if the name is empty, the original backlog is zero,
    /// or the remaining backlog exceeds the original.
    pub fn from_persisted(
        name: impl Into<String>,
        backlog: u32,
        original: u32,
    ) -> Result<Self, PlanError> {
        let name = normalize_name(name.into())?;
        if original == 0 {
            return Err(PlanError::InvalidSubjectBacklog { name });
        }
        if backlog > original {
            return Err(PlanError::BacklogExceedsOriginal { backlog, original });
        }
        Ok(Self {
            name,
            backlog,
            original,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn backlog(&self) -> u32 {
        self.backlog
    }

    #[must_use]
    pub fn original(&self) -> u32 {
        self.original
    }

    pub(crate) fn take_one(&mut self) -> bool {
        if self.backlog == 0 {
            return false;
        }
        self.backlog -= 1;
        true
    }
}

fn normalize_name(name: String) -> Result<String, PlanError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PlanError::EmptySubjectName);
    }
    Ok(trimmed.to_owned())
}

//
// ─── SUBJECT PLAN ──────────────────────────────────────────────────────────────
//

/// Recovery plan split across subjects that share a single daily load.
///
/// Subject order is insertion order and decides allocation tie-breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectPlan {
    subjects: Vec<Subject>,
    daily_load: u32,
    start_date: NaiveDate,
}

impl SubjectPlan {
    /// Rehydrate a subject plan from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::NoSubjects` if `subjects` is empty.
    /// Returns `PlanError::InvalidDailyLoad` if `daily_load` is zero.
    /// Returns `PlanError::TotalBacklogOverflow` if the combined original
    /// backlog does not fit in a `u32`.
    pub fn from_persisted(
        subjects: Vec<Subject>,
        daily_load: u32,
        start_date: NaiveDate,
    ) -> Result<Self, PlanError> {
        if subjects.is_empty() {
            return Err(PlanError::NoSubjects);
        }
        if daily_load == 0 {
            return Err(PlanError::InvalidDailyLoad);
        }
        // Every backlog is bounded by its original, so this also bounds the remaining total.
        subjects
            .iter()
            .try_fold(0_u32, |total, subject| total.checked_add(subject.original()))
            .ok_or(PlanError::TotalBacklogOverflow)?;
        Ok(Self {
            subjects,
            daily_load,
            start_date,
        })
    }

    #[must_use]
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    #[must_use]
    pub fn daily_load(&self) -> u32 {
        self.daily_load
    }

    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Sum of the remaining backlog of every subject.
    #[must_use]
    pub fn total_backlog(&self) -> u32 {
        self.subjects.iter().map(Subject::backlog).sum()
    }

    /// Sum of the original backlog of every subject.
    #[must_use]
    pub fn total_original(&self) -> u32 {
        self.subjects.iter().map(Subject::original).sum()
    }

    pub(crate) fn subjects_mut(&mut self) -> &mut [Subject] {
        &mut self.subjects
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Ordered list of subjects collected during setup, before a plan exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectPlanDraft {
    subjects: Vec<Subject>,
}

impl SubjectPlanDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append a subject to the end of the list.
    ///
    /// # Errors
    ///
    /// Returns `PlanError` if the name is empty or the backlog is zero;
    /// the draft is left unchanged.
    pub fn add_subject(
        &mut self,
        name: impl Into<String>,
        backlog: u32,
    ) -> Result<&mut Self, PlanError> {
        self.subjects.push(Subject::new(name, backlog)?);
        Ok(self)
    }

    #[must_use]
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Turn the collected subjects into a plan.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::NoSubjects` if nothing was added.
    /// Returns `PlanError::InvalidDailyLoad` if `daily_load` is zero.
    /// Returns `PlanError::TotalBacklogOverflow` if the subjects add up past `u32::MAX`.
    pub fn generate(self, daily_load: u32, start_date: NaiveDate) -> Result<SubjectPlan, PlanError> {
        SubjectPlan::from_persisted(self.subjects, daily_load, start_date)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
