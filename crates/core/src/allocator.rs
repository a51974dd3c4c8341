use crate::model::Subject;

/// Units of work assigned to one subject for a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub subject: String,
    pub units: u32,
}

impl Allocation {
    #[must_use]
    pub fn new(subject: impl Into<String>, units: u32) -> Self {
        Self {
            subject: subject.into(),
            units,
        }
    }
}

/// Splits a daily load across subjects.
///
/// Two strategies exist side by side: the sequential preview shown as
/// "today's plan", and the round-robin distribution applied on completion.
/// They can disagree; see `todays_plan` and `distribute`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubjectAllocator;

impl SubjectAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Preview of the day: deplete subjects in listed order.
    ///
    /// Each subject with backlog takes as much of the remaining capacity as it
    /// can before the next one is considered. Only non-zero allocations are returned.
    #[must_use]
    pub fn todays_plan(&self, daily_load: u32, subjects: &[Subject]) -> Vec<Allocation> {
        let mut capacity = daily_load;
        let mut plan = Vec::new();

        for subject in subjects {
            if capacity == 0 {
                break;
            }
            if subject.backlog() == 0 {
                continue;
            }
            let take = subject.backlog().min(capacity);
            capacity -= take;
            plan.push(Allocation::new(subject.name(), take));
        }

        plan
    }

    /// Consume `daily_load` units one at a time, rotating through subjects.
    ///
    /// Passes walk the subjects in order, skipping exhausted ones, until the
    /// capacity is spent or no backlog remains. Returns the units taken from
    /// each subject, in subject order, omitting subjects that gave nothing.
    pub fn distribute(&self, daily_load: u32, subjects: &mut [Subject]) -> Vec<Allocation> {
        let mut taken = vec![0_u32; subjects.len()];
        let mut capacity = daily_load;

        while capacity > 0 {
            let mut progressed = false;
            for (subject, count) in subjects.iter_mut().zip(taken.iter_mut()) {
                if capacity == 0 {
                    break;
                }
                if subject.take_one() {
                    *count += 1;
                    capacity -= 1;
                    progressed = true;
                }
            }
            // every subject is exhausted
            if !progressed {
                break;
            }
        }

        subjects
            .iter()
            .zip(taken)
            .filter(|(_, count)| *count > 0)
            .map(|(subject, count)| Allocation::new(subject.name(), count))
            .collect()
    }
}
