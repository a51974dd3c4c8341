use chrono::{Days, NaiveDate};
use std::fmt;

use crate::allocator::{Allocation, SubjectAllocator};
use crate::model::{Plan, PlanState, RecoveryMode, RecoveryPolicy, SubjectPlan};

//
// ─── WORKLOAD ──────────────────────────────────────────────────────────────────
//

/// Anything with a backlog and a daily pace that can be projected onto a calendar.
pub trait Workload {
    /// Units still to do.
    fn remaining(&self) -> u32;
    /// Units the plan started with.
    fn original(&self) -> u32;
    /// Target units per day.
    fn daily_load(&self) -> u32;
    /// Day the plan was created.
    fn start_date(&self) -> NaiveDate;
}

impl Workload for PlanState {
    fn remaining(&self) -> u32 {
        self.backlog()
    }

    fn original(&self) -> u32 {
        self.original_backlog()
    }

    fn daily_load(&self) -> u32 {
        PlanState::daily_load(self)
    }

    fn start_date(&self) -> NaiveDate {
        PlanState::start_date(self)
    }
}

impl Workload for SubjectPlan {
    fn remaining(&self) -> u32 {
        self.total_backlog()
    }

    fn original(&self) -> u32 {
        self.total_original()
    }

    fn daily_load(&self) -> u32 {
        SubjectPlan::daily_load(self)
    }

    fn start_date(&self) -> NaiveDate {
        SubjectPlan::start_date(self)
    }
}

impl Workload for Plan {
    fn remaining(&self) -> u32 {
        Plan::remaining(self)
    }

    fn original(&self) -> u32 {
        match self {
            Plan::Single(state) => state.original_backlog(),
            Plan::Subjects(plan) => plan.total_original(),
        }
    }

    fn daily_load(&self) -> u32 {
        Plan::daily_load(self)
    }

    fn start_date(&self) -> NaiveDate {
        Plan::start_date(self)
    }
}

//
// ─── CHECK-IN RESULT ───────────────────────────────────────────────────────────
//

/// User-facing note produced by a single transition.
///
/// Never persisted: it only describes the transition that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInMessage {
    /// Completion; `units` may be zero when the backlog was already empty.
    Reclaimed { units: u32 },
    /// First miss of a streak.
    Reassurance,
    /// Second miss of a streak: the load was cut.
    LoadReduced { from: u32, to: u32 },
    /// Third and later misses: the load is pinned to its minimum.
    MinimumViable { load: u32 },
    /// Miss on a subject plan; nothing changes.
    MissNoted,
}

impl fmt::Display for CheckInMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckInMessage::Reclaimed { units } => {
                write!(f, "You reclaimed {units} lecture(s). Momentum maintained.")
            }
            CheckInMessage::Reassurance => f.write_str(
                "It happens. We shifted your timeline by 1 day. Nothing is broken.",
            ),
            CheckInMessage::LoadReduced { from, to } => {
                write!(f, "Daily load reduced from {from} → {to}. Restart gently.")
            }
            CheckInMessage::MinimumViable { load: 1 } => f.write_str(
                "Daily load set to 1 lecture. Momentum matters more than speed.",
            ),
            CheckInMessage::MinimumViable { load } => write!(
                f,
                "Daily load set to {load} lectures. Momentum matters more than speed."
            ),
            CheckInMessage::MissNoted => {
                f.write_str("Missed today. Your plan stays the same; pick it up tomorrow.")
            }
        }
    }
}

/// What a transition means for the caller beyond the new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInEvent {
    /// Work was logged and backlog remains.
    Progress,
    /// The backlog is now empty. The engine does not reset anything.
    Cleared,
    /// A miss was recorded.
    Missed,
}

/// Celebration shown once a plan is cleared.
pub const CLEARED_MESSAGE: &str = "Backlog cleared. You rebuilt momentum. That's real progress.";

/// Result of applying one check-in to a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckIn<P> {
    pub state: P,
    pub message: CheckInMessage,
    pub event: CheckInEvent,
    /// Per-subject units taken by a completion; empty for single-backlog plans and misses.
    pub consumed: Vec<Allocation>,
}

impl<P> CheckIn<P> {
    /// Swap the state for another representation, keeping message and event.
    pub fn map_state<Q>(self, f: impl FnOnce(P) -> Q) -> CheckIn<Q> {
        CheckIn {
            state: f(self.state),
            message: self.message,
            event: self.event,
            consumed: self.consumed,
        }
    }

    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.event == CheckInEvent::Cleared
    }
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Pure recovery rules: derived schedule values and check-in transitions.
///
/// Nothing here touches storage; every transition takes the current state by
/// reference and returns a new one.
///
/// # Examples
///
/// ```
/// # use recovery_core::engine::RecoveryEngine;
/// # use recovery_core::model::{PlanState, RecoveryMode};
/// let engine = RecoveryEngine::default();
/// let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let plan = PlanState::new(20, 8, start)?;
///
/// let plan = engine.miss_plan(&plan).state;
/// let plan = engine.miss_plan(&plan).state;
/// assert_eq!(plan.daily_load(), 6);
/// assert_eq!(plan.mode(), RecoveryMode::AdjustedRecovery);
/// # Ok::<(), recovery_core::model::PlanError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryEngine {
    policy: RecoveryPolicy,
    allocator: SubjectAllocator,
}

impl RecoveryEngine {
    #[must_use]
    pub fn new(policy: RecoveryPolicy) -> Self {
        Self {
            policy,
            allocator: SubjectAllocator::new(),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &RecoveryPolicy {
        &self.policy
    }

    // ── derived values ──────────────────────────────────────────────────────

    /// Share of the original backlog already reclaimed, in `[0, 1]`.
    ///
    /// Returns `0.0` when the original backlog is zero.
    #[must_use]
    pub fn progress_fraction(&self, work: &impl Workload) -> f64 {
        let original = work.original();
        if original == 0 {
            return 0.0;
        }
        let remaining = work.remaining().min(original);
        1.0 - f64::from(remaining) / f64::from(original)
    }

    /// `ceil(remaining / daily_load)`, or `0` when nothing remains.
    #[must_use]
    pub fn days_remaining(&self, work: &impl Workload) -> u32 {
        let remaining = work.remaining();
        let load = work.daily_load();
        if remaining == 0 || load == 0 {
            return 0;
        }
        remaining.div_ceil(load)
    }

    /// Start date plus the remaining days.
    #[must_use]
    pub fn finish_date(&self, work: &impl Workload) -> NaiveDate {
        let days = Days::new(u64::from(self.days_remaining(work)));
        work.start_date()
            .checked_add_days(days)
            .unwrap_or(NaiveDate::MAX)
    }

    /// Units the user is asked for today: the daily load, capped by what is left.
    #[must_use]
    pub fn todays_target(&self, work: &impl Workload) -> u32 {
        work.daily_load().min(work.remaining())
    }

    /// Sequential preview of today's units per subject.
    #[must_use]
    pub fn todays_plan(&self, plan: &SubjectPlan) -> Vec<Allocation> {
        self.allocator.todays_plan(plan.daily_load(), plan.subjects())
    }

    // ── single-backlog transitions ──────────────────────────────────────────

    /// Log a completed day: reclaim `min(daily_load, backlog)` and reset the miss streak.
    ///
    /// The mode is left as is.
    #[must_use]
    pub fn complete_plan(&self, state: &PlanState) -> CheckIn<PlanState> {
        let mut next = state.clone();
        let units = next.reclaim(next.daily_load());
        CheckIn {
            event: completion_event(next.is_cleared()),
            state: next,
            message: CheckInMessage::Reclaimed { units },
            consumed: Vec::new(),
        }
    }

    /// Log a missed day and apply the escalation for the new streak length.
    #[must_use]
    pub fn miss_plan(&self, state: &PlanState) -> CheckIn<PlanState> {
        let mut next = state.clone();
        let missed = next.register_miss();

        let message = if missed >= self.policy.minimum_after_misses() {
            next.relax(
                self.policy.minimum_load(),
                RecoveryMode::MinimumViableProgress,
            );
            CheckInMessage::MinimumViable {
                load: next.daily_load(),
            }
        } else if missed == self.policy.adjust_after_misses() {
            let from = next.daily_load();
            next.relax(
                self.policy.reduced_load(from),
                RecoveryMode::AdjustedRecovery,
            );
            CheckInMessage::LoadReduced {
                from,
                to: next.daily_load(),
            }
        } else {
            CheckInMessage::Reassurance
        };

        CheckIn {
            state: next,
            message,
            event: CheckInEvent::Missed,
            consumed: Vec::new(),
        }
    }

    // ── subject transitions ─────────────────────────────────────────────────

    /// Log a completed day by round-robin over subjects with backlog left.
    #[must_use]
    pub fn complete_subjects(&self, plan: &SubjectPlan) -> CheckIn<SubjectPlan> {
        let mut next = plan.clone();
        let load = next.daily_load();
        let consumed = self.allocator.distribute(load, next.subjects_mut());
        let units = consumed.iter().map(|a| a.units).sum();

        CheckIn {
            event: completion_event(next.total_backlog() == 0),
            state: next,
            message: CheckInMessage::Reclaimed { units },
            consumed,
        }
    }

    /// Subject plans do not escalate; a miss only produces a notice.
    #[must_use]
    pub fn miss_subjects(&self, plan: &SubjectPlan) -> CheckIn<SubjectPlan> {
        CheckIn {
            state: plan.clone(),
            message: CheckInMessage::MissNoted,
            event: CheckInEvent::Missed,
            consumed: Vec::new(),
        }
    }

    // ── dispatch ────────────────────────────────────────────────────────────

    #[must_use]
    pub fn complete(&self, plan: &Plan) -> CheckIn<Plan> {
        match plan {
            Plan::Single(state) => self.complete_plan(state).map_state(Plan::Single),
            Plan::Subjects(subjects) => self.complete_subjects(subjects).map_state(Plan::Subjects),
        }
    }

    #[must_use]
    pub fn miss(&self, plan: &Plan) -> CheckIn<Plan> {
        match plan {
            Plan::Single(state) => self.miss_plan(state).map_state(Plan::Single),
            Plan::Subjects(subjects) => self.miss_subjects(subjects).map_state(Plan::Subjects),
        }
    }
}

fn completion_event(cleared: bool) -> CheckInEvent {
    if cleared {
        CheckInEvent::Cleared
    } else {
        CheckInEvent::Progress
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Subject, SubjectPlanDraft};
    use crate::time::fixed_today;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn plan(backlog: u32, load: u32) -> PlanState {
        PlanState::new(backlog, load, fixed_today()).unwrap()
    }

    fn subject_plan(entries: &[(&str, u32)], load: u32) -> SubjectPlan {
        let mut draft = SubjectPlanDraft::new();
        for (name, backlog) in entries {
            draft.add_subject(*name, *backlog).unwrap();
        }
        draft.generate(load, fixed_today()).unwrap()
    }

    #[test]
    fn finish_date_rounds_partial_days_up() {
        let engine = RecoveryEngine::default();
        let state = PlanState::new(10, 3, date(2024, 1, 1)).unwrap();
        assert_eq!(engine.days_remaining(&state), 4);
        assert_eq!(engine.finish_date(&state), date(2024, 1, 5));
    }

    #[test]
    fn cleared_plan_finishes_on_start_date() {
        let engine = RecoveryEngine::default();
        let state =
            PlanState::from_persisted(0, 10, 3, 0, RecoveryMode::NormalRecovery, date(2024, 2, 28))
                .unwrap();
        assert_eq!(engine.days_remaining(&state), 0);
        assert_eq!(engine.finish_date(&state), date(2024, 2, 28));
        assert!((engine.progress_fraction(&state) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn progress_starts_at_zero() {
        let engine = RecoveryEngine::default();
        assert!(engine.progress_fraction(&plan(12, 5)).abs() < f64::EPSILON);
    }

    #[test]
    fn escalation_follows_the_miss_table() {
        let engine = RecoveryEngine::default();
        let start = plan(20, 8);

        let first = engine.miss_plan(&start);
        assert_eq!(first.state.missed_count(), 1);
        assert_eq!(first.state.daily_load(), 8);
        assert_eq!(first.state.mode(), RecoveryMode::NormalRecovery);
        assert_eq!(first.message, CheckInMessage::Reassurance);
        assert_eq!(first.event, CheckInEvent::Missed);

        let second = engine.miss_plan(&first.state);
        assert_eq!(second.state.missed_count(), 2);
        assert_eq!(second.state.daily_load(), 6);
        assert_eq!(second.state.mode(), RecoveryMode::AdjustedRecovery);
        assert_eq!(second.message, CheckInMessage::LoadReduced { from: 8, to: 6 });

        let third = engine.miss_plan(&second.state);
        assert_eq!(third.state.missed_count(), 3);
        assert_eq!(third.state.daily_load(), 1);
        assert_eq!(third.state.mode(), RecoveryMode::MinimumViableProgress);
        assert_eq!(third.message, CheckInMessage::MinimumViable { load: 1 });
        assert_eq!(
            third.message.to_string(),
            "Daily load set to 1 lecture. Momentum matters more than speed."
        );

        let fourth = engine.miss_plan(&third.state);
        assert_eq!(fourth.state.missed_count(), 4);
        assert_eq!(fourth.state.daily_load(), 1);
        assert_eq!(fourth.state.backlog(), 20);
    }

    #[test]
    fn second_miss_never_drops_below_one() {
        let engine = RecoveryEngine::default();
        let start = plan(5, 1);
        let after = engine.miss_plan(&engine.miss_plan(&start).state);
        assert_eq!(after.state.daily_load(), 1);
        assert_eq!(after.message, CheckInMessage::LoadReduced { from: 1, to: 1 });
    }

    #[test]
    fn completion_resets_streak_but_not_mode() {
        let engine = RecoveryEngine::default();
        let mut state = plan(20, 8);
        for _ in 0..2 {
            state = engine.miss_plan(&state).state;
        }

        let done = engine.complete_plan(&state);
        assert_eq!(done.state.backlog(), 14);
        assert_eq!(done.state.missed_count(), 0);
        assert_eq!(done.state.daily_load(), 6);
        assert_eq!(done.state.mode(), RecoveryMode::AdjustedRecovery);
        assert_eq!(done.message, CheckInMessage::Reclaimed { units: 6 });
        assert_eq!(
            done.message.to_string(),
            "You reclaimed 6 lecture(s). Momentum maintained."
        );

        // escalation restarts from the first threshold
        let again = engine.miss_plan(&done.state);
        assert_eq!(again.message, CheckInMessage::Reassurance);
        assert_eq!(again.state.daily_load(), 6);
    }

    #[test]
    fn completion_clamps_and_signals_cleared() {
        let engine = RecoveryEngine::default();
        let done = engine.complete_plan(&plan(5, 8));
        assert_eq!(done.state.backlog(), 0);
        assert_eq!(done.message, CheckInMessage::Reclaimed { units: 5 });
        assert!(done.is_cleared());
    }

    #[test]
    fn completing_a_cleared_plan_is_a_no_op() {
        let engine = RecoveryEngine::default();
        let cleared = engine.complete_plan(&plan(3, 3)).state;
        let again = engine.complete_plan(&cleared);
        assert_eq!(again.state, cleared);
        assert_eq!(again.message, CheckInMessage::Reclaimed { units: 0 });
        assert_eq!(again.event, CheckInEvent::Cleared);
    }

    #[test]
    fn invariants_hold_over_mixed_sequences() {
        let engine = RecoveryEngine::default();
        let mut state = plan(37, 9);
        let mut progress = engine.progress_fraction(&state);
        let mut load = state.daily_load();
        let pattern = [false, true, true, false, true, true, true, false, true, false, false];

        for completed in pattern.iter().cycle().take(60) {
            let result = if *completed {
                engine.complete_plan(&state)
            } else {
                engine.miss_plan(&state)
            };
            let next_progress = engine.progress_fraction(&result.state);
            if *completed {
                assert!(next_progress >= progress);
            } else {
                assert!((next_progress - progress).abs() < f64::EPSILON);
            }
            assert!(result.state.backlog() <= result.state.original_backlog());
            assert!(result.state.daily_load() <= load);
            progress = next_progress;
            load = result.state.daily_load();
            state = result.state;
        }
        assert!(state.is_cleared());
    }

    #[test]
    fn custom_policy_changes_thresholds() {
        let policy = RecoveryPolicy::new(1, 4, 50, 2).unwrap();
        let engine = RecoveryEngine::new(policy);
        let first = engine.miss_plan(&plan(40, 10));
        assert_eq!(first.message, CheckInMessage::LoadReduced { from: 10, to: 5 });
        let second = engine.miss_plan(&first.state);
        assert_eq!(second.message, CheckInMessage::Reassurance);
        let third = engine.miss_plan(&engine.miss_plan(&second.state).state);
        assert_eq!(third.state.daily_load(), 2);
        assert_eq!(
            third.message.to_string(),
            "Daily load set to 2 lectures. Momentum matters more than speed."
        );
    }

    #[test]
    fn subject_completion_uses_round_robin() {
        let engine = RecoveryEngine::default();
        let plan = subject_plan(&[("A", 3), ("B", 1), ("C", 5)], 4);

        let preview = engine.todays_plan(&plan);
        assert_eq!(preview, vec![Allocation::new("A", 3), Allocation::new("B", 1)]);

        let done = engine.complete_subjects(&plan);
        let left: Vec<u32> = done.state.subjects().iter().map(Subject::backlog).collect();
        assert_eq!(left, vec![1, 0, 4]);
        assert_eq!(done.message, CheckInMessage::Reclaimed { units: 4 });
        assert_eq!(done.event, CheckInEvent::Progress);
        assert_eq!(done.consumed.len(), 3);
    }

    #[test]
    fn subject_completion_signals_cleared() {
        let engine = RecoveryEngine::default();
        let plan = subject_plan(&[("A", 1), ("B", 2)], 5);
        let done = engine.complete(&Plan::Subjects(plan));
        assert!(done.is_cleared());
        assert_eq!(done.message, CheckInMessage::Reclaimed { units: 3 });
        assert!(done.state.is_cleared());
    }

    #[test]
    fn subject_miss_changes_nothing() {
        let engine = RecoveryEngine::default();
        let plan = Plan::Subjects(subject_plan(&[("A", 3)], 2));
        let missed = engine.miss(&plan);
        assert_eq!(missed.state, plan);
        assert_eq!(missed.message, CheckInMessage::MissNoted);
    }

    #[test]
    fn subject_progress_uses_totals() {
        let engine = RecoveryEngine::default();
        let plan = subject_plan(&[("A", 6), ("B", 2)], 4);
        let done = engine.complete_subjects(&plan).state;
        assert!((engine.progress_fraction(&done) - 0.5).abs() < f64::EPSILON);
        assert_eq!(engine.days_remaining(&done), 1);
    }

    #[test]
    fn todays_target_is_capped_by_backlog() {
        let engine = RecoveryEngine::default();
        assert_eq!(engine.todays_target(&plan(2, 5)), 2);
        assert_eq!(engine.todays_target(&plan(20, 5)), 5);
    }
}
