use crate::model::plan::Plan;

/// Where the user stands, derived entirely from what storage returned.
///
/// Replaces both the "plan generated" session flag and the overloaded
/// `backlog == 0` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlanStatus {
    /// Nothing persisted; the caller should run setup.
    #[default]
    NoPlan,
    /// A plan with backlog still to reclaim.
    Active(Plan),
    /// A plan whose backlog reached zero; the caller may celebrate and offer a reset.
    Cleared(Plan),
}

impl PlanStatus {
    /// Classify a loaded plan (or its absence).
    #[must_use]
    pub fn from_loaded(plan: Option<Plan>) -> Self {
        match plan {
            None => PlanStatus::NoPlan,
            Some(plan) if plan.is_cleared() => PlanStatus::Cleared(plan),
            Some(plan) => PlanStatus::Active(plan),
        }
    }

    /// True when setup has produced a plan, whether or not it is finished.
    #[must_use]
    pub fn is_plan_generated(&self) -> bool {
        !matches!(self, PlanStatus::NoPlan)
    }

    #[must_use]
    pub fn is_cleared(&self) -> bool {
        matches!(self, PlanStatus::Cleared(_))
    }

    #[must_use]
    pub fn plan(&self) -> Option<&Plan> {
        match self {
            PlanStatus::NoPlan => None,
            PlanStatus::Active(plan) | PlanStatus::Cleared(plan) => Some(plan),
        }
    }

    #[must_use]
    pub fn into_plan(self) -> Option<Plan> {
        match self {
            PlanStatus::NoPlan => None,
            PlanStatus::Active(plan) | PlanStatus::Cleared(plan) => Some(plan),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlanState, RecoveryMode};
    use crate::time::fixed_today;

    #[test]
    fn absent_plan_means_setup() {
        let status = PlanStatus::from_loaded(None);
        assert_eq!(status, PlanStatus::NoPlan);
        assert!(!status.is_plan_generated());
        assert!(status.plan().is_none());
    }

    #[test]
    fn zero_backlog_is_cleared_not_missing() {
        let state =
            PlanState::from_persisted(0, 12, 3, 0, RecoveryMode::NormalRecovery, fixed_today())
                .unwrap();
        let status = PlanStatus::from_loaded(Some(state.into()));
        assert!(status.is_cleared());
        assert!(status.is_plan_generated());
    }

    #[test]
    fn pending_backlog_is_active() {
        let state = PlanState::new(12, 3, fixed_today()).unwrap();
        let status = PlanStatus::from_loaded(Some(state.clone().into()));
        assert_eq!(status, PlanStatus::Active(Plan::Single(state)));
    }
}
