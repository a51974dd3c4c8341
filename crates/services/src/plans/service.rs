use std::sync::Arc;

use tracing::{debug, info, warn};

use recovery_core::engine::{CheckIn, RecoveryEngine};
use recovery_core::model::{Plan, PlanState, PlanStatus, RecoveryPolicy, SubjectPlanDraft};
use storage::repository::{PlanRecord, PlanRepository, StorageError};

use super::view::Dashboard;
use crate::Clock;
use crate::error::PlanServiceError;

/// Orchestrates setup and daily check-ins against the plan store.
///
/// Every check-in is one read-modify-write: load, apply the engine
/// transition, save. Messages travel back with the result and are never
/// stored.
#[derive(Clone)]
pub struct PlanService {
    clock: Clock,
    engine: RecoveryEngine,
    plans: Arc<dyn PlanRepository>,
}

impl PlanService {
    #[must_use]
    pub fn new(clock: Clock, plans: Arc<dyn PlanRepository>) -> Self {
        Self::with_policy(clock, RecoveryPolicy::default(), plans)
    }

    #[must_use]
    pub fn with_policy(
        clock: Clock,
        policy: RecoveryPolicy,
        plans: Arc<dyn PlanRepository>,
    ) -> Self {
        Self {
            clock,
            engine: RecoveryEngine::new(policy),
            plans,
        }
    }

    #[must_use]
    pub fn engine(&self) -> &RecoveryEngine {
        &self.engine
    }

    /// Load the stored plan and classify it.
    ///
    /// A record written without a start date is given today's date.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::Storage` if the store cannot be read or the
    /// stored record breaks plan invariants.
    pub async fn status(&self) -> Result<PlanStatus, PlanServiceError> {
        let plan = self
            .plans
            .load_plan()
            .await?
            .map(|record| record.into_plan(self.clock.today()))
            .transpose()
            .map_err(|e| {
                warn!(error = %e, "stored plan is corrupt");
                StorageError::Serialization(format!("stored plan is corrupt: {e}"))
            })?;
        Ok(PlanStatus::from_loaded(plan))
    }

    /// Snapshot of the stored plan for display, or `None` before setup.
    ///
    /// # Errors
    ///
    /// Same as [`PlanService::status`].
    pub async fn dashboard(&self) -> Result<Option<Dashboard>, PlanServiceError> {
        let status = self.status().await?;
        Ok(status
            .plan()
            .map(|plan| Dashboard::from_plan(&self.engine, plan)))
    }

    /// Start a single-backlog plan dated today.
    ///
    /// A cleared plan is replaced; an unfinished one must be reset first.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::Plan` for a zero backlog or daily load.
    /// Returns `PlanServiceError::PlanAlreadyActive` if a plan is in progress.
    /// Returns `PlanServiceError::Storage` if persistence fails.
    pub async fn start_plan(
        &self,
        total_backlog: u32,
        daily_load: u32,
    ) -> Result<Plan, PlanServiceError> {
        let plan = Plan::Single(PlanState::new(
            total_backlog,
            daily_load,
            self.clock.today(),
        )?);
        self.ensure_no_active_plan().await?;
        self.save(&plan).await?;

        info!(
            backlog = total_backlog,
            daily_load,
            start_date = %plan.start_date(),
            "recovery plan started"
        );
        Ok(plan)
    }

    /// Start a subject plan dated today from a filled-in draft.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::Plan` if the draft is empty or `daily_load` is zero.
    /// Returns `PlanServiceError::PlanAlreadyActive` if a plan is in progress.
    /// Returns `PlanServiceError::Storage` if persistence fails.
    pub async fn start_subject_plan(
        &self,
        draft: SubjectPlanDraft,
        daily_load: u32,
    ) -> Result<Plan, PlanServiceError> {
        let plan = Plan::Subjects(draft.generate(daily_load, self.clock.today())?);
        self.ensure_no_active_plan().await?;
        self.save(&plan).await?;

        info!(
            subjects = plan_subject_count(&plan),
            backlog = plan.remaining(),
            daily_load,
            "subject plan started"
        );
        Ok(plan)
    }

    /// Record that today's load was done.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::NoActivePlan` before setup.
    /// Returns `PlanServiceError::Storage` if the store cannot be read or written.
    pub async fn complete_today(&self) -> Result<CheckIn<Plan>, PlanServiceError> {
        let plan = self.current_plan().await?;
        let check_in = self.engine.complete(&plan);
        self.save(&check_in.state).await?;

        info!(
            backlog = check_in.state.remaining(),
            daily_load = check_in.state.daily_load(),
            cleared = check_in.is_cleared(),
            "check-in completed"
        );
        Ok(check_in)
    }

    /// Record that today was missed.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::NoActivePlan` before setup.
    /// Returns `PlanServiceError::Storage` if the store cannot be read or written.
    pub async fn miss_today(&self) -> Result<CheckIn<Plan>, PlanServiceError> {
        let plan = self.current_plan().await?;
        let check_in = self.engine.miss(&plan);
        self.save(&check_in.state).await?;

        match &check_in.state {
            Plan::Single(state) => info!(
                backlog = state.backlog(),
                daily_load = state.daily_load(),
                missed_count = state.missed_count(),
                mode = %state.mode(),
                "missed day recorded"
            ),
            Plan::Subjects(_) => info!("missed day noted for subject plan"),
        }
        Ok(check_in)
    }

    /// Delete the stored plan so the next load starts setup again.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::Storage` if the store cannot be modified.
    pub async fn reset(&self) -> Result<(), PlanServiceError> {
        self.plans.clear_plan().await?;
        info!("recovery plan reset");
        Ok(())
    }

    async fn current_plan(&self) -> Result<Plan, PlanServiceError> {
        self.status()
            .await?
            .into_plan()
            .ok_or(PlanServiceError::NoActivePlan)
    }

    async fn ensure_no_active_plan(&self) -> Result<(), PlanServiceError> {
        match self.status().await? {
            PlanStatus::Active(_) => Err(PlanServiceError::PlanAlreadyActive),
            PlanStatus::NoPlan | PlanStatus::Cleared(_) => Ok(()),
        }
    }

    async fn save(&self, plan: &Plan) -> Result<(), PlanServiceError> {
        self.plans.save_plan(&PlanRecord::from_plan(plan)).await?;
        debug!(backlog = plan.remaining(), "plan saved");
        Ok(())
    }
}

fn plan_subject_count(plan: &Plan) -> usize {
    match plan {
        Plan::Single(_) => 0,
        Plan::Subjects(subjects) => subjects.subjects().len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use recovery_core::engine::{CheckInEvent, CheckInMessage};
    use recovery_core::model::{PlanError, RecoveryMode};
    use recovery_core::time::{fixed_clock, fixed_today};
    use storage::repository::{InMemoryRepository, SinglePlanRecord};

    /// Store that reads back a fixed record and refuses every write.
    struct ReadOnlyRepository {
        record: Option<PlanRecord>,
    }

    #[async_trait]
    impl PlanRepository for ReadOnlyRepository {
        async fn load_plan(&self) -> Result<Option<PlanRecord>, StorageError> {
            Ok(self.record.clone())
        }

        async fn save_plan(&self, _record: &PlanRecord) -> Result<(), StorageError> {
            Err(StorageError::Io("disk full".into()))
        }

        async fn clear_plan(&self) -> Result<(), StorageError> {
            Err(StorageError::Io("disk full".into()))
        }
    }

    fn single_record(backlog: u32, original_backlog: u32) -> PlanRecord {
        PlanRecord::Single(SinglePlanRecord {
            backlog,
            original_backlog,
            daily_load: 4,
            missed_count: 0,
            mode: RecoveryMode::NormalRecovery,
            start_date: Some(fixed_today()),
        })
    }

    fn service() -> (PlanService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        let service = PlanService::new(fixed_clock(), Arc::new(repo.clone()));
        (service, repo)
    }

    #[tokio::test]
    async fn status_is_no_plan_before_setup() {
        let (service, _) = service();
        assert_eq!(service.status().await.unwrap(), PlanStatus::NoPlan);
        assert!(service.dashboard().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn start_plan_persists_fresh_state() {
        let (service, repo) = service();
        let plan = service.start_plan(20, 4).await.unwrap();
        assert_eq!(plan.start_date(), fixed_today());

        let stored = repo.load_plan().await.unwrap().unwrap();
        assert_eq!(stored, PlanRecord::from_plan(&plan));
        assert!(matches!(service.status().await.unwrap(), PlanStatus::Active(_)));
    }

    #[tokio::test]
    async fn start_plan_rejects_invalid_input_without_saving() {
        let (service, repo) = service();
        let err = service.start_plan(0, 3).await.unwrap_err();
        assert!(matches!(err, PlanServiceError::Plan(PlanError::InvalidBacklog)));

        let err = service.start_plan(5, 0).await.unwrap_err();
        assert!(matches!(err, PlanServiceError::Plan(PlanError::InvalidDailyLoad)));
        assert!(repo.load_plan().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn start_plan_refuses_to_overwrite_active_plan() {
        let (service, _) = service();
        service.start_plan(5, 1).await.unwrap();
        let err = service.start_plan(9, 2).await.unwrap_err();
        assert!(matches!(err, PlanServiceError::PlanAlreadyActive));
    }

    #[tokio::test]
    async fn cleared_plan_can_be_replaced() {
        let (service, _) = service();
        service.start_plan(2, 5).await.unwrap();
        let check_in = service.complete_today().await.unwrap();
        assert_eq!(check_in.event, CheckInEvent::Cleared);
        assert!(service.status().await.unwrap().is_cleared());

        service.start_plan(6, 2).await.unwrap();
        assert!(matches!(service.status().await.unwrap(), PlanStatus::Active(_)));
    }

    #[tokio::test]
    async fn check_ins_require_a_plan() {
        let (service, _) = service();
        assert!(matches!(
            service.complete_today().await.unwrap_err(),
            PlanServiceError::NoActivePlan
        ));
        assert!(matches!(
            service.miss_today().await.unwrap_err(),
            PlanServiceError::NoActivePlan
        ));
    }

    #[tokio::test]
    async fn miss_then_complete_resets_streak() {
        let (service, _) = service();
        service.start_plan(20, 8).await.unwrap();

        let first = service.miss_today().await.unwrap();
        assert_eq!(first.message, CheckInMessage::Reassurance);

        let done = service.complete_today().await.unwrap();
        assert_eq!(done.message, CheckInMessage::Reclaimed { units: 8 });

        let Some(Plan::Single(state)) = service.status().await.unwrap().into_plan() else {
            panic!("expected single plan");
        };
        assert_eq!(state.backlog(), 12);
        assert_eq!(state.missed_count(), 0);
        assert_eq!(state.mode(), RecoveryMode::NormalRecovery);
    }

    #[tokio::test]
    async fn subject_plan_round_trips_through_service() {
        let (service, _) = service();
        let mut draft = SubjectPlanDraft::new();
        draft
            .add_subject("A", 3)
            .unwrap()
            .add_subject("B", 1)
            .unwrap()
            .add_subject("C", 5)
            .unwrap();
        service.start_subject_plan(draft, 3).await.unwrap();

        let check_in = service.complete_today().await.unwrap();
        assert_eq!(check_in.message, CheckInMessage::Reclaimed { units: 3 });

        let view = service.dashboard().await.unwrap().unwrap();
        let backlogs: Vec<u32> = view.subjects.iter().map(|s| s.backlog).collect();
        assert_eq!(backlogs, vec![2, 0, 4]);
        assert_eq!(view.mode, None);
    }

    #[tokio::test]
    async fn custom_policy_reduces_on_first_miss() {
        let policy = RecoveryPolicy::new(1, 3, 50, 2).unwrap();
        let service = PlanService::with_policy(
            fixed_clock(),
            policy,
            Arc::new(InMemoryRepository::new()),
        );
        service.start_plan(30, 10).await.unwrap();

        let check_in = service.miss_today().await.unwrap();
        assert_eq!(check_in.message, CheckInMessage::LoadReduced { from: 10, to: 5 });
        assert_eq!(service.engine().policy().minimum_load(), 2);
    }

    #[tokio::test]
    async fn empty_subject_draft_is_rejected() {
        let (service, _) = service();
        let err = service
            .start_subject_plan(SubjectPlanDraft::new(), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, PlanServiceError::Plan(PlanError::NoSubjects)));
    }

    #[tokio::test]
    async fn corrupt_record_is_a_storage_error() {
        let repo = InMemoryRepository::new();
        repo.save_plan(&single_record(12, 10)).await.unwrap();
        let service = PlanService::new(fixed_clock(), Arc::new(repo));

        assert!(matches!(
            service.status().await.unwrap_err(),
            PlanServiceError::Storage(StorageError::Serialization(_))
        ));
        assert!(matches!(
            service.complete_today().await.unwrap_err(),
            PlanServiceError::Storage(StorageError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn failed_save_aborts_check_ins() {
        let service = PlanService::new(
            fixed_clock(),
            Arc::new(ReadOnlyRepository {
                record: Some(single_record(10, 10)),
            }),
        );

        assert!(matches!(
            service.complete_today().await.unwrap_err(),
            PlanServiceError::Storage(StorageError::Io(_))
        ));
        assert!(matches!(
            service.miss_today().await.unwrap_err(),
            PlanServiceError::Storage(StorageError::Io(_))
        ));

        let Some(Plan::Single(state)) = service.status().await.unwrap().into_plan() else {
            panic!("expected single plan");
        };
        assert_eq!(state.backlog(), 10);
        assert_eq!(state.missed_count(), 0);
    }

    #[tokio::test]
    async fn failed_save_leaves_no_plan_behind() {
        let service = PlanService::new(
            fixed_clock(),
            Arc::new(ReadOnlyRepository { record: None }),
        );

        assert!(matches!(
            service.start_plan(10, 2).await.unwrap_err(),
            PlanServiceError::Storage(StorageError::Io(_))
        ));
        assert_eq!(service.status().await.unwrap(), PlanStatus::NoPlan);
    }
}
