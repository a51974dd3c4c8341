use async_trait::async_trait;
use chrono::NaiveDate;
use recovery_core::model::{Plan, PlanError, PlanState, RecoveryMode, Subject, SubjectPlan};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("i/o error: {0}")]
    Io(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Persisted shape of a single-backlog plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinglePlanRecord {
    pub backlog: u32,
    pub original_backlog: u32,
    pub daily_load: u32,
    pub missed_count: u32,
    pub mode: RecoveryMode,
    /// Older records were written without a start date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

/// Persisted shape of one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub name: String,
    pub backlog: u32,
    pub original: u32,
}

/// Persisted shape of a subject plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectPlanRecord {
    pub subjects: Vec<SubjectRecord>,
    pub daily_load: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

/// Flat record exchanged with a plan store.
///
/// This mirrors the domain `Plan` so repositories can serialize/deserialize
/// without leaking storage concerns into the domain layer. The two shapes are
/// told apart by the presence of `subjects`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlanRecord {
    Subjects(SubjectPlanRecord),
    Single(SinglePlanRecord),
}

impl PlanRecord {
    #[must_use]
    pub fn from_plan(plan: &Plan) -> Self {
        match plan {
            Plan::Single(state) => PlanRecord::Single(SinglePlanRecord {
                backlog: state.backlog(),
                original_backlog: state.original_backlog(),
                daily_load: state.daily_load(),
                missed_count: state.missed_count(),
                mode: state.mode(),
                start_date: Some(state.start_date()),
            }),
            Plan::Subjects(plan) => PlanRecord::Subjects(SubjectPlanRecord {
                subjects: plan
                    .subjects()
                    .iter()
                    .map(|subject| SubjectRecord {
                        name: subject.name().to_owned(),
                        backlog: subject.backlog(),
                        original: subject.original(),
                    })
                    .collect(),
                daily_load: plan.daily_load(),
                start_date: Some(plan.start_date()),
            }),
        }
    }

    /// Start date as stored, if the record has one.
    #[must_use]
    pub fn start_date(&self) -> Option<NaiveDate> {
        match self {
            PlanRecord::Single(record) => record.start_date,
            PlanRecord::Subjects(record) => record.start_date,
        }
    }

    /// Convert the record back into a domain `Plan`.
    ///
    /// `fallback_start` is used only when the record has no start date.
    ///
    /// # Errors
    ///
    /// Returns `PlanError` if the stored values break plan invariants.
    pub fn into_plan(self, fallback_start: NaiveDate) -> Result<Plan, PlanError> {
        match self {
            PlanRecord::Single(record) => PlanState::from_persisted(
                record.backlog,
                record.original_backlog,
                record.daily_load,
                record.missed_count,
                record.mode,
                record.start_date.unwrap_or(fallback_start),
            )
            .map(Plan::Single),
            PlanRecord::Subjects(record) => {
                let subjects = record
                    .subjects
                    .into_iter()
                    .map(|s| Subject::from_persisted(s.name, s.backlog, s.original))
                    .collect::<Result<Vec<_>, _>>()?;
                SubjectPlan::from_persisted(
                    subjects,
                    record.daily_load,
                    record.start_date.unwrap_or(fallback_start),
                )
                .map(Plan::Subjects)
            }
        }
    }
}

//
// ─── REPOSITORY ────────────────────────────────────────────────────────────────
//

/// Store for the one active recovery plan.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Fetch the persisted plan, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or the record is corrupt.
    async fn load_plan(&self) -> Result<Option<PlanRecord>, StorageError>;

    /// Persist the plan, replacing whatever was stored. Never writes partially.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the plan cannot be stored.
    async fn save_plan(&self, record: &PlanRecord) -> Result<(), StorageError>;

    /// Delete the persisted plan. Succeeds when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be modified.
    async fn clear_plan(&self) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    plan: Arc<Mutex<Option<PlanRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            plan: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl PlanRepository for InMemoryRepository {
    async fn load_plan(&self) -> Result<Option<PlanRecord>, StorageError> {
        let guard = self
            .plan
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save_plan(&self, record: &PlanRecord) -> Result<(), StorageError> {
        let mut guard = self
            .plan
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(record.clone());
        Ok(())
    }

    async fn clear_plan(&self) -> Result<(), StorageError> {
        let mut guard = self
            .plan
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// Plan store behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub plans: Arc<dyn PlanRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let plans: Arc<dyn PlanRepository> = Arc::new(InMemoryRepository::new());
        Self { plans }
    }
}
