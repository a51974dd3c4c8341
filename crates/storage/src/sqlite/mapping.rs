use chrono::NaiveDate;
use recovery_core::model::RecoveryMode;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{SinglePlanRecord, StorageError, SubjectRecord};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) const KIND_SINGLE: &str = "single";
pub(crate) const KIND_SUBJECTS: &str = "subjects";

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn required_u32(row: &SqliteRow, field: &'static str) -> Result<u32, StorageError> {
    let value: Option<i64> = row.try_get(field).map_err(ser)?;
    let value = value.ok_or_else(|| StorageError::Serialization(format!("missing {field}")))?;
    u32_from_i64(field, value)
}

pub(crate) fn date_to_text(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn date_from_text(raw: Option<String>) -> Result<Option<NaiveDate>, StorageError> {
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, DATE_FORMAT)
            .map_err(|_| StorageError::Serialization(format!("invalid start_date: {s}")))
    })
    .transpose()
}

pub(crate) fn map_single_row(row: &SqliteRow) -> Result<SinglePlanRecord, StorageError> {
    let mode: Option<String> = row.try_get("mode").map_err(ser)?;
    let mode = mode
        .ok_or_else(|| StorageError::Serialization("missing mode".into()))?
        .parse::<RecoveryMode>()
        .map_err(ser)?;

    Ok(SinglePlanRecord {
        backlog: required_u32(row, "backlog")?,
        original_backlog: required_u32(row, "original_backlog")?,
        daily_load: required_u32(row, "daily_load")?,
        missed_count: required_u32(row, "missed_count")?,
        mode,
        start_date: date_from_text(row.try_get("start_date").map_err(ser)?)?,
    })
}

pub(crate) fn map_subject_row(row: &SqliteRow) -> Result<SubjectRecord, StorageError> {
    Ok(SubjectRecord {
        name: row.try_get("name").map_err(ser)?,
        backlog: u32_from_i64("backlog", row.try_get("backlog").map_err(ser)?)?,
        original: u32_from_i64("original", row.try_get("original").map_err(ser)?)?,
    })
}
