use async_trait::async_trait;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    KIND_SINGLE, KIND_SUBJECTS, date_from_text, date_to_text, map_single_row, map_subject_row,
    u32_from_i64,
};
use crate::repository::{PlanRecord, PlanRepository, StorageError, SubjectPlanRecord};

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[async_trait]
impl PlanRepository for SqliteRepository {
    async fn load_plan(&self) -> Result<Option<PlanRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT kind, backlog, original_backlog, daily_load, missed_count, mode, start_date
            FROM recovery_plan
            WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let kind: String = row.try_get("kind").map_err(ser)?;
        match kind.as_str() {
            KIND_SINGLE => Ok(Some(PlanRecord::Single(map_single_row(&row)?))),
            KIND_SUBJECTS => {
                let rows = sqlx::query(
                    r"
                    SELECT name, backlog, original
                    FROM plan_subjects
                    WHERE plan_id = 1
                    ORDER BY position
                    ",
                )
                .fetch_all(&self.pool)
                .await
                .map_err(conn)?;

                let subjects = rows
                    .iter()
                    .map(map_subject_row)
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Some(PlanRecord::Subjects(SubjectPlanRecord {
                    subjects,
                    daily_load: u32_from_i64(
                        "daily_load",
                        row.try_get("daily_load").map_err(ser)?,
                    )?,
                    start_date: date_from_text(row.try_get("start_date").map_err(ser)?)?,
                })))
            }
            other => Err(StorageError::Serialization(format!(
                "invalid plan kind: {other}"
            ))),
        }
    }

    async fn save_plan(&self, record: &PlanRecord) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let (kind, backlog, original, missed, mode, daily_load) = match record {
            PlanRecord::Single(r) => (
                KIND_SINGLE,
                Some(i64::from(r.backlog)),
                Some(i64::from(r.original_backlog)),
                Some(i64::from(r.missed_count)),
                Some(r.mode.as_str()),
                i64::from(r.daily_load),
            ),
            PlanRecord::Subjects(r) => {
                (KIND_SUBJECTS, None, None, None, None, i64::from(r.daily_load))
            }
        };

        sqlx::query(
            r"
            INSERT INTO recovery_plan (
                id,
                kind,
                backlog,
                original_backlog,
                daily_load,
                missed_count,
                mode,
                start_date
            )
            VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                kind = excluded.kind,
                backlog = excluded.backlog,
                original_backlog = excluded.original_backlog,
                daily_load = excluded.daily_load,
                missed_count = excluded.missed_count,
                mode = excluded.mode,
                start_date = excluded.start_date
            ",
        )
        .bind(kind)
        .bind(backlog)
        .bind(original)
        .bind(daily_load)
        .bind(missed)
        .bind(mode)
        .bind(record.start_date().map(date_to_text))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM plan_subjects WHERE plan_id = 1")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        if let PlanRecord::Subjects(r) = record {
            for (position, subject) in r.subjects.iter().enumerate() {
                let position = i64::try_from(position)
                    .map_err(|_| StorageError::Serialization("position overflow".into()))?;
                sqlx::query(
                    r"
                    INSERT INTO plan_subjects (position, plan_id, name, backlog, original)
                    VALUES (?1, 1, ?2, ?3, ?4)
                    ",
                )
                .bind(position)
                .bind(subject.name.as_str())
                .bind(i64::from(subject.backlog))
                .bind(i64::from(subject.original))
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn clear_plan(&self) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        sqlx::query("DELETE FROM plan_subjects")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        sqlx::query("DELETE FROM recovery_plan")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
