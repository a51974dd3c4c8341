use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned migrations for the current schema.
///
/// Version 1 creates the singleton plan row and the ordered subject list.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: recovery plan + subjects.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS recovery_plan (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    kind TEXT NOT NULL CHECK (kind IN ('single', 'subjects')),
                    backlog INTEGER CHECK (backlog >= 0),
                    original_backlog INTEGER CHECK (original_backlog >= 1),
                    daily_load INTEGER NOT NULL CHECK (daily_load >= 1),
                    missed_count INTEGER CHECK (missed_count >= 0),
                    mode TEXT,
                    start_date TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS plan_subjects (
                    position INTEGER PRIMARY KEY,
                    plan_id INTEGER NOT NULL DEFAULT 1,
                    name TEXT NOT NULL,
                    backlog INTEGER NOT NULL CHECK (backlog >= 0),
                    original INTEGER NOT NULL CHECK (original >= 1),
                    FOREIGN KEY (plan_id) REFERENCES recovery_plan(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
