use chrono::{NaiveDate, NaiveDateTime};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::db::repository::{decode_rows, ScanRows};
use crate::error::{AppError, AppResult};

// ============================================================================
// Workout Repository
// ============================================================================

pub struct WorkoutRepository;

const WORKOUT_COLUMNS: &str = "id, user_id, name, workout_type, duration_min, calories_burned, \
                               weight, reps, workout_date, start_time, created_at, updated_at";

impl WorkoutRepository {
    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        values: &WorkoutValues,
        now: NaiveDateTime,
    ) -> AppResult<Workout> {
        let id = Uuid::new_v4().to_string();

        sqlx::query_as::<_, Workout>(&format!(
            r#"
            INSERT INTO workouts (
                id, user_id, name, workout_type, duration_min, calories_burned,
                weight, reps, workout_date, start_time, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {WORKOUT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(&values.name)
        .bind(&values.workout_type)
        .bind(values.duration_min)
        .bind(values.calories_burned)
        .bind(values.weight)
        .bind(values.reps)
        .bind(values.workout_date)
        .bind(values.start_time)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_user(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<Workout>> {
        sqlx::query_as::<_, Workout>(&format!(
            r#"
            SELECT {WORKOUT_COLUMNS}
            FROM workouts
            WHERE user_id = ?
            ORDER BY workout_date DESC, start_time DESC, created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn update(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
        values: &WorkoutValues,
        now: NaiveDateTime,
    ) -> AppResult<Option<Workout>> {
        sqlx::query_as::<_, Workout>(&format!(
            r#"
            UPDATE workouts
            SET name = ?, workout_type = ?, duration_min = ?, calories_burned = ?,
                weight = ?, reps = ?, workout_date = ?, start_time = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING {WORKOUT_COLUMNS}
            "#
        ))
        .bind(&values.name)
        .bind(&values.workout_type)
        .bind(values.duration_min)
        .bind(values.calories_burned)
        .bind(values.weight)
        .bind(values.reps)
        .bind(values.workout_date)
        .bind(values.start_time)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn delete(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM workouts WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(res.rows_affected() > 0)
    }

    /// All workouts (any user) dated `date`.
    pub async fn find_scheduled_on(
        pool: &SqlitePool,
        date: NaiveDate,
    ) -> AppResult<ScanRows<ScheduledWorkout>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, name, workout_date, start_time
            FROM workouts
            WHERE workout_date = ?
            ORDER BY start_time ASC, id ASC
            "#,
        )
        .bind(date)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(decode_rows(&rows, "workout"))
    }

    /// Workouts dated `date` that have a planned start time.
    pub async fn find_timed_on(
        pool: &SqlitePool,
        date: NaiveDate,
    ) -> AppResult<ScanRows<ScheduledWorkout>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, name, workout_date, start_time
            FROM workouts
            WHERE workout_date = ? AND start_time IS NOT NULL
            ORDER BY start_time ASC, id ASC
            "#,
        )
        .bind(date)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(decode_rows(&rows, "workout"))
    }
}
