use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::db::repository::{decode_rows, ScanRows};
use crate::error::{AppError, AppResult};

// ============================================================================
// Goal Repository
// ============================================================================

pub struct GoalRepository;

const GOAL_COLUMNS: &str = "id, user_id, goal_type, target_value, progress_value, time_frame, \
                            is_completed, archived, created_at, updated_at";

impl GoalRepository {
    pub async fn find_by_id(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
    ) -> AppResult<Option<Goal>> {
        sqlx::query_as::<_, Goal>(&format!(
            "SELECT {GOAL_COLUMNS} FROM user_goals WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Lookup by the natural key. Archived goals are returned too.
    pub async fn find_by_user_and_type(
        pool: &SqlitePool,
        user_id: &str,
        goal_type: &str,
    ) -> AppResult<Option<Goal>> {
        sqlx::query_as::<_, Goal>(&format!(
            "SELECT {GOAL_COLUMNS} FROM user_goals WHERE user_id = ? AND goal_type = ?"
        ))
        .bind(user_id)
        .bind(goal_type)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        goal_type: &str,
        values: &GoalValues,
        now: NaiveDateTime,
    ) -> AppResult<Goal> {
        let id = Uuid::new_v4().to_string();

        sqlx::query_as::<_, Goal>(&format!(
            r#"
            INSERT INTO user_goals (
                id, user_id, goal_type, target_value, progress_value, time_frame,
                is_completed, archived, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            RETURNING {GOAL_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(goal_type)
        .bind(values.target_value)
        .bind(values.progress_value)
        .bind(values.time_frame.as_str())
        .bind(values.is_completed)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Overwrite the tracked values, optionally un-archiving. `None` when the
    /// goal is missing or owned by someone else.
    pub async fn update_values(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
        values: &GoalValues,
        unarchive: bool,
        now: NaiveDateTime,
    ) -> AppResult<Option<Goal>> {
        sqlx::query_as::<_, Goal>(&format!(
            r#"
            UPDATE user_goals
            SET target_value = ?, progress_value = ?, time_frame = ?, is_completed = ?,
                archived = CASE WHEN ? THEN 0 ELSE archived END, updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING {GOAL_COLUMNS}
            "#
        ))
        .bind(values.target_value)
        .bind(values.progress_value)
        .bind(values.time_frame.as_str())
        .bind(values.is_completed)
        .bind(unarchive)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_user(
        pool: &SqlitePool,
        user_id: &str,
        filter: &GoalFilter,
    ) -> AppResult<Vec<Goal>> {
        // The ORDER BY column comes from a closed enum, never from user input.
        let direction = if filter.ascending { "ASC" } else { "DESC" };
        let sql = format!(
            r#"
            SELECT {GOAL_COLUMNS}
            FROM user_goals
            WHERE user_id = ?
              AND (? IS NULL OR is_completed = ?)
              AND (? OR archived = 0)
            ORDER BY {} {direction}, id ASC
            LIMIT ?
            OFFSET ?
            "#,
            filter.sort.column()
        );

        sqlx::query_as::<_, Goal>(&sql)
            .bind(user_id)
            .bind(filter.completed)
            .bind(filter.completed)
            .bind(filter.include_archived)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)
    }

    /// Set the archived flag. Returns false when nothing changed (missing,
    /// not owned, or already in the requested state).
    pub async fn set_archived(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
        archived: bool,
        now: NaiveDateTime,
    ) -> AppResult<bool> {
        let res = sqlx::query(
            r#"
            UPDATE user_goals
            SET archived = ?, updated_at = ?
            WHERE id = ? AND user_id = ? AND archived = ?
            "#,
        )
        .bind(archived)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .bind(!archived)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(res.rows_affected() > 0)
    }

    /// Open goals untouched since `cutoff`.
    ///
    /// Rows that fail to decode are counted in `undecodable` and left out.
    pub async fn find_stale(
        pool: &SqlitePool,
        cutoff: NaiveDateTime,
    ) -> AppResult<ScanRows<StaleGoal>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, goal_type
            FROM user_goals
            WHERE is_completed = 0 AND archived = 0 AND updated_at <= ?
            ORDER BY updated_at ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(decode_rows(&rows, "goal"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{at, memory_pool, seed_user};

    fn values(target: i64, progress: i64) -> GoalValues {
        GoalValues {
            target_value: target,
            progress_value: progress,
            time_frame: TimeFrame::Daily,
            is_completed: progress >= target,
        }
    }

    fn filter() -> GoalFilter {
        GoalFilter {
            completed: None,
            include_archived: false,
            sort: GoalSort::CreatedAt,
            ascending: false,
            limit: 10,
            offset: 0,
        }
    }

    #[tokio::test]
    async fn update_unarchives_and_is_owner_scoped() {
        let pool = memory_pool().await;
        let owner = seed_user(&pool, "o@example.com").await;
        let other = seed_user(&pool, "x@example.com").await;
        let now = at("2026-05-01 10:00:00");

        let goal = GoalRepository::create(&pool, &owner.id, "steps", &values(10, 0), now)
            .await
            .unwrap();
        assert!(GoalRepository::set_archived(&pool, &owner.id, &goal.id, true, now)
            .await
            .unwrap());
        // Already archived.
        assert!(!GoalRepository::set_archived(&pool, &owner.id, &goal.id, true, now)
            .await
            .unwrap());

        assert!(
            GoalRepository::update_values(&pool, &other.id, &goal.id, &values(10, 5), true, now)
                .await
                .unwrap()
                .is_none()
        );

        let kept = GoalRepository::update_values(&pool, &owner.id, &goal.id, &values(10, 4), false, now)
            .await
            .unwrap()
            .unwrap();
        assert!(kept.archived);

        let updated = GoalRepository::update_values(&pool, &owner.id, &goal.id, &values(10, 5), true, now)
            .await
            .unwrap()
            .unwrap();
        assert!(!updated.archived);
        assert_eq!(updated.progress_value, 5);
    }

    #[tokio::test]
    async fn listing_filters_and_sorts() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "l@example.com").await;

        GoalRepository::create(&pool, &user.id, "water", &values(8, 8), at("2026-05-01 08:00:00"))
            .await
            .unwrap();
        let archived =
            GoalRepository::create(&pool, &user.id, "sleep", &values(7, 1), at("2026-05-01 09:00:00"))
                .await
                .unwrap();
        GoalRepository::create(&pool, &user.id, "steps", &values(10000, 50), at("2026-05-01 10:00:00"))
            .await
            .unwrap();
        GoalRepository::set_archived(&pool, &user.id, &archived.id, true, at("2026-05-02 00:00:00"))
            .await
            .unwrap();

        let goals = GoalRepository::find_by_user(&pool, &user.id, &filter())
            .await
            .unwrap();
        let names: Vec<_> = goals.iter().map(|g| g.goal_type.as_str()).collect();
        assert_eq!(names, vec!["steps", "water"]);

        let by_target = GoalFilter {
            sort: GoalSort::TargetValue,
            ascending: true,
            include_archived: true,
            ..filter()
        };
        let goals = GoalRepository::find_by_user(&pool, &user.id, &by_target)
            .await
            .unwrap();
        let names: Vec<_> = goals.iter().map(|g| g.goal_type.as_str()).collect();
        assert_eq!(names, vec!["sleep", "water", "steps"]);

        let completed = GoalFilter {
            completed: Some(true),
            ..filter()
        };
        let goals = GoalRepository::find_by_user(&pool, &user.id, &completed)
            .await
            .unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].goal_type, "water");
    }

    #[tokio::test]
    async fn stale_goals_exclude_completed_and_archived() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "s@example.com").await;
        let old = at("2026-05-01 00:00:00");

        let open = GoalRepository::create(&pool, &user.id, "open goal", &values(10, 1), old)
            .await
            .unwrap();
        GoalRepository::create(&pool, &user.id, "done goal", &values(10, 10), old)
            .await
            .unwrap();
        let gone = GoalRepository::create(&pool, &user.id, "gone goal", &values(10, 1), old)
            .await
            .unwrap();
        GoalRepository::set_archived(&pool, &user.id, &gone.id, true, old)
            .await
            .unwrap();
        GoalRepository::create(&pool, &user.id, "fresh goal", &values(10, 1), at("2026-05-05 00:00:00"))
            .await
            .unwrap();

        let stale = GoalRepository::find_stale(&pool, at("2026-05-02 00:00:00"))
            .await
            .unwrap();
        assert_eq!(stale.undecodable, 0);
        assert_eq!(stale.rows.len(), 1);
        assert_eq!(stale.rows[0].id, open.id);
    }
}
