use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Notification Repository
// ============================================================================

pub struct NotificationRepository;

impl NotificationRepository {
    /// Insert an unread notification with `created_at = updated_at = now`.
    pub async fn create(
        pool: &SqlitePool,
        key: &AlertKey,
        message: &str,
        now: NaiveDateTime,
    ) -> AppResult<Notification> {
        let id = Uuid::new_v4().to_string();

        sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (
                id, user_id, related_id, kind, dedup_bucket, message, is_read, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
            RETURNING
                id, user_id, related_id, kind, dedup_bucket, message, is_read, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&key.user_id)
        .bind(&key.related_id)
        .bind(key.kind.as_str())
        .bind(&key.bucket)
        .bind(message)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Whether a notification with this key was created at or after `since`.
    ///
    /// `IS` is used for the nullable columns so a missing related id / bucket
    /// matches another missing one.
    pub async fn exists_since(
        pool: &SqlitePool,
        key: &AlertKey,
        since: NaiveDateTime,
    ) -> AppResult<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT 1
            FROM notifications
            WHERE user_id = ?
              AND related_id IS ?
              AND kind = ?
              AND dedup_bucket IS ?
              AND created_at >= ?
            LIMIT 1
            "#,
        )
        .bind(&key.user_id)
        .bind(&key.related_id)
        .bind(key.kind.as_str())
        .bind(&key.bucket)
        .bind(since)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(found.is_some())
    }

    /// Notifications for a user, newest first.
    pub async fn find_by_user(
        pool: &SqlitePool,
        user_id: &str,
        filter: &NotificationFilter,
    ) -> AppResult<Vec<Notification>> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, related_id, kind, dedup_bucket, message, is_read, created_at, updated_at
            FROM notifications
            WHERE user_id = ?
              AND (? IS NULL OR is_read = ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(filter.is_read)
        .bind(filter.is_read)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Count notifications for a user, optionally only read/unread ones.
    pub async fn count_by_user(
        pool: &SqlitePool,
        user_id: &str,
        is_read: Option<bool>,
    ) -> AppResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND (? IS NULL OR is_read = ?)",
        )
        .bind(user_id)
        .bind(is_read)
        .bind(is_read)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Mark one unread notification as read. Returns false when the row does
    /// not exist, belongs to someone else, or is already read.
    pub async fn mark_read(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
        now: NaiveDateTime,
    ) -> AppResult<bool> {
        let res = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = 1, updated_at = MAX(created_at, ?)
            WHERE id = ? AND user_id = ? AND is_read = 0
            "#,
        )
        .bind(now)
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(res.rows_affected() > 0)
    }

    /// Mark every unread notification of the user as read; returns how many changed.
    pub async fn mark_all_read(
        pool: &SqlitePool,
        user_id: &str,
        now: NaiveDateTime,
    ) -> AppResult<u64> {
        let res = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = 1, updated_at = MAX(created_at, ?)
            WHERE user_id = ? AND is_read = 0
            "#,
        )
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(res.rows_affected())
    }

    /// Delete one notification owned by the user. Returns false when nothing matched.
    pub async fn delete(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(res.rows_affected() > 0)
    }

    /// Delete all notifications of the user; returns how many were removed.
    pub async fn delete_all(pool: &SqlitePool, user_id: &str) -> AppResult<u64> {
        let res = sqlx::query("DELETE FROM notifications WHERE user_id = ?")
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(res.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{at, memory_pool, seed_user};

    #[tokio::test]
    async fn exists_since_matches_structured_key() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "a@example.com").await;
        let now = at("2026-10-19 12:00:00");

        let key = AlertKey::new(&user.id, Some("goal-1"), AlertKind::GoalCompleted);
        NotificationRepository::create(&pool, &key, "done", now)
            .await
            .unwrap();

        // Boundary is inclusive.
        assert!(NotificationRepository::exists_since(&pool, &key, now)
            .await
            .unwrap());
        assert!(!NotificationRepository::exists_since(
            &pool,
            &key,
            at("2026-10-19 12:00:01")
        )
        .await
        .unwrap());

        let other_kind = AlertKey::new(&user.id, Some("goal-1"), AlertKind::GoalNearCompletion);
        assert!(
            !NotificationRepository::exists_since(&pool, &other_kind, now)
                .await
                .unwrap()
        );

        let other_goal = AlertKey::new(&user.id, Some("goal-2"), AlertKind::GoalCompleted);
        assert!(
            !NotificationRepository::exists_since(&pool, &other_goal, now)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn null_related_id_and_bucket_match_each_other() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "a@example.com").await;
        let now = at("2026-10-19 12:00:00");

        let key = AlertKey::new(&user.id, None, AlertKind::WorkoutScheduled);
        NotificationRepository::create(&pool, &key, "x", now)
            .await
            .unwrap();
        assert!(NotificationRepository::exists_since(&pool, &key, now)
            .await
            .unwrap());

        let bucketed = key.clone().with_bucket("18:00");
        assert!(!NotificationRepository::exists_since(&pool, &bucketed, now)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn list_is_newest_first_and_filtered() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "a@example.com").await;
        let key = AlertKey::new(&user.id, None, AlertKind::WorkoutScheduled);

        let first = NotificationRepository::create(&pool, &key, "first", at("2026-10-19 08:00:00"))
            .await
            .unwrap();
        NotificationRepository::create(&pool, &key, "second", at("2026-10-19 09:00:00"))
            .await
            .unwrap();
        NotificationRepository::mark_read(&pool, &user.id, &first.id, at("2026-10-19 10:00:00"))
            .await
            .unwrap();

        let all = NotificationFilter {
            is_read: None,
            limit: 10,
            offset: 0,
        };
        let items = NotificationRepository::find_by_user(&pool, &user.id, &all)
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].message, "second");
        assert_eq!(items[1].message, "first");

        let unread = NotificationFilter {
            is_read: Some(false),
            ..all.clone()
        };
        let items = NotificationRepository::find_by_user(&pool, &user.id, &unread)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].message, "second");

        assert_eq!(
            NotificationRepository::count_by_user(&pool, &user.id, Some(true))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn mutations_are_scoped_to_owner_and_idempotent() {
        let pool = memory_pool().await;
        let owner = seed_user(&pool, "owner@example.com").await;
        let other = seed_user(&pool, "other@example.com").await;
        let now = at("2026-10-19 08:00:00");

        let key = AlertKey::new(&owner.id, None, AlertKind::WorkoutScheduled);
        let n = NotificationRepository::create(&pool, &key, "hi", now)
            .await
            .unwrap();

        assert!(!NotificationRepository::mark_read(&pool, &other.id, &n.id, now)
            .await
            .unwrap());
        assert!(NotificationRepository::mark_read(&pool, &owner.id, &n.id, now)
            .await
            .unwrap());
        // Already read: nothing to do.
        assert!(!NotificationRepository::mark_read(&pool, &owner.id, &n.id, now)
            .await
            .unwrap());

        assert!(!NotificationRepository::delete(&pool, &other.id, &n.id)
            .await
            .unwrap());
        assert!(NotificationRepository::delete(&pool, &owner.id, &n.id)
            .await
            .unwrap());
        assert!(!NotificationRepository::delete(&pool, &owner.id, &n.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn mark_read_never_moves_updated_at_before_created_at() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "a@example.com").await;
        let key = AlertKey::new(&user.id, None, AlertKind::WorkoutScheduled);
        let n = NotificationRepository::create(&pool, &key, "hi", at("2026-10-19 08:00:00"))
            .await
            .unwrap();

        // A clock that went backwards.
        NotificationRepository::mark_all_read(&pool, &user.id, at("2026-10-19 07:00:00"))
            .await
            .unwrap();

        let filter = NotificationFilter {
            is_read: None,
            limit: 10,
            offset: 0,
        };
        let items = NotificationRepository::find_by_user(&pool, &user.id, &filter)
            .await
            .unwrap();
        assert_eq!(items[0].id, n.id);
        assert!(items[0].is_read);
        assert!(items[0].updated_at >= items[0].created_at);
    }
}
