use std::sync::Arc;

use chrono::Duration;
use sqlx::SqlitePool;

use crate::db::{AlertKey, Notification, NotificationFilter, NotificationRepository};
use crate::error::{AppError, AppResult};
use crate::services::clock::Clock;
use crate::services::retry::{retry_with_backoff, RetryPolicy};

/// Outcome of a check-then-emit attempt.
#[derive(Debug)]
pub enum Emission {
    Emitted(Notification),
    /// An alert with the same key was created inside the cooldown window.
    Suppressed,
    /// The insert failed; already logged.
    Failed,
}

impl Emission {
    pub fn is_emitted(&self) -> bool {
        matches!(self, Emission::Emitted(_))
    }
}

/// Cooldown checker and emitter for user-facing alerts.
///
/// Delivery is at-least-once: the cooldown check and the insert are separate
/// statements with no lock between them, so concurrent triggers for one key
/// can both get through.
pub struct NotificationService {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    retry: RetryPolicy,
}

impl NotificationService {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>, cooldown: Duration) -> Self {
        Self {
            pool,
            clock,
            cooldown,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Whether an alert with this key was created within the cooldown window
    /// (inclusive boundary).
    ///
    /// Fails open: a lookup error is logged and reported as "not recent".
    pub async fn has_recent_notification(&self, key: &AlertKey) -> bool {
        let since = (self.clock.now() - self.cooldown).naive_utc();

        match NotificationRepository::exists_since(&self.pool, key, since).await {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(
                    "Cooldown lookup failed for user={} kind={} related={:?}: {}",
                    key.user_id,
                    key.kind.as_str(),
                    key.related_id,
                    e
                );
                false
            }
        }
    }

    /// Insert an unread notification. Does not check the cooldown.
    pub async fn create_notification(
        &self,
        key: &AlertKey,
        message: &str,
    ) -> AppResult<Notification> {
        let (pool, clock) = (&self.pool, &self.clock);

        retry_with_backoff(
            self.retry,
            "notification insert",
            AppError::is_transient,
            move || NotificationRepository::create(pool, key, message, clock.now().naive_utc()),
        )
        .await
    }

    /// Check the cooldown, then emit. Never fails the caller.
    pub async fn notify(&self, key: &AlertKey, message: &str) -> Emission {
        if self.has_recent_notification(key).await {
            tracing::debug!(
                "Suppressed {} for user={} related={:?}",
                key.kind.as_str(),
                key.user_id,
                key.related_id
            );
            return Emission::Suppressed;
        }

        match self.create_notification(key, message).await {
            Ok(n) => {
                tracing::info!(
                    "Created {} notification {} for user {}",
                    key.kind.as_str(),
                    n.id,
                    key.user_id
                );
                Emission::Emitted(n)
            }
            Err(e) => {
                tracing::error!(
                    "Failed to create {} notification for user {}: {}",
                    key.kind.as_str(),
                    key.user_id,
                    e
                );
                Emission::Failed
            }
        }
    }

    // ===== Inbox operations =====

    pub async fn list(
        &self,
        user_id: &str,
        filter: &NotificationFilter,
    ) -> AppResult<Vec<Notification>> {
        NotificationRepository::find_by_user(&self.pool, user_id, filter).await
    }

    pub async fn mark_read(&self, user_id: &str, id: &str) -> AppResult<()> {
        let now = self.clock.now().naive_utc();
        if !NotificationRepository::mark_read(&self.pool, user_id, id, now).await? {
            return Err(AppError::NotFound(
                "Notification not found or already read".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: &str) -> AppResult<u64> {
        let now = self.clock.now().naive_utc();
        NotificationRepository::mark_all_read(&self.pool, user_id, now).await
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> AppResult<()> {
        if !NotificationRepository::delete(&self.pool, user_id, id).await? {
            return Err(AppError::NotFound("Notification not found".to_string()));
        }
        Ok(())
    }

    pub async fn delete_all(&self, user_id: &str) -> AppResult<u64> {
        NotificationRepository::delete_all(&self.pool, user_id).await
    }
}
