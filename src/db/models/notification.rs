use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user-facing alert. `updated_at >= created_at` always holds; the only
/// mutation after insert is flipping `is_read` to true.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    /// Goal or workout this alert is about.
    pub related_id: Option<String>,
    pub kind: String,
    #[serde(skip_serializing)]
    pub dedup_bucket: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// What an alert is about. Part of the cooldown key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    GoalCompleted,
    GoalNearCompletion,
    GoalOverdue,
    WorkoutScheduled,
    WorkoutUpdated,
    WorkoutTomorrow,
    WorkoutStartingSoon,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::GoalCompleted => "goal_completed",
            AlertKind::GoalNearCompletion => "goal_near_completion",
            AlertKind::GoalOverdue => "goal_overdue",
            AlertKind::WorkoutScheduled => "workout_scheduled",
            AlertKind::WorkoutUpdated => "workout_updated",
            AlertKind::WorkoutTomorrow => "workout_tomorrow",
            AlertKind::WorkoutStartingSoon => "workout_same_day",
        }
    }
}

/// Identity of an alert for cooldown purposes.
///
/// Two alerts with equal keys inside the cooldown window are the same alert.
/// `None` fields compare equal to `None`. `bucket` carries whatever should
/// make an otherwise identical alert count as new (e.g. a rescheduled start time).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub user_id: String,
    pub related_id: Option<String>,
    pub kind: AlertKind,
    pub bucket: Option<String>,
}

impl AlertKey {
    pub fn new(user_id: impl Into<String>, related_id: Option<&str>, kind: AlertKind) -> Self {
        Self {
            user_id: user_id.into(),
            related_id: related_id.map(str::to_string),
            kind,
            bucket: None,
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }
}

/// Filter for listing a user's notifications.
#[derive(Debug, Clone)]
pub struct NotificationFilter {
    pub is_read: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}
