use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    /// Normalised, human readable name ("daily steps"); unique per user.
    pub goal_type: String,
    pub target_value: i64,
    pub progress_value: i64,
    pub time_frame: String,
    pub is_completed: bool,
    pub archived: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFrame {
    Daily,
    Weekly,
    Monthly,
}

impl TimeFrame {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFrame::Daily => "daily",
            TimeFrame::Weekly => "weekly",
            TimeFrame::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(TimeFrame::Daily),
            "weekly" => Some(TimeFrame::Weekly),
            "monthly" => Some(TimeFrame::Monthly),
            _ => None,
        }
    }
}

/// Validated values written on goal create/update.
#[derive(Debug, Clone)]
pub struct GoalValues {
    pub target_value: i64,
    pub progress_value: i64,
    pub time_frame: TimeFrame,
    pub is_completed: bool,
}

/// Columns a goal listing may be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalSort {
    CreatedAt,
    TargetValue,
    GoalType,
    ProgressValue,
}

impl GoalSort {
    /// Unknown values fall back to `created_at`.
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("target_value") => GoalSort::TargetValue,
            Some("goal_type") => GoalSort::GoalType,
            Some("progress_value") => GoalSort::ProgressValue,
            _ => GoalSort::CreatedAt,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            GoalSort::CreatedAt => "created_at",
            GoalSort::TargetValue => "target_value",
            GoalSort::GoalType => "goal_type",
            GoalSort::ProgressValue => "progress_value",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoalFilter {
    pub completed: Option<bool>,
    pub include_archived: bool,
    pub sort: GoalSort,
    pub ascending: bool,
    pub limit: i64,
    pub offset: i64,
}

/// Projection used by the overdue-goal scan.
#[derive(Debug, Clone, FromRow)]
pub struct StaleGoal {
    pub id: String,
    pub user_id: String,
    pub goal_type: String,
}
