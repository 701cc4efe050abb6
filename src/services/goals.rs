use serde::{Deserialize, Serialize};

use crate::db::{
    AlertKey, AlertKind, Goal, GoalFilter, GoalRepository, GoalValues, TimeFrame,
};
use crate::error::{AppError, AppResult};
use crate::messages;
use crate::services::notifications::Emission;
use crate::AppState;

/// Upper bound for target and progress values.
pub const MAX_GOAL_VALUE: i64 = 1_000_000;

// ===== Threshold evaluation =====

/// A goal counts as completed when flagged so, or once progress reaches the target.
pub fn resolve_completion(explicit: bool, progress: i64, target: i64) -> bool {
    explicit || progress >= target
}

/// Alert a goal in this state should raise, if any.
///
/// Completion wins over near-completion: a jump from below 80% straight to
/// done only yields the completion alert.
pub fn threshold_alert(is_completed: bool, progress: i64, target: i64) -> Option<AlertKind> {
    if is_completed {
        Some(AlertKind::GoalCompleted)
    } else if progress.saturating_mul(5) >= target.saturating_mul(4) {
        Some(AlertKind::GoalNearCompletion)
    } else {
        None
    }
}

fn alert_message(kind: AlertKind, goal_type: &str) -> String {
    let key = match kind {
        AlertKind::GoalCompleted => "goal.completed",
        _ => "goal.near_completion",
    };
    messages::t_with(key, &[("goal", goal_type)])
}

// ===== Validation =====

/// Trim, lowercase and check a goal type name: 3-50 chars of `a-z`, `0-9`,
/// space, `_` or `-`.
pub fn normalize_goal_type(raw: &str) -> AppResult<String> {
    let goal_type = raw.trim().to_lowercase();
    let len = goal_type.chars().count();

    if !(3..=50).contains(&len) {
        return Err(AppError::Validation(
            "goal_type must be between 3 and 50 characters".to_string(),
        ));
    }
    if !goal_type
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, ' ' | '_' | '-'))
    {
        return Err(AppError::Validation(
            "goal_type may only contain letters, digits, spaces, '_' and '-'".to_string(),
        ));
    }
    Ok(goal_type)
}

fn validate_values(
    target: i64,
    progress: Option<i64>,
    time_frame: &str,
    is_completed: Option<bool>,
) -> AppResult<GoalValues> {
    if !(1..=MAX_GOAL_VALUE).contains(&target) {
        return Err(AppError::Validation(format!(
            "target_value must be between 1 and {}",
            MAX_GOAL_VALUE
        )));
    }
    let progress = progress.unwrap_or(0);
    if !(0..=MAX_GOAL_VALUE).contains(&progress) {
        return Err(AppError::Validation(format!(
            "progress_value must be between 0 and {}",
            MAX_GOAL_VALUE
        )));
    }
    let time_frame = TimeFrame::parse(time_frame.trim()).ok_or_else(|| {
        AppError::Validation("time_frame must be daily, weekly, or monthly".to_string())
    })?;

    Ok(GoalValues {
        target_value: target,
        progress_value: progress,
        time_frame,
        is_completed: resolve_completion(is_completed.unwrap_or(false), progress, target),
    })
}

// ===== Request/Response Types =====

#[derive(Debug, Clone, Deserialize)]
pub struct SaveGoal {
    pub goal_type: String,
    pub target_value: i64,
    pub progress_value: Option<i64>,
    pub time_frame: String,
    pub is_completed: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateGoal {
    pub target_value: i64,
    pub progress_value: Option<i64>,
    pub time_frame: String,
    pub is_completed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct SavedGoal {
    pub goal: Goal,
    /// False when an existing goal with the same type was updated.
    pub created: bool,
}

// ===== Service =====

pub struct GoalService;

impl GoalService {
    /// Create the goal, or update the user's goal of the same type (un-archiving it).
    pub async fn save(state: &AppState, user_id: &str, input: SaveGoal) -> AppResult<SavedGoal> {
        let goal_type = normalize_goal_type(&input.goal_type)?;
        let values = validate_values(
            input.target_value,
            input.progress_value,
            &input.time_frame,
            input.is_completed,
        )?;
        let now = state.now();

        let (goal, created) =
            match GoalRepository::find_by_user_and_type(&state.db, user_id, &goal_type).await? {
                Some(existing) => (
                    Self::overwrite(state, user_id, &existing.id, &values, true).await?,
                    false,
                ),
                None => match GoalRepository::create(&state.db, user_id, &goal_type, &values, now)
                    .await
                {
                    Ok(goal) => (goal, true),
                    // Lost a race with a concurrent create of the same type.
                    Err(e) if e.is_unique_violation() => {
                        let existing =
                            GoalRepository::find_by_user_and_type(&state.db, user_id, &goal_type)
                                .await?
                                .ok_or_else(|| AppError::NotFound("Goal not found".to_string()))?;
                        (
                            Self::overwrite(state, user_id, &existing.id, &values, true).await?,
                            false,
                        )
                    }
                    Err(e) => return Err(e),
                },
            };

        Self::evaluate(state, &goal).await;
        Ok(SavedGoal { goal, created })
    }

    pub async fn update(
        state: &AppState,
        user_id: &str,
        id: &str,
        input: UpdateGoal,
    ) -> AppResult<Goal> {
        let values = validate_values(
            input.target_value,
            input.progress_value,
            &input.time_frame,
            input.is_completed,
        )?;

        let goal = Self::overwrite(state, user_id, id, &values, false).await?;
        Self::evaluate(state, &goal).await;
        Ok(goal)
    }

    async fn overwrite(
        state: &AppState,
        user_id: &str,
        id: &str,
        values: &GoalValues,
        unarchive: bool,
    ) -> AppResult<Goal> {
        GoalRepository::update_values(&state.db, user_id, id, values, unarchive, state.now())
            .await?
            .ok_or_else(|| AppError::NotFound("Goal not found".to_string()))
    }

    pub async fn list(state: &AppState, user_id: &str, filter: &GoalFilter) -> AppResult<Vec<Goal>> {
        GoalRepository::find_by_user(&state.db, user_id, filter).await
    }

    pub async fn archive(state: &AppState, user_id: &str, id: &str) -> AppResult<()> {
        if !GoalRepository::set_archived(&state.db, user_id, id, true, state.now()).await? {
            return Err(AppError::NotFound(
                "Goal not found or already archived".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn restore(state: &AppState, user_id: &str, id: &str) -> AppResult<()> {
        if !GoalRepository::set_archived(&state.db, user_id, id, false, state.now()).await? {
            return Err(AppError::NotFound("Goal not found or not archived".to_string()));
        }
        Ok(())
    }

    /// Raise the completion / near-completion alert for a freshly saved goal.
    /// Best effort: the outcome never affects the save.
    pub async fn evaluate(state: &AppState, goal: &Goal) -> Option<Emission> {
        let kind = threshold_alert(goal.is_completed, goal.progress_value, goal.target_value)?;
        let key = AlertKey::new(&goal.user_id, Some(&goal.id), kind);

        Some(
            state
                .notifications
                .notify(&key, &alert_message(kind, &goal.goal_type))
                .await,
        )
    }
}
