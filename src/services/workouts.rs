use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use crate::db::{AlertKey, AlertKind, Workout, WorkoutRepository, WorkoutValues};
use crate::error::{AppError, AppResult};
use crate::messages;
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct WorkoutInput {
    pub name: String,
    pub workout_type: Option<String>,
    #[serde(default)]
    pub duration_min: i64,
    pub calories_burned: Option<i64>,
    pub weight: Option<f64>,
    pub reps: Option<i64>,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub start_time: Option<String>,
}

pub fn parse_date(s: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation("date must be in YYYY-MM-DD format".to_string()))
}

pub fn parse_start_time(s: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| AppError::Validation("start_time must be in HH:MM format".to_string()))
}

impl WorkoutInput {
    fn validate(&self) -> AppResult<WorkoutValues> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }
        if self.duration_min < 0
            || self.calories_burned.is_some_and(|c| c < 0)
            || self.reps.is_some_and(|r| r < 0)
            || self.weight.is_some_and(|w| !w.is_finite() || w < 0.0)
        {
            return Err(AppError::Validation(
                "duration, calories, weight and reps must not be negative".to_string(),
            ));
        }

        let start_time = match self.start_time.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(s) => Some(parse_start_time(s)?),
        };

        Ok(WorkoutValues {
            name: name.to_string(),
            workout_type: self
                .workout_type
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_lowercase),
            duration_min: self.duration_min,
            calories_burned: self.calories_burned,
            weight: self.weight,
            reps: self.reps,
            workout_date: parse_date(&self.date)?,
            start_time,
        })
    }
}

pub struct WorkoutService;

impl WorkoutService {
    pub async fn create(state: &AppState, user_id: &str, input: WorkoutInput) -> AppResult<Workout> {
        let values = input.validate()?;
        let workout = WorkoutRepository::create(&state.db, user_id, &values, state.now()).await?;

        let key = AlertKey::new(user_id, Some(&workout.id), AlertKind::WorkoutScheduled);
        state
            .notifications
            .notify(
                &key,
                &messages::t_with("workout.scheduled", &[("name", &workout.name)]),
            )
            .await;

        Ok(workout)
    }

    pub async fn list(state: &AppState, user_id: &str) -> AppResult<Vec<Workout>> {
        WorkoutRepository::find_by_user(&state.db, user_id).await
    }

    pub async fn update(
        state: &AppState,
        user_id: &str,
        id: &str,
        input: WorkoutInput,
    ) -> AppResult<Workout> {
        let values = input.validate()?;
        let workout = WorkoutRepository::update(&state.db, user_id, id, &values, state.now())
            .await?
            .ok_or_else(|| AppError::NotFound("Workout not found".to_string()))?;

        let key = AlertKey::new(user_id, Some(&workout.id), AlertKind::WorkoutUpdated);
        state
            .notifications
            .notify(
                &key,
                &messages::t_with("workout.updated", &[("name", &workout.name)]),
            )
            .await;

        Ok(workout)
    }

    pub async fn delete(state: &AppState, user_id: &str, id: &str) -> AppResult<()> {
        if !WorkoutRepository::delete(&state.db, user_id, id).await? {
            return Err(AppError::NotFound("Workout not found".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NotificationFilter, NotificationRepository};
    use crate::test_support::test_state;

    fn input(name: &str) -> WorkoutInput {
        WorkoutInput {
            name: name.to_string(),
            workout_type: Some(" Strength ".to_string()),
            duration_min: 60,
            calories_burned: Some(400),
            weight: Some(60.0),
            reps: Some(10),
            date: "2026-10-20".to_string(),
            start_time: Some("18:30".to_string()),
        }
    }

    #[test]
    fn validation_rejects_bad_input() {
        assert!(input("  ").validate().is_err());

        let mut bad = input("Run");
        bad.duration_min = -1;
        assert!(bad.validate().is_err());

        let mut bad = input("Run");
        bad.date = "10/20/2026".to_string();
        assert!(bad.validate().is_err());

        let mut bad = input("Run");
        bad.start_time = Some("6pm".to_string());
        assert!(bad.validate().is_err());

        let ok = input(" Run ").validate().unwrap();
        assert_eq!(ok.name, "Run");
        assert_eq!(ok.workout_type.as_deref(), Some("strength"));
        assert_eq!(ok.start_time, NaiveTime::from_hms_opt(18, 30, 0));
    }

    #[tokio::test]
    async fn create_and_update_emit_informational_alerts() {
        let (state, _clock, user) = test_state().await;

        let w = WorkoutService::create(&state, &user.id, input("Leg day")).await.unwrap();
        WorkoutService::update(&state, &user.id, &w.id, input("Leg day v2"))
            .await
            .unwrap();

        let filter = NotificationFilter {
            is_read: None,
            limit: 10,
            offset: 0,
        };
        let mut items = NotificationRepository::find_by_user(&state.db, &user.id, &filter)
            .await
            .unwrap();
        items.sort_by(|a, b| a.kind.cmp(&b.kind));

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, "workout_scheduled");
        assert_eq!(items[0].message, "💪 New workout scheduled: Leg day");
        assert_eq!(items[1].kind, "workout_updated");
        assert_eq!(items[1].related_id.as_deref(), Some(w.id.as_str()));
    }

    #[tokio::test]
    async fn emission_failure_does_not_fail_the_save() {
        let (state, _clock, user) = test_state().await;

        // Break only the notifications table.
        sqlx::query("DROP TABLE notifications")
            .execute(&state.db)
            .await
            .unwrap();

        let w = WorkoutService::create(&state, &user.id, input("Run")).await.unwrap();
        assert_eq!(w.name, "Run");
    }

    #[tokio::test]
    async fn missing_workout_is_not_found() {
        let (state, _clock, user) = test_state().await;
        assert!(matches!(
            WorkoutService::update(&state, &user.id, "missing", input("x")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            WorkoutService::delete(&state, &user.id, "missing").await,
            Err(AppError::NotFound(_))
        ));
    }
}
