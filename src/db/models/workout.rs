use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Workout {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// Category: cardio, strength, flexibility, sports ...
    pub workout_type: Option<String>,
    pub duration_min: i64,
    pub calories_burned: Option<i64>,
    /// Weight used for strength training
    pub weight: Option<f64>,
    pub reps: Option<i64>,
    #[serde(rename = "date")]
    pub workout_date: NaiveDate,
    /// Planned start on `workout_date`, in the users' wall clock.
    pub start_time: Option<NaiveTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct WorkoutValues {
    pub name: String,
    pub workout_type: Option<String>,
    pub duration_min: i64,
    pub calories_burned: Option<i64>,
    pub weight: Option<f64>,
    pub reps: Option<i64>,
    pub workout_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
}

/// Projection used by the reminder scans.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduledWorkout {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub workout_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
}
