use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use crate::db::Workout;
use crate::error::AppResult;
use crate::routes::auth::AuthUser;
use crate::routes::parse_id;
use crate::services::workouts::{WorkoutInput, WorkoutService};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_workouts).post(create_workout))
        .route("/:id", put(update_workout).delete(delete_workout))
}

async fn create_workout(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<WorkoutInput>,
) -> AppResult<(StatusCode, Json<Workout>)> {
    let workout = WorkoutService::create(&state, &user.id, req).await?;
    Ok((StatusCode::CREATED, Json(workout)))
}

async fn list_workouts(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<Workout>>> {
    Ok(Json(WorkoutService::list(&state, &user.id).await?))
}

async fn update_workout(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<WorkoutInput>,
) -> AppResult<Json<Workout>> {
    let id = parse_id(&id, "workout")?;
    Ok(Json(WorkoutService::update(&state, &user.id, &id, req).await?))
}

async fn delete_workout(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let id = parse_id(&id, "workout")?;
    WorkoutService::delete(&state, &user.id, &id).await?;
    Ok(Json(serde_json::json!({ "message": "Workout deleted successfully" })))
}
