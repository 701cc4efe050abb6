use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;

use crate::db::{UpdateProfile, User, UserRepository};
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::AppState;

/// Router for the signed-in user's own profile
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: String,
    pub age: Option<i64>,
    pub height: Option<i64>,
    pub weight: Option<i64>,
}

async fn get_profile(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<User>> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    if [req.age, req.height, req.weight]
        .iter()
        .flatten()
        .any(|v| *v < 0)
    {
        return Err(AppError::Validation(
            "age, height and weight must not be negative".to_string(),
        ));
    }

    let profile = UpdateProfile {
        name: name.to_string(),
        age: req.age,
        height: req.height,
        weight: req.weight,
    };

    let updated = UserRepository::update_profile(&state.db, &user.id, &profile, state.now())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    tracing::debug!("Updated profile for user {}", updated.id);
    Ok(Json(updated))
}
