use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::services::nutrition::NutritionInfo;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", post(lookup))
}

#[derive(Debug, Deserialize)]
pub struct NutritionQuery {
    #[serde(default)]
    pub query: String,
}

async fn lookup(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<NutritionQuery>,
) -> AppResult<Json<NutritionInfo>> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("Query is required".to_string()));
    }

    tracing::debug!("Nutrition lookup for user {}: {}", user.id, query);
    Ok(Json(state.nutrition.lookup(query).await?))
}
