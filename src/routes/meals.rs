use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::db::{CreateMealFood, Meal, MealFood, MealRepository};
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::routes::parse_id;
use crate::AppState;

/// Mounted under `/api`: meals and the foods logged against them.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/meals", get(list_meals).post(create_meal))
        .route("/meals/:id", delete(delete_meal))
        .route("/meals/:id/foods", get(list_meal_foods))
        .route("/meal-foods", post(add_meal_food))
        .route("/meal-foods/:id", delete(delete_meal_food))
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateMealRequest {
    /// `YYYY-MM-DD` or `MM/DD/YYYY`
    pub date: String,
    pub meal_type: String,
}

fn default_unit() -> String {
    "g".to_string()
}

fn default_serving_size() -> String {
    "100 g".to_string()
}

#[derive(Debug, Deserialize)]
pub struct AddMealFoodRequest {
    pub meal_id: String,
    pub food_id: Option<i64>,
    pub food_name: String,
    pub quantity: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub calories: i64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub fiber: f64,
    #[serde(default)]
    pub sugar: f64,
    #[serde(default)]
    pub sodium: f64,
    #[serde(default)]
    pub calcium: f64,
    #[serde(default)]
    pub iron: f64,
    #[serde(default)]
    pub potassium: f64,
    #[serde(default = "default_serving_size")]
    pub serving_size: String,
}

/// Accepts ISO dates and the US form the web client sends.
pub fn parse_meal_date(raw: &str) -> AppResult<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .map_err(|_| {
            AppError::Validation("date must be YYYY-MM-DD or MM/DD/YYYY".to_string())
        })
}

impl AddMealFoodRequest {
    fn validate(self) -> AppResult<CreateMealFood> {
        let food_name = self.food_name.trim().to_string();
        if food_name.is_empty() {
            return Err(AppError::Validation("food_name is required".to_string()));
        }

        let amounts = [
            self.quantity,
            self.protein,
            self.carbs,
            self.fat,
            self.fiber,
            self.sugar,
            self.sodium,
            self.calcium,
            self.iron,
            self.potassium,
        ];
        if self.calories < 0 || amounts.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(AppError::Validation(
                "quantity, calories and nutrients must not be negative".to_string(),
            ));
        }

        Ok(CreateMealFood {
            meal_id: parse_id(&self.meal_id, "meal")?,
            food_id: self.food_id,
            food_name,
            quantity: self.quantity,
            unit: self.unit.trim().to_string(),
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
            fiber: self.fiber,
            sugar: self.sugar,
            sodium: self.sodium,
            calcium: self.calcium,
            iron: self.iron,
            potassium: self.potassium,
            serving_size: self.serving_size.trim().to_string(),
        })
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn create_meal(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<CreateMealRequest>,
) -> AppResult<(StatusCode, Json<Meal>)> {
    let meal_type = req.meal_type.trim().to_lowercase();
    if meal_type.is_empty() {
        return Err(AppError::Validation("meal_type is required".to_string()));
    }
    let date = parse_meal_date(&req.date)?;

    let meal = MealRepository::create(&state.db, &user.id, date, &meal_type, state.now()).await?;
    Ok((StatusCode::CREATED, Json(meal)))
}

async fn list_meals(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<Meal>>> {
    Ok(Json(MealRepository::find_by_user(&state.db, &user.id).await?))
}

async fn delete_meal(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let id = parse_id(&id, "meal")?;
    if !MealRepository::delete(&state.db, &user.id, &id).await? {
        return Err(AppError::NotFound("Meal not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Meal deleted successfully" })))
}

async fn list_meal_foods(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<MealFood>>> {
    let id = parse_id(&id, "meal")?;
    MealRepository::find_by_id(&state.db, &user.id, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Meal not found".to_string()))?;

    Ok(Json(MealRepository::find_foods(&state.db, &user.id, &id).await?))
}

async fn add_meal_food(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<AddMealFoodRequest>,
) -> AppResult<(StatusCode, Json<MealFood>)> {
    let food = req.validate()?;
    MealRepository::find_by_id(&state.db, &user.id, &food.meal_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Meal not found".to_string()))?;

    let created = MealRepository::add_food(&state.db, &food, state.now()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_meal_food(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let id = parse_id(&id, "meal food")?;
    if !MealRepository::delete_food(&state.db, &user.id, &id).await? {
        return Err(AppError::NotFound("Meal food not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Meal food deleted successfully" })))
}
