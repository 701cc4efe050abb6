use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Meal {
    pub id: String,
    pub user_id: String,
    pub meal_date: NaiveDate,
    /// breakfast, lunch, dinner, snack ...
    pub meal_type: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MealFood {
    pub id: String,
    pub meal_id: String,
    /// Reference into the client-side food database, if the item came from there.
    pub food_id: Option<i64>,
    pub food_name: String,
    pub quantity: f64,
    /// g, kg, oz, cup, piece ...
    pub unit: String,
    pub calories: i64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub sodium: f64,
    pub calcium: f64,
    pub iron: f64,
    pub potassium: f64,
    pub serving_size: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateMealFood {
    pub meal_id: String,
    pub food_id: Option<i64>,
    pub food_name: String,
    pub quantity: f64,
    pub unit: String,
    pub calories: i64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub sodium: f64,
    pub calcium: f64,
    pub iron: f64,
    pub potassium: f64,
    pub serving_size: String,
}
