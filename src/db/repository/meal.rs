use chrono::{NaiveDate, NaiveDateTime};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Meal Repository
// ============================================================================

pub struct MealRepository;

const MEAL_FOOD_COLUMNS: &str = "id, meal_id, food_id, food_name, quantity, unit, calories, \
                                 protein, carbs, fat, fiber, sugar, sodium, calcium, iron, \
                                 potassium, serving_size, created_at";

impl MealRepository {
    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        meal_date: NaiveDate,
        meal_type: &str,
        now: NaiveDateTime,
    ) -> AppResult<Meal> {
        sqlx::query_as::<_, Meal>(
            r#"
            INSERT INTO meals (id, user_id, meal_date, meal_type, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, user_id, meal_date, meal_type, created_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(meal_date)
        .bind(meal_type)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_id(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
    ) -> AppResult<Option<Meal>> {
        sqlx::query_as::<_, Meal>(
            r#"
            SELECT id, user_id, meal_date, meal_type, created_at
            FROM meals
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_user(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<Meal>> {
        sqlx::query_as::<_, Meal>(
            r#"
            SELECT id, user_id, meal_date, meal_type, created_at
            FROM meals
            WHERE user_id = ?
            ORDER BY meal_date DESC, created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Deleting a meal removes its foods through the foreign key cascade.
    pub async fn delete(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM meals WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(res.rows_affected() > 0)
    }

    // ===== Meal foods =====

    /// Caller must have checked that the meal belongs to the user.
    pub async fn add_food(
        pool: &SqlitePool,
        food: &CreateMealFood,
        now: NaiveDateTime,
    ) -> AppResult<MealFood> {
        sqlx::query_as::<_, MealFood>(&format!(
            r#"
            INSERT INTO meal_foods (
                id, meal_id, food_id, food_name, quantity, unit, calories,
                protein, carbs, fat, fiber, sugar, sodium, calcium, iron, potassium,
                serving_size, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {MEAL_FOOD_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&food.meal_id)
        .bind(food.food_id)
        .bind(&food.food_name)
        .bind(food.quantity)
        .bind(&food.unit)
        .bind(food.calories)
        .bind(food.protein)
        .bind(food.carbs)
        .bind(food.fat)
        .bind(food.fiber)
        .bind(food.sugar)
        .bind(food.sodium)
        .bind(food.calcium)
        .bind(food.iron)
        .bind(food.potassium)
        .bind(&food.serving_size)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Foods of a meal owned by `user_id`; empty when the meal is someone else's.
    pub async fn find_foods(
        pool: &SqlitePool,
        user_id: &str,
        meal_id: &str,
    ) -> AppResult<Vec<MealFood>> {
        sqlx::query_as::<_, MealFood>(&format!(
            r#"
            SELECT {MEAL_FOOD_COLUMNS}
            FROM meal_foods
            WHERE meal_id = ?
              AND meal_id IN (SELECT id FROM meals WHERE user_id = ?)
            ORDER BY created_at ASC
            "#
        ))
        .bind(meal_id)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn delete_food(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<bool> {
        let res = sqlx::query(
            r#"
            DELETE FROM meal_foods
            WHERE id = ?
              AND meal_id IN (SELECT id FROM meals WHERE user_id = ?)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{at, memory_pool, seed_user};

    #[tokio::test]
    async fn foods_are_scoped_and_cascade_with_meal() {
        let pool = memory_pool().await;
        let owner = seed_user(&pool, "m@example.com").await;
        let other = seed_user(&pool, "x@example.com").await;
        let now = at("2026-07-01 12:00:00");
        let day = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();

        let meal = MealRepository::create(&pool, &owner.id, day, "lunch", now)
            .await
            .unwrap();
        let food = MealRepository::add_food(
            &pool,
            &CreateMealFood {
                meal_id: meal.id.clone(),
                food_name: "Rice".to_string(),
                quantity: 150.0,
                unit: "g".to_string(),
                calories: 195,
                serving_size: "100 g".to_string(),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();

        assert_eq!(
            MealRepository::find_foods(&pool, &owner.id, &meal.id)
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(MealRepository::find_foods(&pool, &other.id, &meal.id)
            .await
            .unwrap()
            .is_empty());
        assert!(!MealRepository::delete_food(&pool, &other.id, &food.id)
            .await
            .unwrap());

        assert!(MealRepository::delete(&pool, &owner.id, &meal.id).await.unwrap());
        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM meal_foods")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(left, 0);
    }
}
