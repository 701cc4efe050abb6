use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// User Repository
// ============================================================================

pub struct UserRepository;

const USER_COLUMNS: &str =
    "id, email, password_hash, name, role, age, height, weight, created_at, updated_at";

impl UserRepository {
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)
    }

    /// Emails are stored lowercased; callers pass the normalised form.
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn create(
        pool: &SqlitePool,
        user: CreateUser,
        now: NaiveDateTime,
    ) -> AppResult<User> {
        let id = Uuid::new_v4().to_string();

        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            let err = AppError::Database(e);
            if err.is_unique_violation() {
                AppError::Conflict("Email is already registered".to_string())
            } else {
                err
            }
        })
    }

    pub async fn update_profile(
        pool: &SqlitePool,
        id: &str,
        profile: &UpdateProfile,
        now: NaiveDateTime,
    ) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = ?, age = ?, height = ?, weight = ?, updated_at = ?
            WHERE id = ?
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&profile.name)
        .bind(profile.age)
        .bind(profile.height)
        .bind(profile.weight)
        .bind(now)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn update_password(
        pool: &SqlitePool,
        id: &str,
        password_hash: &str,
        now: NaiveDateTime,
    ) -> AppResult<bool> {
        let res = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(now)
            .bind(id)
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
    async fn duplicate_email_is_a_conflict() {
        let pool = memory_pool().await;
        seed_user(&pool, "dup@example.com").await;

        let err = UserRepository::create(
            &pool,
            CreateUser {
                email: "dup@example.com".to_string(),
                password_hash: "x".to_string(),
                name: "Other".to_string(),
            },
            at("2026-01-02 00:00:00"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn profile_update_round_trips() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "p@example.com").await;

        let updated = UserRepository::update_profile(
            &pool,
            &user.id,
            &UpdateProfile {
                name: "Pat".to_string(),
                age: Some(31),
                height: Some(180),
                weight: None,
            },
            at("2026-02-01 10:00:00"),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(updated.name, "Pat");
        assert_eq!(updated.age, Some(31));
        assert_eq!(updated.weight, None);
        assert_eq!(updated.updated_at, at("2026-02-01 10:00:00"));

        let by_email = UserRepository::find_by_email(&pool, "p@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn unknown_user_is_none() {
        let pool = memory_pool().await;
        assert!(UserRepository::find_by_id(&pool, "nope")
            .await
            .unwrap()
            .is_none());
        assert!(!UserRepository::update_password(&pool, "nope", "h", at("2026-01-01 00:00:00"))
            .await
            .unwrap());
    }
}
