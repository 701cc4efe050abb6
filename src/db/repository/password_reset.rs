use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Password Reset Repository
// ============================================================================

pub struct PasswordResetRepository;

impl PasswordResetRepository {
    /// Store a new reset for the user, dropping any earlier pending ones.
    pub async fn replace_for_user(
        pool: &SqlitePool,
        user_id: &str,
        token_hash: &str,
        expires_at: NaiveDateTime,
        now: NaiveDateTime,
    ) -> AppResult<PasswordReset> {
        let mut tx = pool.begin().await.map_err(AppError::Database)?;

        sqlx::query("DELETE FROM password_resets WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let reset = sqlx::query_as::<_, PasswordReset>(
            r#"
            INSERT INTO password_resets (id, user_id, token_hash, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, user_id, token_hash, expires_at, created_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(reset)
    }

    /// A reset that matches the hash and has not expired yet.
    pub async fn find_valid(
        pool: &SqlitePool,
        token_hash: &str,
        now: NaiveDateTime,
    ) -> AppResult<Option<PasswordReset>> {
        sqlx::query_as::<_, PasswordReset>(
            r#"
            SELECT id, user_id, token_hash, expires_at, created_at
            FROM password_resets
            WHERE token_hash = ? AND expires_at > ?
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn delete_for_user(pool: &SqlitePool, user_id: &str) -> AppResult<u64> {
        let res = sqlx::query("DELETE FROM password_resets WHERE user_id = ?")
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(res.rows_affected())
    }
}
