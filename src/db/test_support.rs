//! Shared fixtures for database-backed unit tests.

use chrono::NaiveDateTime;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::db::models::*;
use crate::db::repository::UserRepository;

/// Fresh in-memory database with all migrations applied.
///
/// A single connection that never expires: every new connection to
/// `sqlite::memory:` would otherwise see an empty database.
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

pub async fn seed_user(pool: &SqlitePool, email: &str) -> User {
    UserRepository::create(
        pool,
        CreateUser {
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            name: "Test User".to_string(),
        },
        at("2026-01-01 00:00:00"),
    )
    .await
    .unwrap()
}

/// `"YYYY-MM-DD HH:MM:SS"` as a naive UTC timestamp.
pub fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}
