//! Application state wired to an in-memory database and a manual clock.

use std::sync::Arc;

use crate::config::Config;
use crate::db::test_support::{memory_pool, seed_user};
use crate::db::User;
use crate::services::clock::ManualClock;
use crate::services::nutrition::MockNutrition;
use crate::AppState;

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.jwt.secret = "test-secret".to_string();
    config.auth.bcrypt_cost = 4;
    config
}

/// State at 2026-10-19 12:00:00 UTC with one seeded user.
pub async fn test_state() -> (AppState, Arc<ManualClock>, User) {
    let pool = memory_pool().await;
    let user = seed_user(&pool, "user@example.com").await;
    let clock = Arc::new(ManualClock::at("2026-10-19 12:00:00"));

    let state = AppState::new(pool, test_config(), clock.clone(), Arc::new(MockNutrition));
    (state, clock, user)
}
