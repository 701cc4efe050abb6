use std::sync::Arc;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::error::{AppError, AppResult};
use crate::middleware;
use crate::AppState;

pub mod auth;
pub mod goals;
pub mod health;
pub mod meals;
pub mod notifications;
pub mod nutrition;
pub mod users;
pub mod workouts;

/// Full API router. `auth` is passed in so the caller can put a rate limiter on it.
pub fn app(state: Arc<AppState>, auth: Router<Arc<AppState>>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/auth", auth)
        .nest("/api/users", users::router())
        .nest("/api/goals", goals::router())
        .nest("/api/workouts", workouts::router())
        .nest("/api", meals::router())
        .nest("/api/nutrition", nutrition::router())
        .nest("/api/notifications", notifications::router())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(middleware::csp::csp_middleware)),
        )
}

/// Path ids are UUIDs; anything else is rejected before touching the store.
pub fn parse_id(raw: &str, what: &str) -> AppResult<String> {
    uuid::Uuid::parse_str(raw.trim())
        .map(|id| id.to_string())
        .map_err(|_| AppError::BadRequest(format!("Invalid {} ID", what)))
}

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 50;

/// `(limit, offset)` from raw query values. Missing, non-numeric or
/// non-positive limits fall back to the default; negative offsets to 0.
pub fn page(limit: Option<&str>, offset: Option<&str>) -> (i64, i64) {
    let limit = match limit.and_then(|l| l.trim().parse::<i64>().ok()) {
        Some(l) if l > MAX_PAGE_SIZE => MAX_PAGE_SIZE,
        Some(l) if l > 0 => l,
        _ => DEFAULT_PAGE_SIZE,
    };
    let offset = offset
        .and_then(|o| o.trim().parse::<i64>().ok())
        .unwrap_or(0)
        .max(0);
    (limit, offset)
}

/// `"true"` / `"false"`; anything else means "not given".
pub fn parse_flag(raw: Option<&str>) -> Option<bool> {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("true") | Some("1") => Some(true),
        Some("false") | Some("0") => Some(false),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::db::User;
    use crate::services::auth::AuthService;
    use crate::services::clock::ManualClock;
    use crate::test_support::test_state;

    pub struct TestApp {
        pub state: Arc<AppState>,
        pub clock: Arc<ManualClock>,
        pub user: User,
        pub token: String,
    }

    impl TestApp {
        pub async fn new() -> Self {
            let (state, clock, user) = test_state().await;
            let token = AuthService::create_token(&state, &user.id).unwrap();
            Self {
                state: Arc::new(state),
                clock,
                user,
                token,
            }
        }

        pub async fn request(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut req = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                req = req.header("authorization", format!("Bearer {}", token));
            }
            let req = match body {
                Some(json) => req
                    .header("content-type", "application/json")
                    .body(Body::from(json.to_string())),
                None => req.body(Body::empty()),
            }
            .unwrap();

            let res = app(self.state.clone(), auth::router())
                .oneshot(req)
                .await
                .unwrap();
            let status = res.status();
            let bytes = res.into_body().collect().await.unwrap().to_bytes();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            (status, json)
        }

        /// Request as the seeded user.
        pub async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            self.request(method, uri, Some(&self.token), body).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_like_the_inbox_expects() {
        assert_eq!(page(None, None), (10, 0));
        assert_eq!(page(Some("0"), Some("-5")), (10, 0));
        assert_eq!(page(Some("-1"), Some("3")), (10, 3));
        assert_eq!(page(Some("500"), None), (50, 0));
        assert_eq!(page(Some("abc"), Some("xyz")), (10, 0));
        assert_eq!(page(Some("25"), Some("20")), (25, 20));
    }

    #[test]
    fn ids_must_be_uuids() {
        assert!(parse_id("not-a-uuid", "goal").is_err());
        let id = uuid::Uuid::new_v4().to_string();
        assert_eq!(parse_id(&id, "goal").unwrap(), id);
    }

    #[test]
    fn flags_accept_true_and_false_only() {
        assert_eq!(parse_flag(Some("TRUE")), Some(true));
        assert_eq!(parse_flag(Some("false")), Some(false));
        assert_eq!(parse_flag(Some("maybe")), None);
        assert_eq!(parse_flag(None), None);
    }
}
