use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::db::{Goal, GoalFilter, GoalSort};
use crate::error::AppResult;
use crate::routes::auth::AuthUser;
use crate::routes::{page, parse_flag, parse_id};
use crate::services::goals::{GoalService, SaveGoal, UpdateGoal};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_goals).post(save_goal))
        .route("/:id", put(update_goal).delete(archive_goal))
        .route("/:id/restore", put(restore_goal))
}

#[derive(Debug, Deserialize)]
pub struct ListGoalsQuery {
    pub completed: Option<String>,
    pub include_archived: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// Create a goal, or overwrite the user's goal of the same type.
async fn save_goal(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<SaveGoal>,
) -> AppResult<(StatusCode, Json<Goal>)> {
    let saved = GoalService::save(&state, &user.id, req).await?;
    let status = if saved.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(saved.goal)))
}

async fn list_goals(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<ListGoalsQuery>,
) -> AppResult<Json<Vec<Goal>>> {
    let (limit, offset) = page(query.limit.as_deref(), query.offset.as_deref());
    let filter = GoalFilter {
        completed: parse_flag(query.completed.as_deref()),
        include_archived: parse_flag(query.include_archived.as_deref()).unwrap_or(false),
        sort: GoalSort::parse(query.sort_by.as_deref()),
        ascending: query
            .order
            .as_deref()
            .is_some_and(|o| o.eq_ignore_ascii_case("asc")),
        limit,
        offset,
    };

    Ok(Json(GoalService::list(&state, &user.id, &filter).await?))
}

async fn update_goal(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateGoal>,
) -> AppResult<Json<Goal>> {
    let id = parse_id(&id, "goal")?;
    Ok(Json(GoalService::update(&state, &user.id, &id, req).await?))
}

async fn archive_goal(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let id = parse_id(&id, "goal")?;
    GoalService::archive(&state, &user.id, &id).await?;
    Ok(Json(serde_json::json!({ "message": "Goal archived successfully" })))
}

async fn restore_goal(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let id = parse_id(&id, "goal")?;
    GoalService::restore(&state, &user.id, &id).await?;
    Ok(Json(serde_json::json!({ "message": "Goal restored successfully" })))
}

#[cfg(test)]
mod tests {
    use crate::routes::testing::TestApp;
    use chrono::Duration;
    use http::StatusCode;
    use serde_json::{json, Value};

    fn goal(goal_type: &str, target: i64, progress: i64) -> Value {
        json!({
            "goal_type": goal_type,
            "target_value": target,
            "progress_value": progress,
            "time_frame": "daily"
        })
    }

    #[tokio::test]
    async fn completing_a_goal_over_http_alerts_once() {
        let app = TestApp::new().await;

        let (status, body) = app.call("POST", "/api/goals", Some(goal("Steps", 10, 0))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["goal_type"], "steps");
        let id = body["id"].as_str().unwrap().to_string();

        app.clock.advance(Duration::minutes(1));
        let (status, body) = app
            .call(
                "PUT",
                &format!("/api/goals/{}", id),
                Some(json!({"target_value": 10, "progress_value": 10, "time_frame": "daily"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_completed"], true);

        // Saving the same type again updates in place.
        app.clock.advance(Duration::minutes(1));
        let (status, _) = app.call("POST", "/api/goals", Some(goal("steps", 10, 10))).await;
        assert_eq!(status, StatusCode::OK);

        let (_, inbox) = app.call("GET", "/api/notifications", None).await;
        let inbox = inbox.as_array().unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0]["kind"], "goal_completed");
    }

    #[tokio::test]
    async fn list_filters_and_sorts() {
        let app = TestApp::new().await;
        app.call("POST", "/api/goals", Some(goal("water", 8, 2))).await;
        app.call("POST", "/api/goals", Some(goal("sleep", 8, 8))).await;
        app.call("POST", "/api/goals", Some(goal("reading", 30, 1))).await;

        let (_, body) = app
            .call("GET", "/api/goals?sort_by=goal_type&order=asc", None)
            .await;
        let names: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|g| g["goal_type"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["reading", "sleep", "water"]);

        let (_, body) = app.call("GET", "/api/goals?completed=true", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (_, body) = app.call("GET", "/api/goals?limit=abc&offset=-3", None).await;
        assert_eq!(body.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn archive_and_restore_are_not_idempotent() {
        let app = TestApp::new().await;
        let (_, body) = app.call("POST", "/api/goals", Some(goal("water", 8, 2))).await;
        let uri = format!("/api/goals/{}", body["id"].as_str().unwrap());

        assert_eq!(app.call("DELETE", &uri, None).await.0, StatusCode::OK);
        assert_eq!(app.call("DELETE", &uri, None).await.0, StatusCode::NOT_FOUND);

        let (_, listed) = app.call("GET", "/api/goals", None).await;
        assert!(listed.as_array().unwrap().is_empty());

        let restore = format!("{}/restore", uri);
        assert_eq!(app.call("PUT", &restore, None).await.0, StatusCode::OK);
        assert_eq!(app.call("PUT", &restore, None).await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bad_ids_and_bodies_are_client_errors() {
        let app = TestApp::new().await;

        let (status, body) = app
            .call(
                "PUT",
                "/api/goals/not-a-uuid",
                Some(json!({"target_value": 1, "time_frame": "daily"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Invalid goal ID");

        let (status, _) = app.call("POST", "/api/goals", Some(goal("x", 10, 0))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = app.call("POST", "/api/goals", Some(goal("steps", 0, 0))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
