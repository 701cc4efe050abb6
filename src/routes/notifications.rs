use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{Notification, NotificationFilter};
use crate::error::AppResult;
use crate::routes::auth::AuthUser;
use crate::routes::{page, parse_flag, parse_id};
use crate::AppState;

/// The static segments are registered before `/:id` so they are never
/// mistaken for an id.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/read-all", put(mark_all_read))
        .route("/clear-all", delete(clear_all))
        .route("/:id", delete(delete_notification))
        .route("/:id/read", put(mark_read))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Raw strings so malformed values fall back to defaults instead of a 400.
#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub is_read: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated_notifications: u64,
}

#[derive(Debug, Serialize)]
pub struct ClearAllResponse {
    pub deleted_notifications: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// List the current user's notifications, newest first
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<ListNotificationsQuery>,
) -> AppResult<Json<Vec<Notification>>> {
    let (limit, offset) = page(query.limit.as_deref(), query.offset.as_deref());
    let filter = NotificationFilter {
        is_read: parse_flag(query.is_read.as_deref()),
        limit,
        offset,
    };

    Ok(Json(state.notifications.list(&user.id, &filter).await?))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let id = parse_id(&id, "notification")?;
    state.notifications.mark_read(&user.id, &id).await?;
    Ok(Json(serde_json::json!({ "message": "Notification marked as read" })))
}

async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<MarkAllReadResponse>> {
    let updated = state.notifications.mark_all_read(&user.id).await?;
    Ok(Json(MarkAllReadResponse {
        updated_notifications: updated,
    }))
}

async fn delete_notification(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let id = parse_id(&id, "notification")?;
    state.notifications.delete(&user.id, &id).await?;
    Ok(Json(serde_json::json!({ "message": "Notification deleted successfully" })))
}

async fn clear_all(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<ClearAllResponse>> {
    let deleted = state.notifications.delete_all(&user.id).await?;
    Ok(Json(ClearAllResponse {
        deleted_notifications: deleted,
    }))
}
