use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    routing::post,
    Json, RequestPartsExt, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::{Deserialize, Serialize};

use crate::db::UserRepository;
use crate::error::{AppError, AppResult};
use crate::services::auth::AuthService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/request-reset", post(request_reset))
        .route("/reset-password", post(reset_password))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ResetRequestResponse {
    pub message: String,
    /// Only present when the server is configured to expose reset tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    pub new_password: String,
}

// ============================================================================
// Handlers
// ============================================================================

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    AuthService::register(&state, &req.email, &req.password, &req.name).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully".to_string(),
        }),
    ))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let token = AuthService::login(&state, &req.email, &req.password).await?;

    Ok(Json(TokenResponse { token }))
}

/// Always answers the same way so callers cannot probe which emails exist.
async fn request_reset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetRequest>,
) -> AppResult<Json<ResetRequestResponse>> {
    let issued = AuthService::request_reset(&state, &req.email).await?;

    let (token, reset_url) = match issued {
        Some(i) if state.config.auth.expose_reset_token => (Some(i.token), Some(i.reset_url)),
        _ => (None, None),
    };

    Ok(Json(ResetRequestResponse {
        message: "If the email exists, you will receive a reset link".to_string(),
        token,
        reset_url,
    }))
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    AuthService::reset_password(&state, &req.token, &req.new_password).await?;

    Ok(Json(MessageResponse {
        message: "Password reset successful".to_string(),
    }))
}

// ============================================================================
// Auth Extractor
// ============================================================================

/// Extractor for the authenticated user (`Authorization: Bearer <jwt>`).
pub struct AuthUser(pub crate::db::User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| {
                tracing::debug!("Missing or invalid Authorization header");
                AppError::Unauthorized
            })?;

        let claims = AuthService::decode_token(state, bearer.token()).map_err(|e| {
            tracing::debug!("Rejected bearer token: {:?}", e);
            AppError::Unauthorized
        })?;

        // Tokens outlive deleted accounts.
        let user = UserRepository::find_by_id(&state.db, &claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser(user))
    }
}
