//! Registration, login, refresh, and logout endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::error::{ApiError, ResultExt};
use super::users::UserProfile;
use super::ApiResponse;
use crate::AppState;
use crate::auth::{ClientMeta, RefreshTokenError};
use crate::db::User;
use crate::rate_limit::{self, RateLimitConfig};

const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
    /// Client-reported fingerprint; falls back to the User-Agent one
    pub device_info: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub user: UserProfile,
}

pub fn router(state: AppState, rate_limits: Arc<RateLimitConfig>) -> Router {
    let register_routes = Router::new()
        .route("/register", post(register))
        .layer(middleware::from_fn_with_state(
            rate_limits.clone(),
            rate_limit::rate_limit_register,
        ));

    let login_routes = Router::new()
        .route("/authenticate", post(authenticate))
        .layer(middleware::from_fn_with_state(
            rate_limits.clone(),
            rate_limit::rate_limit_login,
        ));

    let refresh_routes = Router::new()
        .route("/refresh-token", post(refresh_token))
        .layer(middleware::from_fn_with_state(
            rate_limits,
            rate_limit::rate_limit_refresh,
        ));

    Router::new()
        .merge(register_routes)
        .merge(login_routes)
        .merge(refresh_routes)
        .route("/logout", post(logout))
        .with_state(state)
}

/// Issue the access + refresh token pair for a user.
async fn issue_token_pair(
    state: &AppState,
    user: &User,
    meta: &ClientMeta,
) -> Result<AuthenticationResponse, ApiError> {
    let access_token = state
        .jwt
        .issue(user)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let refresh = state
        .refresh_tokens
        .create(user, meta.ip.as_deref(), Some(&meta.device))
        .await
        .map_err(refresh_err)?;

    Ok(AuthenticationResponse {
        access_token,
        refresh_token: refresh.token,
        token_type: "Bearer",
        user: UserProfile::from(user),
    })
}

fn refresh_err(e: RefreshTokenError) -> ApiError {
    match e {
        RefreshTokenError::Store(e) => ApiError::db_error("Refresh token store error", e),
        e => ApiError::forbidden(e.to_string()),
    }
}

fn validate_registration(req: &RegisterRequest) -> Result<(), ApiError> {
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(ApiError::bad_request("A valid email is required"));
    }
    if req.username.trim().is_empty() {
        return Err(ApiError::bad_request("Username is required"));
    }
    if req.password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

async fn register(
    State(state): State<AppState>,
    meta: ClientMeta,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_registration(&req)?;

    if state
        .db
        .users()
        .exists_by_email(&req.email)
        .await
        .db_err("Failed to check existing email")?
    {
        return Err(ApiError::conflict("Email already registered"));
    }

    let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    let id = state
        .db
        .users()
        .create(&req.email, &req.username, &password_hash, &["ROLE_USER".into()])
        .await
        .db_err("Failed to create user")?;

    let user = state
        .db
        .users()
        .get_by_id(id)
        .await
        .db_err("Failed to load new user")?
        .ok_or_else(|| ApiError::internal("User record missing after insert"))?;

    info!(user_id = user.id, "Registered user");

    let tokens = issue_token_pair(&state, &user, &meta).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("User registered successfully", tokens)),
    ))
}

async fn authenticate(
    State(state): State<AppState>,
    meta: ClientMeta,
    Json(req): Json<AuthenticationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_email(&req.email)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let verified = bcrypt::verify(&req.password, &user.password_hash)
        .map_err(|e| ApiError::internal(format!("Failed to verify password: {}", e)))?;
    if !verified {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    info!(user_id = user.id, "Authenticated user");

    let tokens = issue_token_pair(&state, &user, &meta).await?;
    Ok(Json(ApiResponse::success(
        "Authentication successful",
        tokens,
    )))
}

async fn refresh_token(
    State(state): State<AppState>,
    meta: ClientMeta,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let stored = state
        .refresh_tokens
        .find_by_token(&req.refresh_token)
        .await
        .map_err(refresh_err)?
        .ok_or_else(|| ApiError::forbidden("Refresh token not found"))?;

    state
        .refresh_tokens
        .verify_expiration(&stored)
        .await
        .map_err(refresh_err)?;

    let device = req.device_info.as_deref().unwrap_or(&meta.device);
    let rotated = state
        .refresh_tokens
        .rotate(&req.refresh_token, meta.ip.as_deref(), Some(device))
        .await
        .map_err(refresh_err)?;

    let user = state
        .db
        .users()
        .get_by_id(rotated.user_id)
        .await
        .db_err("Failed to load token owner")?
        .ok_or_else(|| ApiError::internal("User record missing for refresh token"))?;

    let access_token = state
        .jwt
        .issue(&user)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        "Refresh token renewed",
        AuthenticationResponse {
            access_token,
            refresh_token: rotated.token,
            token_type: "Bearer",
            user: UserProfile::from(&user),
        },
    )))
}

async fn logout(
    State(state): State<AppState>,
    Json(req): Json<LogoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let revoked = state
        .refresh_tokens
        .delete_by_token(&req.refresh_token)
        .await
        .map_err(refresh_err)?;

    let message = if revoked {
        "Logged out successfully"
    } else {
        "No active session"
    };

    Ok(Json(ApiResponse::success(
        message,
        json!({ "revoked": revoked }),
    )))
}
