//! Auth handlers: login, logout, me.

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use tracing::{info, warn};
use validator::Validate;

use market_core::error::AppError;

use crate::dto::request::LoginRequest;
use crate::dto::response::{ApiResponse, LoginResponse, MessageResponse, UserResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// Same message for unknown e-mail and wrong password.
const BAD_LOGIN: &str = "invalid email or password";

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let Some(account) = state.accounts.find_by_email(&req.email).await? else {
        warn!(email = %req.email, "Login for unknown account");
        return Err(AppError::unauthorized(BAD_LOGIN).into());
    };

    if !state
        .password_hasher
        .verify_password(&req.password, &account.password_hash)?
    {
        warn!(email = %account.email, "Login with wrong password");
        return Err(AppError::unauthorized(BAD_LOGIN).into());
    }

    let now = Utc::now();
    let issued = state.jwt_encoder.issue_at(&account, now)?;
    state
        .session_log
        .record_login(&account.email, &issued.token, now)
        .await?;

    info!(
        account_id = %account.id,
        role = %account.role,
        expires_in = issued.expires_in,
        "User logged in"
    );

    Ok(Json(ApiResponse::ok(LoginResponse {
        token: issued.token,
        expires_in: issued.expires_in,
        expires_at: issued.expires_at,
        user: UserResponse::from(&account),
    })))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let closed = state
        .session_log
        .record_logout(&auth.token, Utc::now())
        .await?;

    info!(account_id = %auth.sub, closed, "User logged out");

    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "Logged out successfully".to_string(),
    })))
}

/// GET /api/auth/me
pub async fn me(auth: AuthUser) -> Json<ApiResponse<UserResponse>> {
    Json(ApiResponse::ok(UserResponse::from(&auth.claims)))
}
