//! Auth Routes
//!
//! - POST /api/auth/register - Create a student account
//! - POST /api/auth/login - Exchange credentials for a token

use axum::extract::State;
use axum::Json;

use crate::client::{LoginCredentials, RegisterProfile, TokenResponse};
use crate::server::error::{ApiError, ApiResult};
use crate::server::state::AppState;

/// POST /api/auth/register
///
/// Registers the student and returns a token right away, so the portal
/// can land on the dashboard without a separate login step.
pub async fn register(
    State(state): State<AppState>,
    Json(profile): Json<RegisterProfile>,
) -> ApiResult<Json<TokenResponse>> {
    let (user, access_token) = state.register_user(&profile).await.ok_or_else(|| {
        ApiError::BadRequest("Email or Roll No already registered".to_string())
    })?;

    tracing::info!(user_id = %user.id, roll_no = %user.roll_no, "Student registered");
    Ok(Json(TokenResponse { access_token }))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<LoginCredentials>,
) -> ApiResult<Json<TokenResponse>> {
    let access_token = state
        .login_user(&credentials.email, &credentials.password)
        .await
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    tracing::info!("Student logged in");
    Ok(Json(TokenResponse { access_token }))
}
