//! Out-Pass Routes
//!
//! - POST /api/outpass/create - Submit a new request
//! - GET  /api/outpass/myrequests - The caller's requests, newest first
//! - PUT  /api/outpass/approve/:id - Approve a request (warden side)
//! - PUT  /api/outpass/reject/:id - Reject a request (warden side)

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::Serialize;

use crate::client::{OutPassDraft, OutPassRequest, PassStatus};
use crate::server::error::{ApiError, ApiResult};
use crate::server::qr;
use crate::server::state::{AppState, StoredPass, UserRecord};

#[derive(Serialize)]
pub struct Ack {
    pub ok: bool,
}

/// POST /api/outpass/create
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(draft): Json<OutPassDraft>,
) -> ApiResult<Json<OutPassRequest>> {
    let user = require_user(&state, &headers).await?;

    let pass = state.create_pass(&user.id, &draft).await;
    tracing::info!(user_id = %user.id, pass_id = %pass.id, "Out-pass request created");
    Ok(Json(pass_response(&pass)?))
}

/// GET /api/outpass/myrequests
pub async fn list_mine(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<OutPassRequest>>> {
    let user = require_user(&state, &headers).await?;

    let passes = state.passes_for_user(&user.id).await;
    let items = passes
        .iter()
        .map(pass_response)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(items))
}

/// PUT /api/outpass/approve/:id
///
/// Approval mints the QR token and pushes a refresh to the owner's open
/// portal tabs.
pub async fn approve(
    State(state): State<AppState>,
    Path(pass_id): Path<String>,
) -> ApiResult<Json<Ack>> {
    set_status(state, &pass_id, PassStatus::Approved).await
}

/// PUT /api/outpass/reject/:id
pub async fn reject(
    State(state): State<AppState>,
    Path(pass_id): Path<String>,
) -> ApiResult<Json<Ack>> {
    set_status(state, &pass_id, PassStatus::Rejected).await
}

async fn set_status(state: AppState, pass_id: &str, status: PassStatus) -> ApiResult<Json<Ack>> {
    let pass = state
        .set_pass_status(pass_id, status)
        .await
        .ok_or_else(|| ApiError::NotFound("Request not found".to_string()))?;

    let delivered = state.hub.push_refresh(&pass.user_id).await;
    tracing::info!(
        pass_id = %pass.id,
        status = %pass.status,
        connections = delivered,
        "Out-pass status updated"
    );
    Ok(Json(Ack { ok: true }))
}

/// Resolve the bearer token in `headers` or fail with 401
async fn require_user(state: &AppState, headers: &HeaderMap) -> ApiResult<UserRecord> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    state
        .user_for_token(token)
        .await
        .ok_or_else(|| ApiError::Unauthorized("Invalid token".to_string()))
}

/// Shape a stored pass for the wire
///
/// Approved passes carry their QR image inline as a PNG data URL.
fn pass_response(pass: &StoredPass) -> ApiResult<OutPassRequest> {
    let qr_code_data_url = match (pass.status, &pass.qr_token) {
        (PassStatus::Approved, Some(qr_token)) => {
            let payload = format!("outpass:pass:{}", qr_token);
            let url = qr::qr_data_url(&payload).map_err(|e| ApiError::Internal(e.to_string()))?;
            Some(url)
        }
        _ => None,
    };

    Ok(OutPassRequest {
        id: pass.id.clone(),
        reason: pass.reason.clone(),
        date_out: pass.date_out.clone(),
        return_time: pass.return_time.clone(),
        status: pass.status,
        qr_code_data_url,
        created_at: Some(pass.created_at),
    })
}
