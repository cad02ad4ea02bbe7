//! Root Route
//!
//! - GET /api/ - Liveness banner

use axum::Json;

use crate::client::ApiStatus;

/// GET /api/
///
/// Plain banner so a browser or health check can tell the API is up.
pub async fn banner() -> Json<ApiStatus> {
    Json(ApiStatus {
        message: "Out-Pass API is running".to_string(),
    })
}
