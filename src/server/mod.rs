//! Reference Backend
//!
//! A self-contained out-pass backend for development and tests, mirroring
//! the production API surface. State is in memory only.
//!
//! # Endpoints
//!
//! ## Root
//! - `GET /api/` - Liveness banner
//!
//! ## Auth
//! - `POST /api/auth/register` - Create a student account
//! - `POST /api/auth/login` - Exchange credentials for a token
//!
//! ## Out-pass
//! - `POST /api/outpass/create` - Submit a new request
//! - `GET /api/outpass/myrequests` - The caller's requests, newest first
//! - `PUT /api/outpass/approve/:id` - Approve a request (warden side)
//! - `PUT /api/outpass/reject/:id` - Reject a request (warden side)
//!
//! ## WebSocket
//! - `GET /api/ws?token=...` - Live-sync push connection
//!
//! # Example
//!
//! ```rust,ignore
//! use outpass::config::Config;
//! use outpass::server::{serve, AppState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     serve(AppState::new(), &config.server).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod hub;
pub mod qr;
pub mod routes;
pub mod state;
pub mod ws;

pub use error::{ApiError, ApiResult};
pub use hub::UserHub;
pub use state::{AppState, StoredPass, UserRecord};

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ServerConfig;

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/", get(routes::root::banner))
        // Auth routes
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        // Out-pass routes
        .route("/outpass/create", post(routes::outpass::create))
        .route("/outpass/myrequests", get(routes::outpass::list_mine))
        .route("/outpass/approve/:id", put(routes::outpass::approve))
        .route("/outpass/reject/:id", put(routes::outpass::reject))
        // WebSocket route
        .route("/ws", get(ws::ws_handler));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()) // Configure properly in production
        .with_state(state)
}

/// Start the reference backend
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Out-pass backend listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Out-pass backend shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn test_app() -> Router {
        build_router(AppState::new())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_authed(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn register_body(email: &str, roll_no: &str) -> Value {
        json!({
            "name": "Asha Rao",
            "rollNo": roll_no,
            "email": email,
            "password": "asdfjkl;",
        })
    }

    async fn register(app: &Router, email: &str, roll_no: &str) -> String {
        let response = app
            .clone()
            .oneshot(post_json("/api/auth/register", register_body(email, roll_no)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_banner() {
        let app = test_app();

        let response = app
            .oneshot(Request::builder().uri("/api/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["message"].as_str().unwrap().contains("running"));
    }

    #[tokio::test]
    async fn test_register_issues_token() {
        let app = test_app();
        let token = register(&app, "asha@hitam.org", "22H51A0501").await;
        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let app = test_app();
        register(&app, "asha@hitam.org", "22H51A0501").await;

        let response = app
            .oneshot(post_json(
                "/api/auth/register",
                register_body("asha@hitam.org", "22H51A0599"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "Email or Roll No already registered");
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let app = test_app();
        register(&app, "asha@hitam.org", "22H51A0501").await;

        let response = app
            .oneshot(post_json(
                "/api/auth/login",
                json!({"email": "asha@hitam.org", "password": "wrong"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "Invalid credentials");
    }

    #[tokio::test]
    async fn test_protected_route_requires_bearer() {
        let app = test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/outpass/myrequests")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "Not authenticated");
    }

    #[tokio::test]
    async fn test_invalid_json_returns_400() {
        let app = test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header("Content-Type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_approve_flow() {
        let app = test_app();
        let token = register(&app, "asha@hitam.org", "22H51A0501").await;

        let create = Request::builder()
            .method("POST")
            .uri("/api/outpass/create")
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::from(
                json!({
                    "reason": "Medical appointment",
                    "dateOut": "2024-05-01T09:00",
                    "returnTime": "2024-05-01T18:00",
                })
                .to_string(),
            ))
            .unwrap();
        let response = app.clone().oneshot(create).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = body_json(response).await;
        assert_eq!(created["status"], "PENDING");
        assert!(created["qrCodeDataUrl"].is_null());
        let pass_id = created["id"].as_str().unwrap().to_string();

        let approve = Request::builder()
            .method("PUT")
            .uri(format!("/api/outpass/approve/{}", pass_id))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(approve).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["ok"], true);

        let response = app
            .clone()
            .oneshot(get_authed("/api/outpass/myrequests", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let items = body_json(response).await;
        assert_eq!(items[0]["status"], "APPROVED");
        assert!(items[0]["qrCodeDataUrl"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_status_update_on_unknown_id_is_404() {
        let app = test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/outpass/reject/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "Request not found");
    }
}
