//! Application State
//!
//! In-memory stores for the reference backend. Everything lives behind one
//! `RwLock`; the dev server trades durability for zero setup, a restart
//! wipes accounts and passes alike.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::client::{OutPassDraft, PassStatus, RegisterProfile};
use crate::server::hub::UserHub;

/// A registered student
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub roll_no: String,
    pub email: String,
    password: String,
}

/// A stored out-pass request
#[derive(Debug, Clone)]
pub struct StoredPass {
    pub id: String,
    pub user_id: String,
    pub reason: String,
    pub date_out: String,
    pub return_time: String,
    pub status: PassStatus,
    /// Assigned on first approval; scanned at the gate
    pub qr_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Store {
    users: HashMap<String, UserRecord>,
    /// Bearer token -> user id; tokens never expire in the dev server
    tokens: HashMap<String, String>,
    /// Append-only, so index order is creation order
    passes: Vec<StoredPass>,
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<RwLock<Store>>,
    pub hub: Arc<UserHub>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::default())),
            hub: Arc::new(UserHub::new()),
        }
    }

    /// Register a student and mint their first token
    ///
    /// Returns `None` when the email or roll number is already taken.
    pub async fn register_user(&self, profile: &RegisterProfile) -> Option<(UserRecord, String)> {
        let mut store = self.store.write().await;
        let taken = store
            .users
            .values()
            .any(|u| u.email == profile.email || u.roll_no == profile.roll_no);
        if taken {
            return None;
        }

        let user = UserRecord {
            id: Uuid::new_v4().to_string(),
            name: profile.name.clone(),
            roll_no: profile.roll_no.clone(),
            email: profile.email.clone(),
            password: profile.password.clone(),
        };
        let token = Uuid::new_v4().to_string();
        store.tokens.insert(token.clone(), user.id.clone());
        store.users.insert(user.id.clone(), user.clone());
        Some((user, token))
    }

    /// Check credentials and mint a fresh token
    pub async fn login_user(&self, email: &str, password: &str) -> Option<String> {
        let mut store = self.store.write().await;
        let user_id = store
            .users
            .values()
            .find(|u| u.email == email && u.password == password)?
            .id
            .clone();
        let token = Uuid::new_v4().to_string();
        store.tokens.insert(token.clone(), user_id);
        Some(token)
    }

    /// Resolve a bearer token to its user
    pub async fn user_for_token(&self, token: &str) -> Option<UserRecord> {
        let store = self.store.read().await;
        let user_id = store.tokens.get(token)?;
        store.users.get(user_id).cloned()
    }

    /// Store a new pending request
    pub async fn create_pass(&self, user_id: &str, draft: &OutPassDraft) -> StoredPass {
        let pass = StoredPass {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            reason: draft.reason.clone(),
            date_out: draft.date_out.clone(),
            return_time: draft.return_time.clone(),
            status: PassStatus::Pending,
            qr_token: None,
            created_at: Utc::now(),
        };
        self.store.write().await.passes.push(pass.clone());
        pass
    }

    /// A user's requests, newest first
    pub async fn passes_for_user(&self, user_id: &str) -> Vec<StoredPass> {
        let store = self.store.read().await;
        let mut passes: Vec<StoredPass> = store
            .passes
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        passes.reverse();
        passes
    }

    /// Update a request's status
    ///
    /// The first approval assigns the QR token; later status flips keep it,
    /// so a re-approved pass scans the same as before.
    pub async fn set_pass_status(&self, pass_id: &str, status: PassStatus) -> Option<StoredPass> {
        let mut store = self.store.write().await;
        let pass = store.passes.iter_mut().find(|p| p.id == pass_id)?;
        pass.status = status;
        if status == PassStatus::Approved && pass.qr_token.is_none() {
            pass.qr_token = Some(Uuid::new_v4().to_string());
        }
        Some(pass.clone())
    }

    pub async fn pass_count(&self) -> usize {
        self.store.read().await.passes.len()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
