pub mod email_auth;
pub mod google;
pub mod jwt;
pub mod keys;
pub mod session;
pub mod types;
pub mod utils;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

use email_auth::{login_handler, register_handler};
use session::{logout_handler, session_handler};

/// Full auth surface: email + Google sign-in, session resolution, logout.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/google", post(google::google_login_handler))
        .route("/api/auth/session", get(session_handler))
        .route("/api/auth/logout", post(logout_handler))
}
