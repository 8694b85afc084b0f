use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use uuid::Uuid;

use crate::auth::session::{ProviderSession, SessionState};
use crate::auth::types::*;
use crate::auth::utils::*;
use crate::auth::jwt::make_jwt;
use crate::model::user::{Preferences, User};
use crate::state::AppState;

pub async fn register_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let email = req.email.trim().to_lowercase();

    if !is_valid_email(&email) {
        return Err((StatusCode::BAD_REQUEST, "Invalid email address".into()));
    }

    let policy_errors = validate_password(&req.password);
    if !policy_errors.is_empty() {
        return Err((StatusCode::BAD_REQUEST, policy_errors.join("; ")));
    }

    let existing = state
        .db
        .find_user_by_email(&email)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    if existing.is_some() {
        return Err((StatusCode::BAD_REQUEST, "Email already registered".into()));
    }

    let hash = hash_password(&req.password)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let now = chrono::Utc::now().timestamp();
    let subject = format!("email:{email}");
    let user = User {
        id: Uuid::new_v4().to_string(),
        name: req.name.clone(),
        email: Some(email.clone()),
        avatar_url: None,
        external_id: Some(subject.clone()),
        created_ts: now,
        updated_ts: now,
        password_hash: Some(hash),
        preferences: Preferences::default(),
        meta: Some(json!({ "auth_methods": [subject] })),
    };

    state
        .db
        .save_user(&user)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    // Settle the session holder for the fresh sign-in.
    state
        .session
        .sync(&state.db, Some(&provider_session(&user)))
        .await;

    let jwt = make_jwt(&user.id, &state.jwt_secret)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(AuthResponse {
        jwt,
        user_id: user.id,
        email: Some(email),
    }))
}

pub async fn login_handler(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let email = req.email.trim().to_lowercase();

    let user = state
        .db
        .find_user_by_email(&email)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()))?;

    let hash = user
        .password_hash
        .clone()
        .ok_or((StatusCode::UNAUTHORIZED, "Account has no password".to_string()))?;

    let valid = verify_password(&hash, &req.password)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    if !valid {
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let session_state = state
        .session
        .sync(&state.db, Some(&provider_session(&user)))
        .await;
    let user = match session_state {
        SessionState::Authenticated(user) => *user,
        _ => user,
    };

    let jwt = make_jwt(&user.id, &state.jwt_secret)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(AuthResponse {
        jwt,
        user_id: user.id,
        email: user.email,
    }))
}

fn provider_session(user: &User) -> ProviderSession {
    ProviderSession {
        subject: user
            .external_id
            .clone()
            .unwrap_or_else(|| format!("email:{}", user.email.as_deref().unwrap_or_default())),
        email: user.email.clone(),
        name: user.name.clone(),
        avatar_url: user.avatar_url.clone(),
    }
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::is_valid_email;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("alex@example.com"));
        assert!(!is_valid_email("alex@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("alex smith@example.com"));
        assert!(!is_valid_email("alex@.com"));
    }
}
