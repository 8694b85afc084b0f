use anyhow::Result;
use axum::{extract::State, http::StatusCode, Json};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::api::handlers::build_profile;
use crate::api::types::SessionResponse;
use crate::auth::jwt;
use crate::db::DBLayer;
use crate::model::user::{Preferences, User};
use crate::state::AppState;

/// What the identity provider vouches for after token verification.
#[derive(Debug, Clone)]
pub struct ProviderSession {
    /// Stable subject at the provider, e.g. "google:<sub>" or "email:<addr>".
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone)]
pub enum SessionState {
    Uninitialized,
    /// Nothing conclusive yet; consumers must not treat this as either
    /// signed-in or signed-out.
    Loading,
    Authenticated(Box<User>),
    Anonymous,
}

impl SessionState {
    pub fn status(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Loading => "loading",
            SessionState::Authenticated(_) => "authenticated",
            SessionState::Anonymous => "anonymous",
        }
    }
}

/// Holds the resolved session for the active client context.
/// uninitialized → loading → {authenticated, anonymous}; every provider
/// change re-enters loading before settling.
pub struct SessionHolder {
    state: RwLock<SessionState>,
}

impl SessionHolder {
    pub fn new() -> Self {
        SessionHolder {
            state: RwLock::new(SessionState::Uninitialized),
        }
    }

    pub async fn current(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Provider session changed: reconcile the backing profile and settle.
    /// A failed fetch/create falls back to a minimal profile derived from
    /// the session instead of locking the user out.
    pub async fn sync(&self, db: &DBLayer, session: Option<&ProviderSession>) -> SessionState {
        *self.state.write().await = SessionState::Loading;

        let next = match session {
            None => SessionState::Anonymous,
            Some(provider) => match ensure_profile(db, provider).await {
                Ok(user) => SessionState::Authenticated(Box::new(user)),
                Err(err) => {
                    warn!("profile reconcile failed, using session fallback: {err}");
                    SessionState::Authenticated(Box::new(fallback_profile(provider)))
                }
            },
        };

        *self.state.write().await = next.clone();
        next
    }

    /// Resolve an app token back into a session (page reload path).
    pub async fn resume(&self, db: &DBLayer, user_id: &str) -> SessionState {
        *self.state.write().await = SessionState::Loading;

        let next = match db.load_user(user_id).await {
            Ok(Some(user)) => SessionState::Authenticated(Box::new(user)),
            Ok(None) => SessionState::Anonymous,
            Err(err) => {
                warn!("profile fetch failed, using token fallback: {err}");
                SessionState::Authenticated(Box::new(minimal_profile(user_id)))
            }
        };

        *self.state.write().await = next.clone();
        next
    }

    /// Sign-out confirmed by the provider; settle synchronously.
    pub async fn clear(&self) -> SessionState {
        *self.state.write().await = SessionState::Anonymous;
        SessionState::Anonymous
    }
}

/// Fetch the backing profile, creating it on first sign-in and reconciling
/// display name / avatar / email from the provider on every change.
pub async fn ensure_profile(db: &DBLayer, session: &ProviderSession) -> Result<User> {
    let existing = match db.find_user_by_external_id(&session.subject).await? {
        Some(user) => Some(user),
        None => match &session.email {
            Some(email) => db.find_user_by_email(email).await?,
            None => None,
        },
    };

    let now = chrono::Utc::now().timestamp();

    if let Some(mut user) = existing {
        let mut changed = false;

        if let Some(name) = &session.name {
            if user.name.as_deref() != Some(name) {
                user.name = Some(name.clone());
                changed = true;
            }
        }
        if let Some(email) = &session.email {
            if user.email.as_deref() != Some(email) {
                user.email = Some(email.clone());
                changed = true;
            }
        }
        if let Some(avatar) = &session.avatar_url {
            if user.avatar_url.as_deref() != Some(avatar) {
                user.avatar_url = Some(avatar.clone());
                changed = true;
            }
        }
        if user.external_id.is_none() {
            user.external_id = Some(session.subject.clone());
            changed = true;
        }
        if record_auth_method(&mut user, &session.subject) {
            changed = true;
        }

        if changed {
            user.updated_ts = now;
            db.save_user(&user).await?;
        }

        return Ok(user);
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        name: session.name.clone(),
        email: session.email.clone(),
        avatar_url: session.avatar_url.clone(),
        external_id: Some(session.subject.clone()),
        created_ts: now,
        updated_ts: now,
        password_hash: None,
        preferences: Preferences::default(),
        meta: Some(json!({ "auth_methods": [session.subject] })),
    };

    db.save_user(&user).await?;
    Ok(user)
}

/// Track which providers have signed this account in. Returns true if the
/// list changed.
fn record_auth_method(user: &mut User, subject: &str) -> bool {
    let mut meta = user.meta.take().unwrap_or_else(|| json!({}));
    let mut methods = meta
        .get("auth_methods")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let changed = if methods.iter().any(|m| m.as_str() == Some(subject)) {
        false
    } else {
        methods.push(json!(subject));
        true
    };

    meta["auth_methods"] = json!(methods);
    user.meta = Some(meta);
    changed
}

/// Minimal profile derived straight from the provider session. Aggregate
/// counters are derived elsewhere, so they come out zeroed on their own.
pub fn fallback_profile(session: &ProviderSession) -> User {
    let now = chrono::Utc::now().timestamp();
    User {
        id: session.subject.clone(),
        name: session.name.clone(),
        email: session.email.clone(),
        avatar_url: session.avatar_url.clone(),
        external_id: Some(session.subject.clone()),
        created_ts: now,
        updated_ts: now,
        password_hash: None,
        preferences: Preferences::default(),
        meta: None,
    }
}

fn minimal_profile(user_id: &str) -> User {
    let now = chrono::Utc::now().timestamp();
    User {
        id: user_id.to_string(),
        name: None,
        email: None,
        avatar_url: None,
        external_id: None,
        created_ts: now,
        updated_ts: now,
        password_hash: None,
        preferences: Preferences::default(),
        meta: None,
    }
}

// ------------------------------------------------------------
// HANDLERS
// ------------------------------------------------------------

pub async fn session_handler(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<SessionResponse>, (StatusCode, String)> {
    let claims = bearer.and_then(|TypedHeader(Authorization(bearer))| {
        jwt::verify_jwt(bearer.token(), &state.jwt_secret).ok()
    });

    let session_state = match claims {
        Some(claims) => state.session.resume(&state.db, &claims.sub).await,
        None => state.session.sync(&state.db, None).await,
    };

    let response = match &session_state {
        SessionState::Authenticated(user) => SessionResponse {
            status: session_state.status().to_string(),
            profile: Some(
                build_profile(&state, user)
                    .await
                    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?,
            ),
        },
        other => SessionResponse {
            status: other.status().to_string(),
            profile: None,
        },
    };

    Ok(Json(response))
}

pub async fn logout_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.session.clear().await;
    Json(json!({ "success": true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_db(dir: &TempDir) -> DBLayer {
        DBLayer::new(dir.path().to_str().unwrap()).unwrap()
    }

    fn google_session() -> ProviderSession {
        ProviderSession {
            subject: "google:123".into(),
            email: Some("alex@example.com".into()),
            name: Some("Alex Chen".into()),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn holder_starts_uninitialized_and_settles_anonymous() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let holder = SessionHolder::new();

        assert_eq!(holder.current().await.status(), "uninitialized");
        assert_eq!(holder.sync(&db, None).await.status(), "anonymous");
    }

    #[tokio::test]
    async fn first_sign_in_creates_the_profile() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let holder = SessionHolder::new();

        let state = holder.sync(&db, Some(&google_session())).await;
        let SessionState::Authenticated(user) = state else {
            panic!("expected authenticated");
        };
        assert_eq!(user.name.as_deref(), Some("Alex Chen"));

        let stored = db.find_user_by_external_id("google:123").await.unwrap();
        assert_eq!(stored.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn repeat_sign_in_reconciles_instead_of_duplicating() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let first = ensure_profile(&db, &google_session()).await.unwrap();

        let mut renamed = google_session();
        renamed.name = Some("Alexandra Chen".into());
        let second = ensure_profile(&db, &renamed).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name.as_deref(), Some("Alexandra Chen"));
    }

    #[tokio::test]
    async fn providers_link_by_email() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let email_session = ProviderSession {
            subject: "email:alex@example.com".into(),
            email: Some("alex@example.com".into()),
            name: None,
            avatar_url: None,
        };
        let via_email = ensure_profile(&db, &email_session).await.unwrap();
        let via_google = ensure_profile(&db, &google_session()).await.unwrap();

        assert_eq!(via_email.id, via_google.id);

        let methods = via_google.meta.unwrap()["auth_methods"]
            .as_array()
            .unwrap()
            .len();
        assert_eq!(methods, 2);
    }

    #[tokio::test]
    async fn logout_clears_to_anonymous() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let holder = SessionHolder::new();

        holder.sync(&db, Some(&google_session())).await;
        assert_eq!(holder.clear().await.status(), "anonymous");
        assert_eq!(holder.current().await.status(), "anonymous");
    }

    #[test]
    fn fallback_profile_is_minimal() {
        let user = fallback_profile(&google_session());
        assert_eq!(user.id, "google:123");
        assert_eq!(user.email.as_deref(), Some("alex@example.com"));
        assert!(user.password_hash.is_none());
        assert_eq!(user.preferences, Preferences::default());
    }
}
