use axum::{extract::State, http::StatusCode, Json};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::auth::jwt::make_jwt;
use crate::auth::session::{ProviderSession, SessionState};
use crate::auth::types::{AuthResponse, GoogleAuthRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct GoogleClaims {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

pub async fn google_login_handler(
    State(state): State<AppState>,
    Json(payload): Json<GoogleAuthRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    if state.google_client_id.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Google login disabled".into()));
    }

    // --- decode JWT header ---
    let header = decode_header(&payload.id_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, format!("bad header: {e}")))?;
    let kid = header
        .kid
        .ok_or((StatusCode::UNAUTHORIZED, "no kid".to_string()))?;

    // --- fetch Google public key ---
    let jwk = state
        .google_keys
        .get_key(&kid)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")))?;

    let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("invalid key: {e}")))?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[&state.google_client_id]);
    validation.set_issuer(&["https://accounts.google.com", "accounts.google.com"]);

    // --- verify token ---
    let data = decode::<GoogleClaims>(&payload.id_token, &decoding_key, &validation)
        .map_err(|e| (StatusCode::UNAUTHORIZED, format!("verify failed: {e}")))?;
    let claims = data.claims;

    // --- reconcile profile via the session holder ---
    let provider = ProviderSession {
        subject: format!("google:{}", claims.sub),
        email: claims.email.map(|e| e.trim().to_lowercase()),
        name: claims.name,
        avatar_url: claims.picture,
    };

    let session_state = state.session.sync(&state.db, Some(&provider)).await;
    let user = match session_state {
        SessionState::Authenticated(user) => *user,
        _ => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "session did not settle".into(),
            ))
        }
    };

    // --- issue our own JWT ---
    let jwt = make_jwt(&user.id, &state.jwt_secret)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(AuthResponse {
        jwt,
        user_id: user.id,
        email: user.email,
    }))
}
