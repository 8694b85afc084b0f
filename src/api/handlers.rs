use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::api::auth::AuthenticatedUser;
use crate::api::types::*;
use crate::catalog;
use crate::model::device::Device;
use crate::model::recommendation::Recommendation;
use crate::model::user::User;
use crate::state::AppState;
use crate::store::device::{DeviceFilters, DeviceUpdate, NewDevice, PortfolioStats};
use crate::store::recommendation::RecommendationFilters;
use crate::store::StoreOutcome;

fn internal(err: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

async fn require_user(
    state: &AppState,
    user_id: &str,
) -> Result<User, (StatusCode, String)> {
    state
        .db
        .load_user(user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "Unknown user".to_string()))
}

// ------------------------------------------------------------
// DEVICES
// ------------------------------------------------------------

pub async fn list_devices(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(filters): Query<DeviceFilters>,
) -> Result<Json<DevicesResponse>, (StatusCode, String)> {
    let devices = state
        .devices
        .list(&claims.sub, &filters)
        .await
        .map_err(internal)?;
    Ok(Json(DevicesResponse { devices }))
}

pub async fn add_device(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(input): Json<NewDevice>,
) -> Result<Json<Device>, (StatusCode, String)> {
    // Form validation happens here, before anything mutates.
    if input.brand.trim().is_empty() || input.model.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Brand and model are required".into()));
    }
    if input.purchase_price <= 0.0 {
        return Err((StatusCode::BAD_REQUEST, "Purchase price must be positive".into()));
    }
    if input.purchase_ts > chrono::Utc::now().timestamp() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Purchase date cannot be in the future".into(),
        ));
    }

    // Ownership context must exist before anything is written.
    require_user(&state, &claims.sub).await?;

    let device = state
        .devices
        .add(&claims.sub, input)
        .await
        .map_err(internal)?;
    Ok(Json(device))
}

pub async fn get_device(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(device_id): Path<String>,
) -> Result<Json<Device>, (StatusCode, String)> {
    let device = state
        .devices
        .get(&claims.sub, &device_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "device not found".to_string()))?;
    Ok(Json(device))
}

pub async fn update_device(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(device_id): Path<String>,
    Json(patch): Json<DeviceUpdate>,
) -> Result<Json<StoreOutcome>, (StatusCode, String)> {
    if let Some(price) = patch.purchase_price {
        if price <= 0.0 {
            return Err((StatusCode::BAD_REQUEST, "Purchase price must be positive".into()));
        }
    }

    let outcome = state
        .devices
        .update(&claims.sub, &device_id, patch)
        .await
        .map_err(internal)?;
    Ok(Json(outcome))
}

pub async fn delete_device(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(device_id): Path<String>,
) -> Result<Json<StoreOutcome>, (StatusCode, String)> {
    let outcome = state
        .devices
        .remove(&claims.sub, &device_id)
        .await
        .map_err(internal)?;
    Ok(Json(outcome))
}

// ------------------------------------------------------------
// SELECTION
// ------------------------------------------------------------

pub async fn toggle_device_selection(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(device_id): Path<String>,
) -> Json<SelectionResponse> {
    let selected = state.devices.toggle_selection(&claims.sub, &device_id).await;
    Json(SelectionResponse { selected })
}

pub async fn select_all_devices(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(filters): Json<DeviceFilters>,
) -> Result<Json<SelectionResponse>, (StatusCode, String)> {
    let selected = state
        .devices
        .select_all(&claims.sub, &filters)
        .await
        .map_err(internal)?;
    Ok(Json(SelectionResponse { selected }))
}

pub async fn get_device_selection(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Json<SelectionResponse> {
    let selected = state.devices.selection(&claims.sub).await;
    Json(SelectionResponse { selected })
}

pub async fn clear_device_selection(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Json<SelectionResponse> {
    state.devices.clear_selection(&claims.sub).await;
    Json(SelectionResponse { selected: Vec::new() })
}

// ------------------------------------------------------------
// PORTFOLIO
// ------------------------------------------------------------

pub async fn portfolio_stats(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Result<Json<PortfolioStats>, (StatusCode, String)> {
    let stats = state
        .devices
        .portfolio_stats(&claims.sub)
        .await
        .map_err(internal)?;
    Ok(Json(stats))
}

// ------------------------------------------------------------
// RECOMMENDATIONS
// ------------------------------------------------------------

pub async fn list_recommendations(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(filters): Query<RecommendationFilters>,
) -> Result<Json<RecommendationsResponse>, (StatusCode, String)> {
    let recommendations = state
        .recommendations
        .list(&claims.sub, &filters)
        .await
        .map_err(internal)?;
    Ok(Json(RecommendationsResponse { recommendations }))
}

pub async fn active_recommendations(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Result<Json<ActiveRecommendationsResponse>, (StatusCode, String)> {
    let recommendations = state
        .recommendations
        .active(&claims.sub)
        .await
        .map_err(internal)?;
    Ok(Json(ActiveRecommendationsResponse {
        count: recommendations.len(),
        recommendations,
    }))
}

pub async fn get_recommendation(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(rec_id): Path<String>,
) -> Result<Json<Recommendation>, (StatusCode, String)> {
    // Dismissed and snoozed records stay fetchable by id; only the active
    // views exclude them.
    let rec = state
        .recommendations
        .get(&claims.sub, &rec_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "recommendation not found".to_string()))?;
    Ok(Json(rec))
}

pub async fn dismiss_recommendation(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(rec_id): Path<String>,
) -> Result<Json<StoreOutcome>, (StatusCode, String)> {
    let outcome = state
        .recommendations
        .dismiss(&claims.sub, &rec_id)
        .await
        .map_err(internal)?;
    Ok(Json(outcome))
}

pub async fn snooze_recommendation(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(rec_id): Path<String>,
    Json(req): Json<SnoozeRequest>,
) -> Result<Json<StoreOutcome>, (StatusCode, String)> {
    let outcome = state
        .recommendations
        .snooze(&claims.sub, &rec_id, req.until_ts)
        .await
        .map_err(internal)?;
    Ok(Json(outcome))
}

pub async fn refresh_recommendations(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Result<Json<RefreshResponse>, (StatusCode, String)> {
    let devices = state
        .devices
        .list(&claims.sub, &DeviceFilters::default())
        .await
        .map_err(internal)?;

    let fresh = state
        .recommendations
        .refresh_for_user(&claims.sub, &devices)
        .await
        .map_err(internal)?;

    Ok(Json(RefreshResponse { count: fresh.len() }))
}

// ------------------------------------------------------------
// PROFILE
// ------------------------------------------------------------

pub(crate) async fn build_profile(state: &AppState, user: &User) -> Result<ProfileResponse> {
    let stats = state.devices.portfolio_stats(&user.id).await?;

    Ok(ProfileResponse {
        id: user.id.clone(),
        name: user.display_name(),
        email: user.email.clone(),
        avatar_url: user.avatar_url.clone(),
        join_ts: user.created_ts,
        total_devices: stats.total_devices,
        portfolio_value: stats.total_value,
        total_savings: stats.total_savings,
        preferences: user.preferences.clone(),
    })
}

pub async fn get_profile(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    let user = require_user(&state, &claims.sub).await?;
    let profile = build_profile(&state, &user).await.map_err(internal)?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    let mut user = require_user(&state, &claims.sub).await?;

    if let Some(name) = req.name {
        if name.trim().is_empty() {
            return Err((StatusCode::BAD_REQUEST, "Name cannot be empty".into()));
        }
        user.name = Some(name.trim().to_string());
    }
    if let Some(avatar_url) = req.avatar_url {
        user.avatar_url = Some(avatar_url);
    }
    if let Some(preferences) = req.preferences {
        user.preferences = preferences;
    }
    user.updated_ts = chrono::Utc::now().timestamp();

    state.db.save_user(&user).await.map_err(internal)?;

    let profile = build_profile(&state, &user).await.map_err(internal)?;
    Ok(Json(profile))
}

// ------------------------------------------------------------
// CATALOG
// ------------------------------------------------------------

pub async fn list_brands(AuthenticatedUser(_): AuthenticatedUser) -> Json<BrandsResponse> {
    Json(BrandsResponse {
        brands: catalog::BRANDS.to_vec(),
    })
}

pub async fn list_models(
    AuthenticatedUser(_): AuthenticatedUser,
    Query(query): Query<ModelsQuery>,
) -> Json<ModelsResponse> {
    let models = match &query.search {
        Some(prefix) => catalog::models_matching(query.category, prefix),
        None => catalog::models_for_category(query.category).to_vec(),
    };
    Json(ModelsResponse { models })
}
