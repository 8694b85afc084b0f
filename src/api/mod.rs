use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod auth;
pub mod handlers;
pub mod images;
pub mod types;

use handlers::*;

/// Protected API surface (bearer token checked per handler).
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/devices", get(list_devices).post(add_device))
        .route(
            "/api/devices/{device_id}",
            get(get_device).put(update_device).delete(delete_device),
        )
        .route("/api/devices/{device_id}/select", post(toggle_device_selection))
        .route(
            "/api/devices/selection",
            get(get_device_selection).delete(clear_device_selection),
        )
        .route("/api/devices/selection/all", post(select_all_devices))
        .route("/api/portfolio/stats", get(portfolio_stats))
        .route("/api/recommendations", get(list_recommendations))
        .route("/api/recommendations/{rec_id}", get(get_recommendation))
        .route("/api/recommendations/active", get(active_recommendations))
        .route("/api/recommendations/refresh", post(refresh_recommendations))
        .route("/api/recommendations/{rec_id}/dismiss", post(dismiss_recommendation))
        .route("/api/recommendations/{rec_id}/snooze", post(snooze_recommendation))
        .route("/api/profile", get(get_profile).put(update_profile))
        .route("/api/catalog/brands", get(list_brands))
        .route("/api/catalog/models", get(list_models))
        .route("/api/images/upload", post(images::upload_image))
        .route("/api/images/{filename}", get(images::get_image))
}
