use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod catalog;
mod db;
mod model;
mod state;
mod storage;
mod store;
mod valuation;

use auth::keys::GoogleJwkCache;
use auth::session::SessionHolder;
use db::DBLayer;
use state::AppState;
use storage::ImageStore;
use store::{DeviceStore, RecommendationStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // -----------------------------
    // Logging
    // -----------------------------
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devicefolio=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // -----------------------------
    // Configuration
    // -----------------------------
    let db_path = std::env::var("DB_PATH").unwrap_or_else(|_| "portfoliodb".into());
    let image_dir = std::env::var("IMAGE_DIR").unwrap_or_else(|_| "images".into());
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let google_client_id = std::env::var("GOOGLE_CLIENT_ID").unwrap_or_default();
    let jwt_secret = match std::env::var("JWT_SECRET") {
        Ok(secret) => secret,
        Err(_) => {
            warn!("JWT_SECRET not set, using an insecure development secret");
            "devsecret123".into()
        }
    };

    // -----------------------------
    // Shared state / Dependencies
    // -----------------------------
    let db = Arc::new(DBLayer::new(&db_path)?);
    let devices = Arc::new(DeviceStore::new(db.clone()));
    let recommendations = Arc::new(RecommendationStore::new(db.clone()));

    let state = AppState {
        db,
        devices,
        recommendations,
        session: Arc::new(SessionHolder::new()),
        images: ImageStore::new(&image_dir).await?,
        google_keys: Arc::new(GoogleJwkCache::new()),
        jwt_secret,
        google_client_id,
    };

    // -----------------------------
    // Routers
    // -----------------------------
    let app = Router::new()
        .merge(auth::router())
        .merge(api::api_router())
        // CORS for the web client
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state);

    info!("HTTP listening on http://{addr}");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
