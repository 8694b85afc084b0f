use std::sync::Arc;

use crate::auth::keys::GoogleJwkCache;
use crate::auth::session::SessionHolder;
use crate::db::DBLayer;
use crate::storage::ImageStore;
use crate::store::{DeviceStore, RecommendationStore};

/// Everything the handlers need, built once in `main` and threaded through
/// axum. No module-level singletons.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DBLayer>,
    pub devices: Arc<DeviceStore>,
    pub recommendations: Arc<RecommendationStore>,
    pub session: Arc<SessionHolder>,
    pub images: ImageStore,
    pub google_keys: Arc<GoogleJwkCache>,
    pub jwt_secret: String,
    pub google_client_id: String,
}
