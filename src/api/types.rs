use serde::{Deserialize, Serialize};

use crate::model::device::{Device, DeviceCategory};
use crate::model::recommendation::Recommendation;
use crate::model::user::Preferences;

#[derive(Serialize)]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
}

#[derive(Serialize)]
pub struct SelectionResponse {
    pub selected: Vec<String>,
}

#[derive(Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<Recommendation>,
}

#[derive(Serialize)]
pub struct ActiveRecommendationsResponse {
    pub count: usize,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Deserialize)]
pub struct SnoozeRequest {
    pub until_ts: i64,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub count: usize,
}

#[derive(Serialize)]
pub struct BrandsResponse {
    pub brands: Vec<&'static str>,
}

#[derive(Deserialize)]
pub struct ModelsQuery {
    pub category: DeviceCategory,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Serialize)]
pub struct ModelsResponse {
    pub models: Vec<&'static str>,
}

/// Profile as shown to the client. The counters are derived from the device
/// collection at read time, never stored.
#[derive(Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub join_ts: i64,
    pub total_devices: usize,
    pub portfolio_value: f64,
    pub total_savings: f64,
    pub preferences: Preferences,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub preferences: Option<Preferences>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileResponse>,
}
