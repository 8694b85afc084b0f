use serde::{Deserialize, Serialize};

use crate::model::recommendation::{RecommendationAction, Urgency};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCategory {
    Phone,
    Laptop,
    Tablet,
    Camera,
    Tv,
    Headphones,
    Smartwatch,
    Gaming,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCondition {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub ts: i64,
    pub value: f64,
    pub source: String,
}

/// Advisory copy embedded in the device record for display. The standalone
/// `Recommendation` record is what dismiss/snooze operate on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceAdvice {
    pub action: RecommendationAction,
    pub reason: String,
    pub confidence: u8,
    pub urgency: Urgency,
    #[serde(default)]
    pub market_insights: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub category: DeviceCategory,
    pub purchase_ts: i64,
    pub purchase_price: f64,
    /// Derived via the valuation model unless manually overridden.
    pub current_value: f64,
    pub condition: DeviceCondition,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub price_history: Vec<PricePoint>,
    pub advice: DeviceAdvice,
    pub created_ts: i64,
    pub updated_ts: i64,
}

impl Device {
    /// Positive appreciation only; losses count as zero savings.
    pub fn savings(&self) -> f64 {
        (self.current_value - self.purchase_price).max(0.0)
    }

    /// Case-insensitive substring match over name, brand and model.
    /// `needle` must already be lowercased.
    pub fn matches_search(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.brand.to_lowercase().contains(needle)
            || self.model.to_lowercase().contains(needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> Device {
        Device {
            id: "d1".into(),
            user_id: "u1".into(),
            name: "Apple iPhone 13".into(),
            brand: "Apple".into(),
            model: "iPhone 13".into(),
            category: DeviceCategory::Phone,
            purchase_ts: 0,
            purchase_price: 800.0,
            current_value: 600.0,
            condition: DeviceCondition::Good,
            notes: None,
            image_url: None,
            price_history: Vec::new(),
            advice: DeviceAdvice {
                action: RecommendationAction::DontSell,
                reason: "hold".into(),
                confidence: 75,
                urgency: Urgency::Low,
                market_insights: Vec::new(),
            },
            created_ts: 0,
            updated_ts: 0,
        }
    }

    #[test]
    fn savings_floor_at_zero_for_depreciated_devices() {
        assert_eq!(device().savings(), 0.0);

        let mut appreciated = device();
        appreciated.current_value = 900.0;
        assert_eq!(appreciated.savings(), 100.0);
    }

    #[test]
    fn search_matches_any_of_name_brand_model() {
        let d = device();
        assert!(d.matches_search("iphone"));
        assert!(d.matches_search("apple"));
        assert!(!d.matches_search("galaxy"));
    }

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&DeviceCategory::Smartwatch).unwrap();
        assert_eq!(json, "\"smartwatch\"");
    }
}
