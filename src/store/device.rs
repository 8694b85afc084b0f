use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::DBLayer;
use crate::model::device::{Device, DeviceAdvice, DeviceCategory, DeviceCondition};
use crate::model::recommendation::{Recommendation, RecommendationAction, Urgency};
use crate::store::{SortOrder, StoreOutcome};
use crate::valuation;

/// Demo placeholder, not computed from history.
const MONTHLY_CHANGE_PCT: f64 = 2.0;

const HISTORY_DAYS: usize = 30;
const HISTORY_VOLATILITY_PCT: f64 = 2.0;

#[derive(Debug, Deserialize)]
pub struct NewDevice {
    pub category: DeviceCategory,
    pub brand: String,
    pub model: String,
    pub purchase_ts: i64,
    pub purchase_price: f64,
    pub condition: DeviceCondition,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeviceUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub category: Option<DeviceCategory>,
    #[serde(default)]
    pub condition: Option<DeviceCondition>,
    #[serde(default)]
    pub purchase_ts: Option<i64>,
    #[serde(default)]
    pub purchase_price: Option<f64>,
    /// Manual override; the computed default is discarded once set.
    #[serde(default)]
    pub current_value: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceSortKey {
    Name,
    Value,
    PurchaseDate,
    Recommendation,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceFilters {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<DeviceCategory>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub condition: Option<DeviceCondition>,
    #[serde(default)]
    pub recommendation: Option<RecommendationAction>,
    #[serde(default)]
    pub sort_by: Option<DeviceSortKey>,
    #[serde(default)]
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioStats {
    pub total_value: f64,
    pub total_devices: usize,
    pub total_savings: f64,
    pub monthly_change: f64,
    pub monthly_change_percent: f64,
}

/// Per-user device collection plus the multi-select working set. All
/// mutation funnels through here; single-writer, last write wins.
pub struct DeviceStore {
    db: Arc<DBLayer>,
    selection: RwLock<HashMap<String, Vec<String>>>,
}

impl DeviceStore {
    pub fn new(db: Arc<DBLayer>) -> Self {
        DeviceStore {
            db,
            selection: RwLock::new(HashMap::new()),
        }
    }

    /// Create a device from validated form input: synthesize the demo price
    /// series, derive the initial value, attach the default hold advice and
    /// its companion recommendation record.
    ///
    /// The caller has already rejected non-positive prices and anonymous
    /// requests at the API boundary.
    pub async fn add(&self, user_id: &str, input: NewDevice) -> Result<Device> {
        let now = chrono::Utc::now().timestamp();

        let brand = input.brand.trim().to_string();
        let model = input.model.trim().to_string();

        let device = Device {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: format!("{brand} {model}"),
            brand,
            model,
            category: input.category,
            purchase_ts: input.purchase_ts,
            purchase_price: input.purchase_price,
            current_value: valuation::estimate_current_value(
                input.purchase_price,
                input.purchase_ts,
                now,
            ),
            condition: input.condition,
            notes: input.notes,
            image_url: input.image_url,
            price_history: valuation::synthesize_price_history(
                HISTORY_DAYS,
                input.purchase_price,
                HISTORY_VOLATILITY_PCT,
                now,
            ),
            advice: default_advice(),
            created_ts: now,
            updated_ts: now,
        };

        self.db.append_device(&device).await?;
        self.db
            .append_recommendation(&companion_recommendation(&device, now))
            .await?;

        Ok(device)
    }

    pub async fn get(&self, user_id: &str, device_id: &str) -> Result<Option<Device>> {
        self.db.load_device(user_id, device_id).await
    }

    /// Merge present fields into the record and refresh its update stamp.
    pub async fn update(
        &self,
        user_id: &str,
        device_id: &str,
        patch: DeviceUpdate,
    ) -> Result<StoreOutcome> {
        let Some(mut device) = self.db.load_device(user_id, device_id).await? else {
            return Ok(StoreOutcome::failed("device not found"));
        };

        if let Some(name) = patch.name {
            device.name = name;
        }
        if let Some(brand) = patch.brand {
            device.brand = brand;
        }
        if let Some(model) = patch.model {
            device.model = model;
        }
        if let Some(category) = patch.category {
            device.category = category;
        }
        if let Some(condition) = patch.condition {
            device.condition = condition;
        }
        if let Some(purchase_ts) = patch.purchase_ts {
            device.purchase_ts = purchase_ts;
        }
        if let Some(purchase_price) = patch.purchase_price {
            device.purchase_price = purchase_price;
        }
        if let Some(current_value) = patch.current_value {
            device.current_value = current_value;
        }
        if let Some(notes) = patch.notes {
            device.notes = Some(notes);
        }
        if let Some(image_url) = patch.image_url {
            device.image_url = Some(image_url);
        }
        device.updated_ts = chrono::Utc::now().timestamp();

        self.db.save_device(&device).await?;
        Ok(StoreOutcome::ok())
    }

    /// Idempotent delete; also drops the id from the selection so no
    /// dangling selection entry survives.
    pub async fn remove(&self, user_id: &str, device_id: &str) -> Result<StoreOutcome> {
        self.db.delete_device(user_id, device_id).await?;

        let mut selection = self.selection.write().await;
        if let Some(selected) = selection.get_mut(user_id) {
            selected.retain(|id| id != device_id);
        }

        Ok(StoreOutcome::ok())
    }

    pub async fn list(&self, user_id: &str, filters: &DeviceFilters) -> Result<Vec<Device>> {
        Ok(filter_devices(self.db.list_devices(user_id).await?, filters))
    }

    pub async fn portfolio_stats(&self, user_id: &str) -> Result<PortfolioStats> {
        let devices = self.db.list_devices(user_id).await?;

        let total_value: f64 = devices.iter().map(|d| d.current_value).sum();
        let total_savings: f64 = devices.iter().map(|d| d.savings()).sum();

        Ok(PortfolioStats {
            total_value,
            total_devices: devices.len(),
            total_savings,
            monthly_change: total_value * MONTHLY_CHANGE_PCT / 100.0,
            monthly_change_percent: MONTHLY_CHANGE_PCT,
        })
    }

    // ============================================================
    // SELECTION (in-memory working set)
    // ============================================================
    pub async fn toggle_selection(&self, user_id: &str, device_id: &str) -> Vec<String> {
        let mut selection = self.selection.write().await;
        let selected = selection.entry(user_id.to_string()).or_default();

        if let Some(pos) = selected.iter().position(|id| id == device_id) {
            selected.remove(pos);
        } else {
            selected.push(device_id.to_string());
        }

        selected.clone()
    }

    /// Select everything the current filtered view shows.
    pub async fn select_all(&self, user_id: &str, filters: &DeviceFilters) -> Result<Vec<String>> {
        let ids: Vec<String> = self
            .list(user_id, filters)
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect();

        self.selection
            .write()
            .await
            .insert(user_id.to_string(), ids.clone());
        Ok(ids)
    }

    pub async fn clear_selection(&self, user_id: &str) {
        self.selection.write().await.remove(user_id);
    }

    pub async fn selection(&self, user_id: &str) -> Vec<String> {
        self.selection
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// Default advisory attached to every new device.
fn default_advice() -> DeviceAdvice {
    DeviceAdvice {
        action: RecommendationAction::DontSell,
        reason: "Device is performing well. Consider holding for now.".to_string(),
        confidence: 75,
        urgency: Urgency::Low,
        market_insights: vec![
            "Market is stable".to_string(),
            "No major updates expected".to_string(),
        ],
    }
}

fn companion_recommendation(device: &Device, now_ts: i64) -> Recommendation {
    Recommendation {
        id: Uuid::new_v4().to_string(),
        device_id: device.id.clone(),
        device_name: device.name.clone(),
        user_id: device.user_id.clone(),
        action: device.advice.action,
        reason: device.advice.reason.clone(),
        confidence: device.advice.confidence,
        urgency: device.advice.urgency,
        potential_impact: None,
        valid_until_ts: None,
        market_insights: device.advice.market_insights.clone(),
        created_ts: now_ts,
        dismissed_ts: None,
        snoozed_until_ts: None,
    }
}

/// Search, then exact filters, then a stable sort. The input arrives in
/// insertion order, so equal keys keep it.
pub fn filter_devices(mut devices: Vec<Device>, filters: &DeviceFilters) -> Vec<Device> {
    if let Some(search) = &filters.search {
        let needle = search.to_lowercase();
        devices.retain(|d| d.matches_search(&needle));
    }

    if let Some(category) = filters.category {
        devices.retain(|d| d.category == category);
    }
    if let Some(brand) = &filters.brand {
        devices.retain(|d| &d.brand == brand);
    }
    if let Some(condition) = filters.condition {
        devices.retain(|d| d.condition == condition);
    }
    if let Some(action) = filters.recommendation {
        devices.retain(|d| d.advice.action == action);
    }

    if let Some(sort_by) = filters.sort_by {
        let descending = filters.sort_order == Some(SortOrder::Desc);
        devices.sort_by(|a, b| {
            let ordering = match sort_by {
                DeviceSortKey::Name => a.name.cmp(&b.name),
                DeviceSortKey::Value => a
                    .current_value
                    .partial_cmp(&b.current_value)
                    .unwrap_or(Ordering::Equal),
                DeviceSortKey::PurchaseDate => a.purchase_ts.cmp(&b.purchase_ts),
                DeviceSortKey::Recommendation => {
                    a.advice.urgency.rank().cmp(&b.advice.urgency.rank())
                }
            };
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::VALUE_FLOOR_FRACTION;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> DeviceStore {
        let db = Arc::new(DBLayer::new(dir.path().to_str().unwrap()).unwrap());
        DeviceStore::new(db)
    }

    fn new_device(brand: &str, model: &str, price: f64, purchase_ts: i64) -> NewDevice {
        NewDevice {
            category: DeviceCategory::Phone,
            brand: brand.to_string(),
            model: model.to_string(),
            purchase_ts,
            purchase_price: price,
            condition: DeviceCondition::Good,
            notes: None,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn add_derives_value_history_and_advice() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let now = chrono::Utc::now().timestamp();

        let device = store
            .add("u1", new_device("Apple", "iPhone 13", 800.0, now - 90 * 86_400))
            .await
            .unwrap();

        assert_eq!(device.name, "Apple iPhone 13");
        assert!(device.current_value >= 800.0 * VALUE_FLOOR_FRACTION);
        assert!(device.current_value <= 800.0);
        assert_eq!(device.price_history.len(), 30);
        assert_eq!(device.advice.action, RecommendationAction::DontSell);
        assert_eq!(device.advice.urgency, Urgency::Low);
    }

    #[tokio::test]
    async fn add_creates_companion_recommendation() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let now = chrono::Utc::now().timestamp();

        let device = store
            .add("u1", new_device("Sony", "WH-1000XM5", 350.0, now))
            .await
            .unwrap();

        let recs = store.db.list_recommendations("u1").await.unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].device_id, device.id);
        assert_eq!(recs[0].device_name, "Sony WH-1000XM5");
        assert!(recs[0].is_active(now));
    }

    #[tokio::test]
    async fn update_merges_and_reports_missing_ids() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let now = chrono::Utc::now().timestamp();

        let device = store
            .add("u1", new_device("Dell", "XPS 15", 1500.0, now))
            .await
            .unwrap();

        let outcome = store
            .update(
                "u1",
                &device.id,
                DeviceUpdate {
                    condition: Some(DeviceCondition::Fair),
                    current_value: Some(900.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(outcome.success);

        let updated = store.get("u1", &device.id).await.unwrap().unwrap();
        assert_eq!(updated.condition, DeviceCondition::Fair);
        assert_eq!(updated.current_value, 900.0);
        assert_eq!(updated.brand, "Dell");

        let missing = store
            .update("u1", "nope", DeviceUpdate::default())
            .await
            .unwrap();
        assert!(!missing.success);
        assert_eq!(missing.message.as_deref(), Some("device not found"));
    }

    #[tokio::test]
    async fn remove_drops_device_from_selection() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let now = chrono::Utc::now().timestamp();

        let device = store
            .add("u1", new_device("Canon", "EOS R6", 2100.0, now))
            .await
            .unwrap();

        store.toggle_selection("u1", &device.id).await;
        assert_eq!(store.selection("u1").await, vec![device.id.clone()]);

        let outcome = store.remove("u1", &device.id).await.unwrap();
        assert!(outcome.success);
        assert!(store.selection("u1").await.is_empty());
        assert!(store.get("u1", &device.id).await.unwrap().is_none());

        // deleting again is still a success
        assert!(store.remove("u1", &device.id).await.unwrap().success);
    }

    #[tokio::test]
    async fn clearing_filters_restores_insertion_order() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let now = chrono::Utc::now().timestamp();

        for (brand, model) in [("Sony", "A7 IV"), ("Apple", "iPad Air"), ("Dell", "XPS 13")] {
            store
                .add("u1", new_device(brand, model, 1000.0, now))
                .await
                .unwrap();
        }

        let sorted = store
            .list(
                "u1",
                &DeviceFilters {
                    sort_by: Some(DeviceSortKey::Name),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(sorted[0].brand, "Apple");

        let unfiltered = store.list("u1", &DeviceFilters::default()).await.unwrap();
        let brands: Vec<_> = unfiltered.iter().map(|d| d.brand.as_str()).collect();
        assert_eq!(brands, vec!["Sony", "Apple", "Dell"]);
    }

    #[tokio::test]
    async fn stats_sum_values_and_never_report_negative_savings() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let now = chrono::Utc::now().timestamp();

        // Old enough that every device has depreciated.
        let old = now - 3 * 365 * 86_400;
        store.add("u1", new_device("LG", "OLED C3", 1800.0, old)).await.unwrap();
        store.add("u1", new_device("HP", "Spectre x360", 1300.0, old)).await.unwrap();

        let devices = store.list("u1", &DeviceFilters::default()).await.unwrap();
        let expected_total: f64 = devices.iter().map(|d| d.current_value).sum();

        let stats = store.portfolio_stats("u1").await.unwrap();
        assert_eq!(stats.total_devices, 2);
        assert_eq!(stats.total_value, expected_total);
        assert_eq!(stats.total_savings, 0.0);
        assert_eq!(stats.monthly_change_percent, MONTHLY_CHANGE_PCT);
    }

    #[test]
    fn filter_search_and_exact_filters_compose() {
        let now = 1_700_000_000;
        let mk = |brand: &str, model: &str, condition: DeviceCondition, value: f64| Device {
            id: model.to_string(),
            user_id: "u1".into(),
            name: format!("{brand} {model}"),
            brand: brand.to_string(),
            model: model.to_string(),
            category: DeviceCategory::Phone,
            purchase_ts: now,
            purchase_price: 1000.0,
            current_value: value,
            condition,
            notes: None,
            image_url: None,
            price_history: Vec::new(),
            advice: default_advice(),
            created_ts: now,
            updated_ts: now,
        };

        let devices = vec![
            mk("Apple", "iPhone 14", DeviceCondition::Good, 650.0),
            mk("Apple", "iPhone 13", DeviceCondition::Fair, 500.0),
            mk("Samsung", "Galaxy S24", DeviceCondition::Good, 700.0),
        ];

        let hits = filter_devices(
            devices.clone(),
            &DeviceFilters {
                search: Some("iphone".into()),
                condition: Some(DeviceCondition::Good),
                ..Default::default()
            },
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].model, "iPhone 14");

        let by_value_desc = filter_devices(
            devices,
            &DeviceFilters {
                sort_by: Some(DeviceSortKey::Value),
                sort_order: Some(SortOrder::Desc),
                ..Default::default()
            },
        );
        let values: Vec<_> = by_value_desc.iter().map(|d| d.current_value).collect();
        assert_eq!(values, vec![700.0, 650.0, 500.0]);
    }
}
