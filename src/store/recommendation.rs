use std::cmp::Ordering;
use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::DBLayer;
use crate::model::device::Device;
use crate::model::recommendation::{Recommendation, RecommendationAction, Urgency};
use crate::store::{SortOrder, StoreOutcome};

// Depreciation-ratio cut-offs for the canned refresh templates. Placeholder
// logic standing in for a real pricing model.
const SELL_RATIO: f64 = 0.4;
const URGENT_SELL_RATIO: f64 = 0.25;
const SELL_WINDOW_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSortKey {
    Urgency,
    Confidence,
    CreatedAt,
    PotentialImpact,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationFilters {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub urgency: Option<Urgency>,
    #[serde(default)]
    pub action: Option<RecommendationAction>,
    #[serde(default)]
    pub sort_by: Option<RecommendationSortKey>,
    #[serde(default)]
    pub sort_order: Option<SortOrder>,
}

/// Advisory records per user. Dismiss and snooze stamp timestamps; nothing
/// here is ever hard-deleted.
pub struct RecommendationStore {
    db: Arc<DBLayer>,
}

impl RecommendationStore {
    pub fn new(db: Arc<DBLayer>) -> Self {
        RecommendationStore { db }
    }

    pub async fn get(&self, user_id: &str, rec_id: &str) -> Result<Option<Recommendation>> {
        self.db.load_recommendation(user_id, rec_id).await
    }

    pub async fn dismiss(&self, user_id: &str, rec_id: &str) -> Result<StoreOutcome> {
        let Some(mut rec) = self.db.load_recommendation(user_id, rec_id).await? else {
            return Ok(StoreOutcome::failed("recommendation not found"));
        };

        if rec.dismissed_ts.is_none() {
            rec.dismissed_ts = Some(chrono::Utc::now().timestamp());
            self.db.save_recommendation(&rec).await?;
        }

        Ok(StoreOutcome::ok())
    }

    pub async fn snooze(&self, user_id: &str, rec_id: &str, until_ts: i64) -> Result<StoreOutcome> {
        let Some(mut rec) = self.db.load_recommendation(user_id, rec_id).await? else {
            return Ok(StoreOutcome::failed("recommendation not found"));
        };

        rec.snoozed_until_ts = Some(until_ts);
        self.db.save_recommendation(&rec).await?;

        Ok(StoreOutcome::ok())
    }

    /// Exclusion first (dismissed, still-snoozed), then filters, then sort.
    pub async fn list(
        &self,
        user_id: &str,
        filters: &RecommendationFilters,
    ) -> Result<Vec<Recommendation>> {
        let now = chrono::Utc::now().timestamp();
        Ok(filter_recommendations(
            self.db.list_recommendations(user_id).await?,
            filters,
            now,
        ))
    }

    /// Active records only, insertion order. Used for counts and badges.
    pub async fn active(&self, user_id: &str) -> Result<Vec<Recommendation>> {
        let now = chrono::Utc::now().timestamp();
        let mut recs = self.db.list_recommendations(user_id).await?;
        recs.retain(|r| r.is_active(now));
        Ok(recs)
    }

    /// Regenerate advisories for all of the user's devices. Previous active
    /// records are superseded (dismissed, not deleted) so the history stays
    /// intact.
    pub async fn refresh_for_user(
        &self,
        user_id: &str,
        devices: &[Device],
    ) -> Result<Vec<Recommendation>> {
        let now = chrono::Utc::now().timestamp();

        for mut rec in self.active(user_id).await? {
            rec.dismissed_ts = Some(now);
            self.db.save_recommendation(&rec).await?;
        }

        let mut fresh = Vec::with_capacity(devices.len());
        for device in devices {
            let rec = advise(device, now);
            self.db.append_recommendation(&rec).await?;
            fresh.push(rec);
        }

        Ok(fresh)
    }
}

/// Canned advisory for a device, keyed off how far it has depreciated.
fn advise(device: &Device, now_ts: i64) -> Recommendation {
    let ratio = if device.purchase_price > 0.0 {
        device.current_value / device.purchase_price
    } else {
        1.0
    };

    let (action, urgency, confidence, reason, insights) = if ratio <= SELL_RATIO {
        let urgency = if ratio <= URGENT_SELL_RATIO {
            Urgency::High
        } else {
            Urgency::Medium
        };
        (
            RecommendationAction::Sell,
            urgency,
            if urgency == Urgency::High { 85 } else { 70 },
            format!(
                "{} has lost most of its resale value. Selling now beats holding further.",
                device.name
            ),
            vec![
                "Resale prices for this model are trending down".to_string(),
                "Newer generations are compressing used prices".to_string(),
            ],
        )
    } else {
        (
            RecommendationAction::DontSell,
            Urgency::Low,
            75,
            format!("{} is holding its value well. No reason to sell yet.", device.name),
            vec!["Market is stable".to_string()],
        )
    };

    let potential_impact = match action {
        RecommendationAction::Sell => Some(device.current_value),
        RecommendationAction::DontSell => None,
    };
    let valid_until_ts = match action {
        RecommendationAction::Sell => Some(now_ts + SELL_WINDOW_SECS),
        RecommendationAction::DontSell => None,
    };

    Recommendation {
        id: Uuid::new_v4().to_string(),
        device_id: device.id.clone(),
        device_name: device.name.clone(),
        user_id: device.user_id.clone(),
        action,
        reason,
        confidence,
        urgency,
        potential_impact,
        valid_until_ts,
        market_insights: insights,
        created_ts: now_ts,
        dismissed_ts: None,
        snoozed_until_ts: None,
    }
}

pub fn filter_recommendations(
    mut recs: Vec<Recommendation>,
    filters: &RecommendationFilters,
    now_ts: i64,
) -> Vec<Recommendation> {
    recs.retain(|r| r.is_active(now_ts));

    if let Some(search) = &filters.search {
        let needle = search.to_lowercase();
        recs.retain(|r| {
            r.device_name.to_lowercase().contains(&needle)
                || r.reason.to_lowercase().contains(&needle)
                || action_str(r.action).contains(&needle)
        });
    }

    if let Some(urgency) = filters.urgency {
        recs.retain(|r| r.urgency == urgency);
    }
    if let Some(action) = filters.action {
        recs.retain(|r| r.action == action);
    }

    if let Some(sort_by) = filters.sort_by {
        let descending = filters.sort_order == Some(SortOrder::Desc);
        recs.sort_by(|a, b| {
            let ordering = match sort_by {
                RecommendationSortKey::Urgency => a.urgency.rank().cmp(&b.urgency.rank()),
                RecommendationSortKey::Confidence => a.confidence.cmp(&b.confidence),
                RecommendationSortKey::CreatedAt => a.created_ts.cmp(&b.created_ts),
                RecommendationSortKey::PotentialImpact => a
                    .impact_or_zero()
                    .partial_cmp(&b.impact_or_zero())
                    .unwrap_or(Ordering::Equal),
            };
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    recs
}

fn action_str(action: RecommendationAction) -> &'static str {
    match action {
        RecommendationAction::Sell => "sell",
        RecommendationAction::DontSell => "dont_sell",
    }
}
