use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationAction {
    Sell,
    DontSell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    /// Ordinal used for sorting: high > medium > low.
    pub fn rank(&self) -> u8 {
        match self {
            Urgency::High => 3,
            Urgency::Medium => 2,
            Urgency::Low => 1,
        }
    }
}

/// Standalone advisory record tied to a device. Never hard-deleted:
/// dismiss and snooze only stamp timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub device_id: String,
    /// Display snapshot of the device name, kept for free-text search.
    pub device_name: String,
    pub user_id: String,
    pub action: RecommendationAction,
    pub reason: String,
    pub confidence: u8, // 0-100
    pub urgency: Urgency,
    #[serde(default)]
    pub potential_impact: Option<f64>,
    #[serde(default)]
    pub valid_until_ts: Option<i64>,
    #[serde(default)]
    pub market_insights: Vec<String>,
    pub created_ts: i64,
    #[serde(default)]
    pub dismissed_ts: Option<i64>,
    #[serde(default)]
    pub snoozed_until_ts: Option<i64>,
}

impl Recommendation {
    /// A record is active unless dismissed or snoozed into the future.
    /// A past snooze expires on its own, no un-snooze required.
    pub fn is_active(&self, now_ts: i64) -> bool {
        if self.dismissed_ts.is_some() {
            return false;
        }
        match self.snoozed_until_ts {
            Some(until) => until <= now_ts,
            None => true,
        }
    }

    pub fn impact_or_zero(&self) -> f64 {
        self.potential_impact.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(dismissed_ts: Option<i64>, snoozed_until_ts: Option<i64>) -> Recommendation {
        Recommendation {
            id: "r1".into(),
            device_id: "d1".into(),
            device_name: "Apple iPhone 13".into(),
            user_id: "u1".into(),
            action: RecommendationAction::DontSell,
            reason: "hold".into(),
            confidence: 75,
            urgency: Urgency::Low,
            potential_impact: None,
            valid_until_ts: None,
            market_insights: Vec::new(),
            created_ts: 1_000,
            dismissed_ts,
            snoozed_until_ts,
        }
    }

    #[test]
    fn dismissed_record_is_inactive() {
        assert!(!rec(Some(2_000), None).is_active(3_000));
    }

    #[test]
    fn future_snooze_hides_until_it_passes() {
        let r = rec(None, Some(5_000));
        assert!(!r.is_active(4_999));
        assert!(r.is_active(5_000));
        assert!(r.is_active(6_000));
    }

    #[test]
    fn urgency_rank_orders_high_over_low() {
        assert!(Urgency::High.rank() > Urgency::Medium.rank());
        assert!(Urgency::Medium.rank() > Urgency::Low.rank());
    }
}
