use serde::{Deserialize, Serialize};

pub mod device;
pub mod recommendation;

pub use device::DeviceStore;
pub use recommendation::RecommendationStore;

/// Soft result for store mutations. Unknown ids and similar conditions are
/// reported here, not as errors; `Err` is reserved for storage faults.
#[derive(Debug, Clone, Serialize)]
pub struct StoreOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StoreOutcome {
    pub fn ok() -> Self {
        StoreOutcome {
            success: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        StoreOutcome {
            success: false,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}
