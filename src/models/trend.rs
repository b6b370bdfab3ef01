//! Trend model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scraped trending item, used as recommendation fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendItem {
    #[serde(default)]
    pub id: String,
    pub image_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: String,
    pub scraped_at: DateTime<Utc>,
}
