//! Recommendation model

use serde::{Deserialize, Serialize};

use super::{DesignItem, TrendItem};

/// Prefix for trend ids mixed into personalized results
pub const TREND_ID_PREFIX: &str = "trend_";

/// One recommended item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub image: Option<String>,
    pub prompt: Option<String>,
}

impl Recommendation {
    pub fn from_design(design: &DesignItem) -> Self {
        Self {
            id: design.id.clone(),
            image: design.image.clone(),
            prompt: design.prompt.clone(),
        }
    }

    pub fn from_trend(trend: &TrendItem) -> Self {
        Self {
            id: trend.id.clone(),
            image: Some(trend.image_url.clone()),
            prompt: Some(trend.description.clone()),
        }
    }

    /// Trend entry with a prefixed id so it cannot collide with design ids
    pub fn from_trend_prefixed(trend: &TrendItem) -> Self {
        Self {
            id: format!("{}{}", TREND_ID_PREFIX, trend.id),
            ..Self::from_trend(trend)
        }
    }
}
