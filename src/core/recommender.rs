//! Style-based recommendations
//!
//! A user's favourite styles are the most frequent style labels among their own
//! designs. Recommendations are other users' designs in those styles, topped up
//! with the latest trends.

use std::collections::HashSet;

use crate::config::AppConfig;
use crate::db::{DbEngine, DesignTable, TrendTable};
use crate::models::{DesignItem, Recommendation};

/// Favourite styles considered per user
const TOP_STYLES: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("recommendation lookup failed: {0:#}")]
    Internal(#[from] anyhow::Error),
}

pub struct Recommender {
    db: DbEngine,
    limit: usize,
    candidates_per_style: i64,
}

impl Recommender {
    pub fn new(db: DbEngine, limit: usize, candidates_per_style: usize) -> Self {
        Self {
            db,
            limit,
            candidates_per_style: candidates_per_style as i64,
        }
    }

    pub fn from_config(db: DbEngine, config: &AppConfig) -> Self {
        Self::new(db, config.recommendation_limit, config.style_candidate_limit)
    }

    pub async fn recommend(&self, user_id: &str) -> Result<Vec<Recommendation>, RecommendError> {
        let designs = DesignTable::by_user(&self.db, user_id).await?;
        let styles = top_styles(&designs, TOP_STYLES);

        if styles.is_empty() {
            tracing::debug!("User {} has no styles, falling back to trends", user_id);
            let trends = TrendTable::latest(&self.db, self.limit as i64).await?;
            return Ok(trends.iter().map(Recommendation::from_trend).collect());
        }

        tracing::debug!("Top styles for {}: {:?}", user_id, styles);

        let mut seen: HashSet<String> = designs.into_iter().map(|d| d.id).collect();
        let mut recommendations = Vec::with_capacity(self.limit);

        for (style_id, _) in styles {
            if recommendations.len() >= self.limit {
                break;
            }

            let candidates = DesignTable::by_style_excluding_user(
                &self.db,
                style_id,
                user_id,
                self.candidates_per_style,
            )
            .await?;

            for design in candidates {
                if recommendations.len() >= self.limit {
                    break;
                }
                if seen.insert(design.id.clone()) {
                    recommendations.push(Recommendation::from_design(&design));
                }
            }
        }

        let missing = self.limit - recommendations.len();
        if missing > 0 {
            tracing::debug!("Adding {} trends for {}", missing, user_id);
            let trends = TrendTable::latest(&self.db, missing as i64).await?;
            recommendations.extend(trends.iter().map(Recommendation::from_trend_prefixed));
        }

        Ok(recommendations)
    }
}

/// Most frequent style ids with their counts, ties kept in first-seen order
pub fn top_styles(designs: &[DesignItem], n: usize) -> Vec<(i64, usize)> {
    let mut counts: Vec<(i64, usize)> = Vec::new();
    for style_id in designs.iter().filter_map(|d| d.style_id) {
        match counts.iter_mut().find(|(id, _)| *id == style_id) {
            Some((_, count)) => *count += 1,
            None => counts.push((style_id, 1)),
        }
    }

    // stable sort keeps first-seen order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(n);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrendItem;
    use chrono::{Duration, TimeZone, Utc};

    fn design(id: &str, user: &str, style: Option<i64>, created_at: i64) -> DesignItem {
        DesignItem {
            id: id.into(),
            user_id: user.into(),
            image: Some(format!("https://img/{}.png", id)),
            prompt: Some(format!("prompt {}", id)),
            style_id: style,
            created_at,
        }
    }

    async fn seed_trends(db: &DbEngine) {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        for i in 0..5 {
            let trend = TrendItem {
                id: format!("t{}", i),
                image_url: format!("https://trends/{}.jpg", i),
                description: format!("trend {}", i),
                source: "instagram".into(),
                scraped_at: base + Duration::days(i),
            };
            TrendTable::upsert(db, &trend).await.unwrap();
        }
    }

    fn ids(recs: &[Recommendation]) -> Vec<&str> {
        recs.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_top_styles_break_ties_by_first_seen() {
        let designs = vec![
            design("a", "u", Some(5), 0),
            design("b", "u", Some(2), 1),
            design("c", "u", None, 2),
            design("d", "u", Some(2), 3),
            design("e", "u", Some(5), 4),
            design("f", "u", Some(7), 5),
        ];
        assert_eq!(top_styles(&designs, 2), vec![(5, 2), (2, 2)]);
        assert!(top_styles(&designs[2..3], 2).is_empty());
    }

    #[tokio::test]
    async fn test_favourite_style_designs_come_first() {
        let db = DbEngine::in_memory().await.unwrap();
        seed_trends(&db).await;

        let mut t = 0;
        for style in [2, 2, 5, 2, 5] {
            DesignTable::upsert(&db, &design(&format!("mine{}", t), "me", Some(style), t))
                .await
                .unwrap();
            t += 1;
        }
        for i in 0..4 {
            DesignTable::upsert(&db, &design(&format!("s2_{}", i), "other", Some(2), 100 + i))
                .await
                .unwrap();
        }
        DesignTable::upsert(&db, &design("s5_0", "other", Some(5), 50)).await.unwrap();

        let recommender = Recommender::new(db, 3, 5);
        let recs = recommender.recommend("me").await.unwrap();
        assert_eq!(ids(&recs), vec!["s2_0", "s2_1", "s2_2"]);
    }

    #[tokio::test]
    async fn test_second_style_then_prefixed_trends_fill_the_rest() {
        let db = DbEngine::in_memory().await.unwrap();
        seed_trends(&db).await;

        DesignTable::upsert(&db, &design("m1", "me", Some(1), 0)).await.unwrap();
        DesignTable::upsert(&db, &design("m2", "me", Some(1), 1)).await.unwrap();
        DesignTable::upsert(&db, &design("m3", "me", Some(4), 2)).await.unwrap();
        DesignTable::upsert(&db, &design("o1", "other", Some(4), 3)).await.unwrap();

        let recommender = Recommender::new(db, 3, 5);
        let recs = recommender.recommend("me").await.unwrap();

        assert_eq!(ids(&recs), vec!["o1", "trend_t4", "trend_t3"]);
        assert_eq!(recs[1].image.as_deref(), Some("https://trends/4.jpg"));
        assert_eq!(recs[1].prompt.as_deref(), Some("trend 4"));
    }

    #[tokio::test]
    async fn test_user_without_designs_gets_latest_trends() {
        let db = DbEngine::in_memory().await.unwrap();
        seed_trends(&db).await;

        let recommender = Recommender::new(db, 3, 5);
        let recs = recommender.recommend("nobody").await.unwrap();
        assert_eq!(ids(&recs), vec!["t4", "t3", "t2"]);
    }

    #[tokio::test]
    async fn test_unlabelled_designs_count_as_no_styles() {
        let db = DbEngine::in_memory().await.unwrap();
        seed_trends(&db).await;
        DesignTable::upsert(&db, &design("m1", "me", None, 0)).await.unwrap();

        let recommender = Recommender::new(db, 3, 5);
        let recs = recommender.recommend("me").await.unwrap();
        assert_eq!(ids(&recs), vec!["t4", "t3", "t2"]);
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_error() {
        let db = DbEngine::in_memory().await.unwrap();
        db.pool().close().await;

        let recommender = Recommender::new(db, 3, 5);
        assert!(matches!(
            recommender.recommend("me").await,
            Err(RecommendError::Internal(_))
        ));
    }
}
