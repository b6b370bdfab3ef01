//! Design model

use serde::{Deserialize, Serialize};

/// A catalogue design owned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignItem {
    /// Document ID
    #[serde(default)]
    pub id: String,
    /// Owner
    pub user_id: String,
    /// Image URL
    #[serde(default, alias = "imageUrl")]
    pub image: Option<String>,
    /// Generation prompt
    #[serde(default)]
    pub prompt: Option<String>,
    /// Style cluster label, absent until the first clustering run
    #[serde(default)]
    pub style_id: Option<i64>,
    /// Creation time (Unix millis)
    #[serde(default)]
    pub created_at: i64,
}

impl DesignItem {
    pub fn new(id: String, user_id: String, image: Option<String>, prompt: Option<String>) -> Self {
        Self {
            id,
            user_id,
            image,
            prompt,
            style_id: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Image and prompt, when both are present and non-empty
    pub fn clustering_inputs(&self) -> Option<(&str, &str)> {
        let image = self.image.as_deref().filter(|s| !s.trim().is_empty())?;
        let prompt = self.prompt.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((image, prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clustering_inputs_require_image_and_prompt() {
        let mut design = DesignItem::new(
            "d1".into(),
            "u1".into(),
            Some("https://img/1.png".into()),
            Some("linen kurta".into()),
        );
        assert_eq!(
            design.clustering_inputs(),
            Some(("https://img/1.png", "linen kurta"))
        );

        design.prompt = Some("   ".into());
        assert!(design.clustering_inputs().is_none());

        design.prompt = Some("linen kurta".into());
        design.image = None;
        assert!(design.clustering_inputs().is_none());
    }

    #[test]
    fn test_deserialize_accepts_image_url_alias() {
        let design: DesignItem = serde_json::from_str(
            r#"{"id":"a","userId":"u","imageUrl":"https://x/y.png","prompt":"p","styleId":3}"#,
        )
        .unwrap();
        assert_eq!(design.image.as_deref(), Some("https://x/y.png"));
        assert_eq!(design.style_id, Some(3));
    }
}
