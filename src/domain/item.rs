use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    /// Description or content exactly as the feed supplied it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl FeedItem {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            published: None,
            summary: None,
            author: None,
            categories: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_has_empty_categories() {
        let item = FeedItem::new("Title", "https://example.com/a");
        assert!(item.categories.is_empty());
    }

    #[test]
    fn test_categories_always_serialized() {
        let item = FeedItem::new("Title", "https://example.com/a");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["categories"], serde_json::json!([]));
        assert!(json.get("published").is_none());
    }

    #[test]
    fn test_missing_categories_deserialize_as_empty() {
        let item: FeedItem =
            serde_json::from_str(r#"{"title":"T","url":"https://example.com/a"}"#).unwrap();
        assert_eq!(item.categories, Vec::<String>::new());
    }

    #[test]
    fn test_published_serializes_as_iso8601() {
        let mut item = FeedItem::new("Title", "https://example.com/a");
        item.published = Some("2024-01-01T00:00:00Z".parse().unwrap());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["published"], "2024-01-01T00:00:00Z");
    }
}
