//! Campus news feed: snapshot decoding, filtering and display helpers.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::storage::DocumentStore;

pub const NEWS_COLLECTION: &str = "news";
pub const DEFAULT_DESCRIPTION_LEN: usize = 200;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NewsType {
    Course,
    Event,
    News,
    Clubs,
}

impl NewsType {
    pub const ALL: [NewsType; 4] = [Self::Course, Self::Event, Self::News, Self::Clubs];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Course => "Course",
            Self::Event => "Event",
            Self::News => "News",
            Self::Clubs => "Clubs",
        }
    }
}

impl fmt::Display for NewsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewsFilter {
    #[default]
    All,
    Only(NewsType),
}

impl NewsFilter {
    /// Case-insensitive: `all`, `course`, `event`, `news`, `clubs`.
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("all") {
            return Some(Self::All);
        }
        NewsType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
            .map(Self::Only)
    }

    pub fn matches(&self, kind: NewsType) -> bool {
        match self {
            Self::All => true,
            Self::Only(t) => *t == kind,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(rename = "type")]
    pub kind: NewsType,
    pub created_at: DateTime<Utc>,
}

impl NewsItem {
    /// Decode a keyed snapshot (`{ "<id>": { ...item } }`) into items, newest first.
    ///
    /// `null` yields an empty feed. Entries that do not decode are skipped.
    pub fn from_snapshot(snapshot: Value) -> Vec<NewsItem> {
        let entries = match snapshot {
            Value::Object(entries) => entries,
            Value::Null => return Vec::new(),
            _ => {
                tracing::warn!("News snapshot is not an object, ignoring");
                return Vec::new();
            }
        };

        let mut items: Vec<NewsItem> = entries
            .into_iter()
            .filter_map(|(id, mut raw)| {
                if let Value::Object(ref mut fields) = raw {
                    fields.insert("id".to_string(), Value::String(id.clone()));
                }
                serde_json::from_value(raw)
                    .inspect_err(|e| {
                        tracing::warn!(id = %id, error = %e, "Skipping malformed news item")
                    })
                    .ok()
            })
            .collect();
        sort_newest_first(&mut items);
        items
    }

    pub fn matches_query(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
    }
}

fn sort_newest_first(items: &mut [NewsItem]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Items matching both the type filter and the search query, newest first.
pub fn filter_news(items: &[NewsItem], filter: NewsFilter, query: &str) -> Vec<NewsItem> {
    let mut matched: Vec<NewsItem> = items
        .iter()
        .filter(|item| filter.matches(item.kind) && item.matches_query(query))
        .cloned()
        .collect();
    sort_newest_first(&mut matched);
    matched
}

pub fn truncate_description(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let head: String = text.chars().take(max_len).collect();
    format!("{}...", head.trim())
}

/// Short age label: `Just now`, `5m ago`, `3h ago`, `2d ago`, or `Mar 4, 2024`.
pub fn relative_time(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - created_at).abs();
    let minutes = diff.num_minutes();
    let hours = diff.num_hours();
    let days = diff.num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 7 {
        format!("{}d ago", days)
    } else {
        created_at.format("%b %-d, %Y").to_string()
    }
}

/// Reads the news collection from the document store.
pub struct NewsFeed {
    documents: Arc<dyn DocumentStore>,
}

impl NewsFeed {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    pub async fn load(&self) -> Result<Vec<NewsItem>> {
        let docs = self.documents.list(NEWS_COLLECTION).await?;
        let snapshot: serde_json::Map<String, Value> = docs.into_iter().collect();
        let items = NewsItem::from_snapshot(Value::Object(snapshot));
        tracing::debug!(count = items.len(), "Loaded news feed");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryDocumentStore;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn snapshot() -> Value {
        json!({
            "n1": {
                "title": "Journée portes ouvertes",
                "description": "Venez découvrir nos filières",
                "image": "https://example.org/a.png",
                "type": "Event",
                "createdAt": "2024-03-01T10:00:00Z"
            },
            "n2": {
                "title": "Nouveau module React",
                "description": "Cours avancé pour les stagiaires DD",
                "image": "",
                "type": "Course",
                "createdAt": "2024-03-05T09:00:00Z"
            },
            "n3": {
                "title": "Club robotique",
                "description": "Inscriptions ouvertes",
                "image": "",
                "type": "Clubs",
                "createdAt": "2024-02-20T08:00:00Z"
            },
            "broken": { "title": 42 }
        })
    }

    #[test]
    fn test_snapshot_sorted_newest_first_and_skips_malformed() {
        let items = NewsItem::from_snapshot(snapshot());
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["n2", "n1", "n3"]);
    }

    #[test]
    fn test_null_snapshot_is_empty() {
        assert!(NewsItem::from_snapshot(Value::Null).is_empty());
    }

    #[test]
    fn test_filter_by_type_and_query() {
        let items = NewsItem::from_snapshot(snapshot());

        let events = filter_news(&items, NewsFilter::Only(NewsType::Event), "");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "n1");

        let react = filter_news(&items, NewsFilter::All, "REACT");
        assert_eq!(react.len(), 1);
        assert_eq!(react[0].id, "n2");

        let by_description = filter_news(&items, NewsFilter::All, "inscriptions");
        assert_eq!(by_description[0].id, "n3");

        assert!(filter_news(&items, NewsFilter::Only(NewsType::News), "").is_empty());
        assert_eq!(filter_news(&items, NewsFilter::All, "").len(), 3);
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!(NewsFilter::parse("ALL"), Some(NewsFilter::All));
        assert_eq!(
            NewsFilter::parse("clubs"),
            Some(NewsFilter::Only(NewsType::Clubs))
        );
        assert_eq!(NewsFilter::parse("sports"), None);
    }

    #[test]
    fn test_truncate_description() {
        assert_eq!(truncate_description("court", 200), "court");
        assert_eq!(truncate_description("abc def ghi", 4), "abc...");
        // multi-byte characters are counted, not bytes
        assert_eq!(truncate_description("éééé", 2), "éé...");
    }

    #[test]
    fn test_relative_time_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(relative_time(now - Duration::seconds(30), now), "Just now");
        assert_eq!(relative_time(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(relative_time(now - Duration::hours(3), now), "3h ago");
        assert_eq!(relative_time(now - Duration::days(2), now), "2d ago");
        assert_eq!(
            relative_time(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(), now),
            "Jan 5, 2024"
        );
    }

    #[tokio::test]
    async fn test_feed_loads_from_document_store() {
        let store = Arc::new(MemoryDocumentStore::new());
        if let Value::Object(entries) = snapshot() {
            for (id, doc) in entries {
                store.set(NEWS_COLLECTION, &id, doc).await.unwrap();
            }
        }

        let items = NewsFeed::new(store).load().await.unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].id, "n2");
    }
}
