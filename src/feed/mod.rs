pub mod fetcher;
pub mod ids;
pub mod parser;

use serde::{Deserialize, Serialize};

pub use fetcher::{FeedSource, ProxiedFeedFetcher};
pub use parser::MarkupParser;

/// A subscribed source. `id` is unique within the store and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub id: String,
    pub title: String,
    pub url: String,
}

impl Feed {
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
        }
    }
}

/// A normalized item extracted from feed markup.
///
/// Serialized with camelCase keys (`feedId`, `pubDate`) since that is the
/// persisted shape of the favorites collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub feed_id: String,
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Article {
    /// Returns the article stamped with the owning feed's id.
    pub fn with_feed_id(mut self, feed_id: &str) -> Self {
        self.feed_id = feed_id.to_string();
        self
    }

    /// Case-insensitive substring match against title or description.
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }

    /// Body text for display: content when present, description otherwise.
    pub fn body(&self) -> &str {
        self.content.as_deref().unwrap_or(&self.description)
    }
}
