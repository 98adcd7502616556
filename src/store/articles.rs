use tracing::{debug, error, info, warn};

use super::{FeedStore, LOAD_FEED_ERROR};
use crate::error::Error;

/// Outcome of [`FeedStore::load_feed`]. Loading never returns an error; a
/// failure is recorded in the shared error slot instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// The cache now holds this many articles of the requested feed.
    Loaded(usize),
    /// The feed was unknown, was removed before its fetch completed, or the
    /// fetch failed. Cache and active feed are unchanged.
    Failed,
    /// A newer call started while this one was in flight, so its result
    /// was dropped.
    Superseded,
}

impl FeedStore {
    /// Makes `feed_id` the active feed and replaces the cache with its
    /// first `news_limit` articles, each stamped with `feed_id`.
    ///
    /// On failure the previous cache and active feed stay in place and only
    /// the shared error message changes. The error itself is logged and
    /// swallowed.
    pub async fn load_feed(&self, feed_id: &str) -> LoadStatus {
        let (token, feed, limit) = {
            let mut state = self.state.lock();
            let token = state.begin();
            (token, state.feed(feed_id).cloned(), state.news_limit)
        };

        let fetched = match feed {
            Some(feed) => {
                debug!("Loading feed {} from {}", feed.id, feed.url);
                self.source.fetch(&feed.url).await
            }
            None => Err(Error::FeedNotFound(feed_id.to_string())),
        };

        let mut state = self.state.lock();
        if !state.finish(token) {
            debug!("Discarding superseded load of feed {}", feed_id);
            return LoadStatus::Superseded;
        }

        match fetched {
            Ok(articles) if state.feed(feed_id).is_none() => {
                // Removed while the fetch was in flight.
                warn!(
                    "Discarding {} articles of feed {} removed during load",
                    articles.len(),
                    feed_id
                );
                state.error = Some(LOAD_FEED_ERROR.to_string());
                LoadStatus::Failed
            }
            Ok(articles) => {
                state.news = articles
                    .into_iter()
                    .take(limit)
                    .map(|article| article.with_feed_id(feed_id))
                    .collect();
                state.current_feed_id = Some(feed_id.to_string());

                info!("Loaded {} articles for feed {}", state.news.len(), feed_id);
                LoadStatus::Loaded(state.news.len())
            }
            Err(e) => {
                error!("Failed to load feed {}: {}", feed_id, e);
                state.error = Some(LOAD_FEED_ERROR.to_string());
                LoadStatus::Failed
            }
        }
    }

    /// Sets the truncation limit for later loads. The current cache is not
    /// re-sliced.
    pub fn set_limit(&self, limit: usize) {
        self.state.lock().news_limit = limit;
        debug!("News limit set to {}", limit);
    }

    /// Looks an article up in the cache first, then among favorites.
    pub fn find_article(&self, article_id: &str) -> Option<crate::feed::Article> {
        let state = self.state.lock();
        state
            .news
            .iter()
            .chain(state.favorites.iter())
            .find(|article| article.id == article_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::error::{Error, Result};
    use crate::feed::{Article, FeedSource, MarkupParser};
    use crate::storage::MemoryStorage;
    use crate::store::{FeedStore, LoadStatus, LOAD_FEED_ERROR};

    fn markup(count: usize) -> String {
        let mut markup = String::from("<rss><channel>");
        for i in 0..count {
            markup.push_str(&format!("<item><title>Story {}</title></item>", i));
        }
        markup.push_str("</channel></rss>");
        markup
    }

    /// Serves `count` items for URLs ending in the count; "down" URLs fail.
    struct CountingSource;

    #[async_trait]
    impl FeedSource for CountingSource {
        async fn fetch(&self, url: &str) -> Result<Vec<Article>> {
            if url.ends_with("down") {
                return Err(Error::Fetch("HTTP 500".to_string()));
            }
            let count = url.rsplit('/').next().and_then(|n| n.parse().ok()).unwrap_or(0);
            Ok(MarkupParser::new().parse(&markup(count)))
        }
    }

    async fn store_with(urls: &[&str]) -> (FeedStore, Vec<String>) {
        let store = FeedStore::new(Arc::new(CountingSource), Arc::new(MemoryStorage::new()));
        store.init().unwrap();
        let mut ids = Vec::new();
        for url in urls {
            ids.push(store.add_feed("Feed", url).await.unwrap().id);
        }
        (store, ids)
    }

    #[tokio::test]
    async fn test_load_truncates_to_limit_in_order() {
        let (store, ids) = store_with(&["https://example.com/15"]).await;

        assert_eq!(store.load_feed(&ids[0]).await, LoadStatus::Loaded(10));

        let articles = store.articles();
        assert_eq!(articles.len(), 10);
        for (i, article) in articles.iter().enumerate() {
            assert_eq!(article.title, format!("Story {}", i));
            assert_eq!(article.feed_id, ids[0]);
        }
        assert_eq!(store.current_feed().unwrap().id, ids[0]);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_set_limit_applies_to_next_load_only() {
        let (store, ids) = store_with(&["https://example.com/15"]).await;
        store.load_feed(&ids[0]).await;

        store.set_limit(3);
        assert_eq!(store.news_limit(), 3);
        assert_eq!(store.articles().len(), 10);

        store.load_feed(&ids[0]).await;
        assert_eq!(store.articles().len(), 3);
    }

    #[tokio::test]
    async fn test_loading_other_feed_replaces_cache() {
        let (store, ids) = store_with(&["https://example.com/4", "https://example.com/2"]).await;

        store.load_feed(&ids[0]).await;
        store.load_feed(&ids[1]).await;

        let articles = store.articles();
        assert_eq!(articles.len(), 2);
        assert!(articles.iter().all(|a| a.feed_id == ids[1]));
    }

    #[tokio::test]
    async fn test_unknown_feed_sets_error_and_keeps_cache() {
        let (store, ids) = store_with(&["https://example.com/3"]).await;
        store.load_feed(&ids[0]).await;

        assert_eq!(store.load_feed("nope").await, LoadStatus::Failed);

        assert_eq!(store.last_error().as_deref(), Some(LOAD_FEED_ERROR));
        assert_eq!(store.current_feed().unwrap().id, ids[0]);
        assert_eq!(store.articles().len(), 3);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_state() {
        let (store, ids) = store_with(&["https://example.com/5"]).await;
        store.load_feed(&ids[0]).await;
        store.update_feed(&ids[0], "Feed", "https://example.com/down").unwrap();

        assert_eq!(store.load_feed(&ids[0]).await, LoadStatus::Failed);
        assert_eq!(store.articles().len(), 5);
        assert_eq!(store.last_error().as_deref(), Some(LOAD_FEED_ERROR));
    }

    #[tokio::test]
    async fn test_find_article_checks_cache_then_favorites() {
        let (store, ids) = store_with(&["https://example.com/2"]).await;
        store.load_feed(&ids[0]).await;

        let cached = store.articles()[1].clone();
        assert_eq!(store.find_article(&cached.id), Some(cached));
        assert!(store.find_article("missing").is_none());
    }
}
