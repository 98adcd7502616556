use tracing::{debug, info};

use super::FeedStore;
use crate::error::Result;
use crate::feed::Article;

impl FeedStore {
    /// Bookmarks an article from the cache (or an existing favorite).
    ///
    /// The article is copied, so later loads do not affect the favorite.
    /// Unknown or already-favorited ids are ignored. Returns whether a
    /// favorite was added.
    pub fn add_favorite(&self, article_id: &str) -> Result<bool> {
        let mut state = self.state.lock();

        if state.favorites.iter().any(|article| article.id == article_id) {
            debug!("Article {} is already a favorite", article_id);
            return Ok(false);
        }

        let Some(article) = state.news.iter().find(|article| article.id == article_id).cloned() else {
            debug!("Cannot favorite unknown article {}", article_id);
            return Ok(false);
        };

        let mut favorites = state.favorites.clone();
        favorites.push(article);
        self.persist(&state.feeds, &favorites)?;
        state.favorites = favorites;

        info!("Added article {} to favorites", article_id);
        Ok(true)
    }

    /// Drops a favorite. Storage is rewritten even if nothing matched.
    pub fn remove_favorite(&self, article_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        let favorites: Vec<Article> = state
            .favorites
            .iter()
            .filter(|article| article.id != article_id)
            .cloned()
            .collect();
        self.persist(&state.feeds, &favorites)?;
        state.favorites = favorites;

        debug!("Removed article {} from favorites", article_id);
        Ok(())
    }

    /// Membership over favorites only; the cache is not consulted.
    pub fn is_favorite(&self, article_id: &str) -> bool {
        self.state
            .lock()
            .favorites
            .iter()
            .any(|article| article.id == article_id)
    }

    /// Case-insensitive substring search over title and description.
    ///
    /// Scans the cache, then favorites. An article present in both appears
    /// twice.
    pub fn search(&self, query: &str) -> Vec<Article> {
        let needle = query.to_lowercase();
        let state = self.state.lock();

        state
            .news
            .iter()
            .chain(state.favorites.iter())
            .filter(|article| article.matches(&needle))
            .cloned()
            .collect()
    }
}
