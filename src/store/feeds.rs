use tracing::{debug, info, warn};

use super::{FeedStore, ADD_FEED_ERROR};
use crate::error::{Error, Result};
use crate::feed::{ids, Article, Feed};

impl FeedStore {
    /// Subscribes to `url` after a trial fetch proves it reachable.
    ///
    /// The trial's articles are discarded. On failure the feed set is left
    /// untouched, the shared error is set and the error is returned as
    /// [`Error::FeedValidation`].
    pub async fn add_feed(&self, title: &str, url: &str) -> Result<Feed> {
        let token = self.state.lock().begin();
        info!("Adding feed: {} -> {}", title, url);

        let trial = self.source.fetch(url).await;

        let mut state = self.state.lock();
        let latest = state.finish(token);

        match trial {
            Ok(articles) => {
                debug!("Trial fetch of {} returned {} items", url, articles.len());

                let feed = Feed::new(ids::next_feed_id(), title, url);
                let mut feeds = state.feeds.clone();
                feeds.push(feed.clone());
                self.persist(&feeds, &state.favorites)?;
                state.feeds = feeds;

                info!("Feed '{}' added with id {}", feed.title, feed.id);
                Ok(feed)
            }
            Err(e) => {
                warn!("Rejected feed {}: {}", url, e);
                if latest {
                    state.error = Some(ADD_FEED_ERROR.to_string());
                }
                Err(Error::FeedValidation(format!("{}: {}", url, e)))
            }
        }
    }

    /// Unsubscribes `id`, dropping its favorites and, if it is the active
    /// feed, the article cache. Unknown ids are ignored.
    pub fn remove_feed(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock();

        let feeds: Vec<Feed> = state.feeds.iter().filter(|feed| feed.id != id).cloned().collect();
        let favorites: Vec<Article> = state
            .favorites
            .iter()
            .filter(|article| article.feed_id != id)
            .cloned()
            .collect();

        self.persist(&feeds, &favorites)?;

        if feeds.len() < state.feeds.len() {
            info!(
                "Removed feed {} and {} of its favorites",
                id,
                state.favorites.len() - favorites.len()
            );
        } else {
            debug!("Remove ignored unknown feed {}", id);
        }

        state.feeds = feeds;
        state.favorites = favorites;

        if state.current_feed_id.as_deref() == Some(id) {
            state.current_feed_id = None;
            state.news.clear();
            debug!("Cleared article cache of removed feed {}", id);
        }
        Ok(())
    }

    /// Renames or repoints a feed in place, keeping its id and position.
    ///
    /// The new URL is not fetched; an unreachable URL only shows up on the
    /// next load. Returns whether a feed with `id` existed.
    pub fn update_feed(&self, id: &str, title: &str, url: &str) -> Result<bool> {
        let mut state = self.state.lock();

        let Some(position) = state.feeds.iter().position(|feed| feed.id == id) else {
            debug!("Update ignored unknown feed {}", id);
            return Ok(false);
        };

        let mut feeds = state.feeds.clone();
        feeds[position] = Feed::new(id, title, url);

        self.persist(&feeds, &state.favorites)?;
        state.feeds = feeds;
        info!("Updated feed {}", id);
        Ok(true)
    }

    pub fn find_by_id(&self, id: &str) -> Option<Feed> {
        self.state.lock().feed(id).cloned()
    }
}
