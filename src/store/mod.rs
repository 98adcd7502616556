//! The state container behind the reader.
//!
//! [`FeedStore`] owns the subscribed feeds, the article cache for the active
//! feed and the favorites shelf. All mutation goes through its methods, split
//! by concern:
//!
//! - `feeds`: subscribe, remove (with cascade), rename, lookup
//! - `articles`: loading the active feed into the cache
//! - `favorites`: bookmarking and search
//!
//! Network access and persistence are injected as [`FeedSource`] and
//! [`KeyValueStorage`] so tests can replace both.
//!
//! `loading` and `error` are shared by every call. Each network call takes a
//! generation token when it starts and only touches shared state on
//! completion if no newer call has started since.

mod articles;
mod favorites;
mod feeds;

use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::feed::fetcher::{FeedSource, ProxiedFeedFetcher};
use crate::feed::{ids, Article, Feed};
use crate::storage::{JsonFileStorage, KeyValueStorage, FAVORITES_KEY, FEEDS_KEY};

pub use articles::LoadStatus;

pub const DEFAULT_NEWS_LIMIT: usize = 10;

pub const ADD_FEED_ERROR: &str = "Unable to add this RSS feed. Check the URL.";
pub const LOAD_FEED_ERROR: &str = "Error while loading the RSS feed";

#[derive(Debug)]
struct StoreState {
    feeds: Vec<Feed>,
    current_feed_id: Option<String>,
    news: Vec<Article>,
    favorites: Vec<Article>,
    loading: bool,
    error: Option<String>,
    news_limit: usize,
    generation: u64,
    initialized: bool,
}

impl StoreState {
    fn new(news_limit: usize) -> Self {
        Self {
            feeds: Vec::new(),
            current_feed_id: None,
            news: Vec::new(),
            favorites: Vec::new(),
            loading: false,
            error: None,
            news_limit,
            generation: 0,
            initialized: false,
        }
    }

    fn feed(&self, id: &str) -> Option<&Feed> {
        self.feeds.iter().find(|feed| feed.id == id)
    }

    /// Starts a network call: raises `loading`, clears the shared error and
    /// hands out a token newer than every earlier one.
    fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.loading = true;
        self.error = None;
        self.generation
    }

    fn is_latest(&self, token: u64) -> bool {
        self.generation == token
    }

    /// Ends a network call. Returns whether the call was still the latest.
    fn finish(&mut self, token: u64) -> bool {
        let latest = self.is_latest(token);
        if latest {
            self.loading = false;
        }
        latest
    }
}

/// Coordinator for feeds, the article cache and favorites.
pub struct FeedStore {
    state: Mutex<StoreState>,
    source: Arc<dyn FeedSource>,
    storage: Arc<dyn KeyValueStorage>,
}

impl FeedStore {
    pub fn new(source: Arc<dyn FeedSource>, storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::with_limit(source, storage, DEFAULT_NEWS_LIMIT)
    }

    pub fn with_limit(
        source: Arc<dyn FeedSource>,
        storage: Arc<dyn KeyValueStorage>,
        news_limit: usize,
    ) -> Self {
        Self {
            state: Mutex::new(StoreState::new(news_limit)),
            source,
            storage,
        }
    }

    /// Builds a store wired to the proxy fetcher and file storage described
    /// by `config`, and runs [`FeedStore::init`].
    pub fn open(config: &Config) -> Result<Self> {
        let source = Arc::new(ProxiedFeedFetcher::from_settings(&config.settings)?);
        let storage = Arc::new(JsonFileStorage::new(config.resolved_data_dir()?)?);
        info!(
            "Using data directory {} and proxy {}",
            storage.dir().display(),
            source.proxy_endpoint()
        );

        let store = Self::with_limit(source, storage, config.settings.news_limit);
        store.init()?;
        Ok(store)
    }

    /// Loads persisted feeds and favorites. Only the first call has an effect.
    ///
    /// Operations used before this runs see empty collections.
    pub fn init(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.initialized {
            debug!("Store already initialized");
            return Ok(());
        }

        let feeds: Vec<Feed> = self.read_collection(FEEDS_KEY)?;
        let favorites: Vec<Article> = self.read_collection(FAVORITES_KEY)?;

        ids::observe_existing(feeds.iter().map(|feed| feed.id.as_str()));

        info!(
            "Loaded {} feeds and {} favorites from storage",
            feeds.len(),
            favorites.len()
        );

        state.feeds = feeds;
        state.favorites = favorites;
        state.initialized = true;
        Ok(())
    }

    fn read_collection<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.storage.read(key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn write_collection<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
        let raw = serde_json::to_string(items)?;
        self.storage.write(key, &raw)
    }

    /// Overwrites both persisted collections with the given candidates.
    ///
    /// Callers hold the state lock, so writes to each key are serialized, and
    /// only swap the candidates into memory once this returns `Ok`. A failed
    /// write therefore leaves memory as it was. If the feeds write succeeds
    /// and the favorites write fails, storage holds the new feed set until the
    /// next successful write.
    fn persist(&self, feeds: &[Feed], favorites: &[Article]) -> Result<()> {
        self.write_collection(FEEDS_KEY, feeds)?;
        self.write_collection(FAVORITES_KEY, favorites)?;
        debug!(
            "Persisted {} feeds and {} favorites",
            feeds.len(),
            favorites.len()
        );
        Ok(())
    }

    pub fn feeds(&self) -> Vec<Feed> {
        self.state.lock().feeds.clone()
    }

    /// The feed whose articles are currently cached.
    pub fn current_feed(&self) -> Option<Feed> {
        let state = self.state.lock();
        state
            .current_feed_id
            .as_deref()
            .and_then(|id| state.feed(id))
            .cloned()
    }

    /// Cached articles of the current feed.
    pub fn articles(&self) -> Vec<Article> {
        self.state.lock().news.clone()
    }

    pub fn favorites(&self) -> Vec<Article> {
        self.state.lock().favorites.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    /// Latest failure message. Shared by all operations; a new failure
    /// overwrites it and a new network call clears it.
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn news_limit(&self) -> usize {
        self.state.lock().news_limit
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }
}
