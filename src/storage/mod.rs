pub mod json_file;
pub mod traits;

pub use json_file::JsonFileStorage;
pub use traits::{KeyValueStorage, MemoryStorage};

/// Key holding the JSON array of subscribed feeds.
pub const FEEDS_KEY: &str = "rss-feeds";

/// Key holding the JSON array of favorited articles.
pub const FAVORITES_KEY: &str = "rss-favorites";
