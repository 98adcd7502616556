pub mod cli;
pub mod config;
pub mod error;
pub mod feed;
pub mod storage;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use feed::{Article, Feed};
pub use store::{FeedStore, LoadStatus};
