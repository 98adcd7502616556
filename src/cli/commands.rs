use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::feed::Article;
use crate::store::{FeedStore, LoadStatus};

/// Write the default configuration (unless one exists) and create the data
/// directory.
pub fn init(config_path: &Path, config: &Config) -> Result<()> {
    info!("Initializing RSS-Shelf configuration");

    if config_path.exists() {
        warn!("Configuration file already exists: {}", config_path.display());
    } else {
        config.save(config_path)?;
        info!("Created default configuration: {}", config_path.display());
    }

    let data_dir = config.resolved_data_dir()?;
    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)?;
        info!("Created data directory: {}", data_dir.display());
    }

    println!("✅ RSS-Shelf initialized successfully!");
    println!("   Config file: {}", config_path.display());
    println!("   Data directory: {}", data_dir.display());
    println!();
    println!("Next steps:");
    println!("   1. Add RSS feeds: rss-shelf add-feed <title> <url>");
    println!("   2. Read a feed: rss-shelf show <feed-id>");

    Ok(())
}

/// Subscribe to a feed after a trial fetch
pub async fn add_feed(config: &Config, title: String, url: String) -> Result<()> {
    let store = FeedStore::open(config)?;

    println!("📡 Testing feed URL...");
    let feed = store.add_feed(&title, &url).await?;

    println!("✅ Feed '{}' added successfully!", feed.title);
    println!("   Id: {}", feed.id);
    println!("   URL: {}", feed.url);

    Ok(())
}

/// Unsubscribe from a feed
pub fn remove_feed(config: &Config, id: String) -> Result<()> {
    let store = FeedStore::open(config)?;

    let Some(feed) = store.find_by_id(&id) else {
        return Err(Error::FeedNotFound(id));
    };
    let favorites_before = store.favorites().len();

    store.remove_feed(&id)?;

    println!("✅ Feed '{}' removed successfully!", feed.title);
    println!("   Removed URL: {}", feed.url);
    let dropped = favorites_before - store.favorites().len();
    if dropped > 0 {
        println!("   Dropped {} favorite(s)", dropped);
    }

    Ok(())
}

/// Rename or repoint a feed
pub fn update_feed(config: &Config, id: String, title: String, url: String) -> Result<()> {
    let store = FeedStore::open(config)?;

    if !store.update_feed(&id, &title, &url)? {
        return Err(Error::FeedNotFound(id));
    }

    println!("✅ Feed {} updated", id);
    println!("   Title: {}", title);
    println!("   URL: {}", url);
    println!("💡 The new URL was not checked; it is fetched on the next load");

    Ok(())
}

/// List all subscribed feeds
pub fn list_feeds(config: &Config) -> Result<()> {
    let store = FeedStore::open(config)?;
    let feeds = store.feeds();

    if feeds.is_empty() {
        println!("📋 No feeds subscribed yet.");
        println!("   Add feeds with: rss-shelf add-feed <title> <url>");
        return Ok(());
    }

    println!("📋 Subscribed RSS Feeds:");
    println!("========================");

    let favorites = store.favorites();
    for feed in &feeds {
        let starred = favorites.iter().filter(|a| a.feed_id == feed.id).count();
        println!("\n📰 {}", feed.title);
        println!("   Id: {}", feed.id);
        println!("   URL: {}", feed.url);
        println!("   Favorites: {}", starred);
    }

    Ok(())
}

/// Load a feed and print its articles
pub async fn show(config: &Config, feed_id: String, limit: Option<usize>) -> Result<()> {
    let store = FeedStore::open(config)?;
    if let Some(limit) = limit {
        store.set_limit(limit);
    }

    let articles = load_articles(&store, &feed_id).await?;
    let feed_title = store
        .current_feed()
        .map(|feed| feed.title)
        .unwrap_or_else(|| feed_id.clone());

    println!("📰 {} ({} articles)", feed_title, articles.len());
    println!("========================");

    for (i, article) in articles.iter().enumerate() {
        print_article(i + 1, article, store.is_favorite(&article.id));
    }

    Ok(())
}

/// Load a feed and favorite one of its articles
pub async fn star(config: &Config, feed_id: String, position: usize) -> Result<()> {
    let store = FeedStore::open(config)?;
    let articles = load_articles(&store, &feed_id).await?;

    let article = position
        .checked_sub(1)
        .and_then(|index| articles.get(index))
        .ok_or_else(|| {
            Error::NotFound(format!(
                "No article at position {} (feed has {})",
                position,
                articles.len()
            ))
        })?;

    if store.add_favorite(&article.id)? {
        println!("⭐ Added to favorites: {}", article.title);
        println!("   Id: {}", article.id);
    } else {
        println!("⭐ Already a favorite: {}", article.title);
    }

    Ok(())
}

/// Remove a favorite
pub fn unstar(config: &Config, article_id: String) -> Result<()> {
    let store = FeedStore::open(config)?;
    let was_favorite = store.is_favorite(&article_id);

    store.remove_favorite(&article_id)?;

    if was_favorite {
        println!("✅ Removed {} from favorites", article_id);
    } else {
        println!("📋 {} was not a favorite", article_id);
    }

    Ok(())
}

/// List favorites
pub fn list_favorites(config: &Config) -> Result<()> {
    let store = FeedStore::open(config)?;
    let favorites = store.favorites();

    if favorites.is_empty() {
        println!("⭐ No favorites yet.");
        println!("   Star articles with: rss-shelf star <feed-id> <position>");
        return Ok(());
    }

    println!("⭐ Favorites ({})", favorites.len());
    println!("========================");
    for (i, article) in favorites.iter().enumerate() {
        print_article(i + 1, article, true);
    }

    Ok(())
}

/// Search favorites, plus the articles of `feed` when given
pub async fn search(config: &Config, query: String, feed: Option<String>) -> Result<()> {
    let store = FeedStore::open(config)?;
    if let Some(feed_id) = feed {
        load_articles(&store, &feed_id).await?;
    }

    let hits = store.search(&query);
    if hits.is_empty() {
        println!("🔍 No articles match '{}'", query);
        return Ok(());
    }

    println!("🔍 {} match(es) for '{}'", hits.len(), query);
    println!("========================");
    for (i, article) in hits.iter().enumerate() {
        print_article(i + 1, article, store.is_favorite(&article.id));
    }

    Ok(())
}

/// Loads a feed, turning the store's swallowed failure into an error.
async fn load_articles(store: &FeedStore, feed_id: &str) -> Result<Vec<Article>> {
    if store.find_by_id(feed_id).is_none() {
        return Err(Error::FeedNotFound(feed_id.to_string()));
    }

    println!("📡 Loading feed...");
    match store.load_feed(feed_id).await {
        LoadStatus::Loaded(count) => {
            debug!("Loaded {} articles", count);
            Ok(store.articles())
        }
        LoadStatus::Failed | LoadStatus::Superseded => Err(Error::Fetch(
            store
                .last_error()
                .unwrap_or_else(|| format!("Could not load feed {}", feed_id)),
        )),
    }
}

fn print_article(position: usize, article: &Article, favorite: bool) {
    let marker = if favorite { "⭐" } else { "  " };
    println!("\n{} {}. {}", marker, position, article.title);
    println!("     Id: {}", article.id);
    if !article.link.is_empty() {
        println!("     Link: {}", article.link);
    }
    println!("     Published: {}", article.pub_date);
    println!("     {}", truncate(article.body(), 100));
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

/// One-line report for a failed command, with a hint for the kinds of
/// failure the user can act on.
pub fn describe_error(error: &Error) -> String {
    let hint = if error.is_user_error() {
        "\n💡 Check the arguments and configuration"
    } else if error.is_temporary() {
        "\n💡 This may be temporary; try again"
    } else {
        ""
    };
    format!("Error [{}]: {}{}", error.error_code(), error, hint)
}

/// Generate shell completions
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

/// Install the tracing subscriber. The returned guard must stay alive for
/// file logging to flush.
pub fn init_logging(debug: bool, verbose: bool, config: &Config) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, EnvFilter};

    let logging = &config.logging;
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(debug)
        .with_line_number(debug);

    let guard = if logging.log_to_file {
        let log_path = resolve_log_path(&logging.log_file, config)?;
        let dir = log_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = log_path
            .file_name()
            .ok_or_else(|| Error::Config(format!("Invalid log file: {}", logging.log_file)))?
            .to_owned();
        fs::create_dir_all(&dir)?;

        let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
        let builder = builder.with_writer(writer).with_ansi(false);
        let installed = if logging.json_format {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        installed.map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))?;
        Some(guard)
    } else {
        let installed = if logging.json_format {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        installed.map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))?;
        None
    };

    debug!("Logging initialized");
    Ok(guard)
}

fn resolve_log_path(log_file: &str, config: &Config) -> Result<PathBuf> {
    let path = PathBuf::from(log_file);
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(config.resolved_data_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 3), "ééé...");
    }

    #[test]
    fn test_describe_error_adds_code_and_hint() {
        let report = describe_error(&Error::FeedNotFound("42".to_string()));
        assert!(report.starts_with("Error [FEED_NOT_FOUND]: Feed not found: 42"));
        assert!(report.contains("Check the arguments"));

        let report = describe_error(&Error::Fetch("HTTP 502".to_string()));
        assert!(report.starts_with("Error [FETCH]: "));
        assert!(report.contains("try again"));

        let report = describe_error(&Error::Storage("disk full".to_string()));
        assert_eq!(report, "Error [STORAGE]: Storage error: disk full");
    }

    #[test]
    fn test_relative_log_path_lands_in_data_dir() {
        let mut config = Config::default();
        config.storage.data_dir = Some(PathBuf::from("/var/lib/rss-shelf"));

        assert_eq!(
            resolve_log_path("logs/rss-shelf.log", &config).unwrap(),
            PathBuf::from("/var/lib/rss-shelf/logs/rss-shelf.log")
        );
        assert_eq!(
            resolve_log_path("/tmp/x.log", &config).unwrap(),
            PathBuf::from("/tmp/x.log")
        );
    }
}
