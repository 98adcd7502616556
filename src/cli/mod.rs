pub mod commands;

use clap::{Parser, Subcommand};
use crate::config::Config;
use crate::error::Result;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rss-shelf")]
#[command(about = "Subscribe to RSS feeds, read them and keep favorites")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "RSS_SHELF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration and create the data directory
    Init,

    /// Subscribe to a feed (the URL is fetched once to validate it)
    AddFeed {
        /// Display title
        title: String,

        /// Feed URL
        url: String,
    },

    /// Unsubscribe from a feed and drop its favorites
    RemoveFeed {
        /// Feed id
        id: String,
    },

    /// Rename or repoint a feed without re-validating it
    UpdateFeed {
        /// Feed id
        id: String,

        /// New title
        title: String,

        /// New URL
        url: String,
    },

    /// List subscribed feeds
    ListFeeds,

    /// Load a feed and print its articles
    Show {
        /// Feed id
        feed_id: String,

        /// Maximum number of articles to keep
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Load a feed and favorite the article at a position (1-based)
    Star {
        /// Feed id
        feed_id: String,

        /// Position as printed by `show`
        position: usize,
    },

    /// Remove an article from favorites
    Unstar {
        /// Article id
        article_id: String,
    },

    /// List favorite articles
    Favorites,

    /// Search favorites (and a loaded feed, when given)
    Search {
        /// Case-insensitive text to look for
        query: String,

        /// Load this feed first so its articles are searched too
        #[arg(short, long)]
        feed: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => Config::default_path()?,
        };
        let config = Config::load_or_default(&config_path)?;

        // Keeps the file writer flushing until the command finishes.
        let _log_guard = commands::init_logging(self.debug, self.verbose, &config)?;

        match self.command {
            Commands::Init => {
                commands::init(&config_path, &config)
            }
            Commands::AddFeed { title, url } => {
                commands::add_feed(&config, title, url).await
            }
            Commands::RemoveFeed { id } => {
                commands::remove_feed(&config, id)
            }
            Commands::UpdateFeed { id, title, url } => {
                commands::update_feed(&config, id, title, url)
            }
            Commands::ListFeeds => {
                commands::list_feeds(&config)
            }
            Commands::Show { feed_id, limit } => {
                commands::show(&config, feed_id, limit).await
            }
            Commands::Star { feed_id, position } => {
                commands::star(&config, feed_id, position).await
            }
            Commands::Unstar { article_id } => {
                commands::unstar(&config, article_id)
            }
            Commands::Favorites => {
                commands::list_favorites(&config)
            }
            Commands::Search { query, feed } => {
                commands::search(&config, query, feed).await
            }
            Commands::Completions { shell } => {
                commands::generate_completions(shell);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_show_with_limit() {
        let cli = Cli::try_parse_from(["rss-shelf", "show", "1700000000000", "--limit", "5"]).unwrap();
        match cli.command {
            Commands::Show { feed_id, limit } => {
                assert_eq!(feed_id, "1700000000000");
                assert_eq!(limit, Some(5));
            }
            other => panic!("Unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["rss-shelf", "list-feeds", "--config", "/tmp/c.toml", "-v"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(cli.verbose);
        assert!(!cli.debug);
    }
}
