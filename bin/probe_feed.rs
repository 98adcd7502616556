use rss_shelf::feed::fetcher::DEFAULT_PROXY_URL;
use rss_shelf::feed::{FeedSource, ProxiedFeedFetcher};

/// Fetches one feed through the proxy and prints what the parser makes of it.
///
/// Usage: probe_feed [feed-url] [proxy-url]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .unwrap_or_else(|| "https://commoncog.com/blog/rss/".to_string());
    let proxy = args.next().unwrap_or_else(|| DEFAULT_PROXY_URL.to_string());

    let fetcher = ProxiedFeedFetcher::new(&proxy)?;
    println!("Fetching feed from: {}", url);
    println!("Via: {}", fetcher.proxied_url(&url));

    match fetcher.fetch(&url).await {
        Ok(articles) => {
            println!("✓ Feed fetched and parsed successfully!");
            println!("Number of articles: {}", articles.len());

            for (i, article) in articles.iter().take(3).enumerate() {
                println!("\nArticle {}:", i + 1);
                println!("  Id: {}", article.id);
                println!("  Title: {}", article.title);
                println!("  Link: {}", article.link);
                let description: String = article.description.chars().take(100).collect();
                if description.len() < article.description.len() {
                    println!("  Description: {}...", description);
                } else {
                    println!("  Description: {}", description);
                }
                println!("  Published: {}", article.pub_date);
                if let Some(image) = article.image.as_deref().filter(|i| !i.is_empty()) {
                    println!("  Image: {}", image);
                }
            }
        }
        Err(e) => {
            println!("✗ Failed to fetch feed: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
