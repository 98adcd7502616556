//! End-to-end behavior of the store wired to the proxy fetcher, with a mock
//! server standing in for the passthrough proxy.

use std::sync::Arc;

use rss_shelf::error::Error;
use rss_shelf::feed::{FeedSource, ProxiedFeedFetcher};
use rss_shelf::storage::MemoryStorage;
use rss_shelf::store::{FeedStore, LoadStatus, ADD_FEED_ERROR, LOAD_FEED_ERROR};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use test_data::*;

const TECH_URL: &str = "https://technews.example.com/rss";

async fn mount_feed(server: &MockServer, target: &str, body: impl Into<String>) {
    Mock::given(method("GET"))
        .and(path("/raw"))
        .and(query_param("url", target))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body.into())
                .insert_header("content-type", "application/rss+xml"),
        )
        .mount(server)
        .await;
}

fn fetcher_for(server: &MockServer) -> ProxiedFeedFetcher {
    ProxiedFeedFetcher::new(&format!("{}/raw", server.uri())).unwrap()
}

fn store_for(server: &MockServer) -> FeedStore {
    let store = FeedStore::new(Arc::new(fetcher_for(server)), Arc::new(MemoryStorage::new()));
    store.init().unwrap();
    store
}

#[tokio::test]
async fn test_end_to_end_subscribe_and_read() {
    let server = MockServer::start().await;
    mount_feed(&server, TECH_URL, TECH_NEWS_RSS).await;

    let store = store_for(&server);
    let feed = store.add_feed("Tech News", TECH_URL).await.unwrap();
    assert_eq!(store.load_feed(&feed.id).await, LoadStatus::Loaded(3));

    let articles = store.articles();
    assert_eq!(articles[0].title, "AI Revolution in 2024");
    assert_eq!(articles[0].link, "https://technews.example.com/ai-revolution-2024");
    assert_eq!(articles[0].pub_date, "Thu, 16 Mar 2024 10:00:00 GMT");

    // CDATA markup is kept verbatim.
    assert_eq!(
        articles[1].description,
        "Scientists have achieved a new milestone in <strong>quantum computing</strong> research."
    );
    assert_eq!(
        articles[2].image.as_deref(),
        Some("https://technews.example.com/audio/cybersecurity.mp3")
    );
    assert!(articles.iter().all(|a| a.feed_id == feed.id));
}

#[tokio::test]
async fn test_target_url_is_percent_encoded_into_query() {
    let server = MockServer::start().await;
    let target = "https://news.example.com/feed?lang=en&sort=new";
    mount_feed(&server, target, SIMPLE_RSS).await;

    let fetcher = fetcher_for(&server);
    let articles = fetcher.fetch(target).await.unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].title, "Simple Article");

    let requests = server.received_requests().await.unwrap();
    let query = requests[0].url.query().unwrap_or_default().to_string();
    assert!(query.starts_with("url=https%3A%2F%2Fnews.example.com%2Ffeed%3Flang%3Den%26sort%3Dnew"));
}

#[tokio::test]
async fn test_user_agent_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/raw"))
        .and(header("User-Agent", "shelf-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SIMPLE_RSS))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server).with_user_agent("shelf-test/1.0".to_string());
    assert_eq!(fetcher.fetch(TECH_URL).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_proxy_error_rejects_subscription() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/raw"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let result = store.add_feed("Missing", TECH_URL).await;

    assert!(matches!(result, Err(Error::FeedValidation(_))));
    assert!(store.feeds().is_empty());
    assert_eq!(store.last_error().as_deref(), Some(ADD_FEED_ERROR));
    assert!(!store.is_loading());
}

#[tokio::test]
async fn test_non_200_success_codes_are_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/raw"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let result = fetcher_for(&server).fetch(TECH_URL).await;
    assert!(matches!(result, Err(Error::Fetch(_))));
}

#[tokio::test]
async fn test_non_http_target_never_reaches_proxy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SIMPLE_RSS))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server);
    assert!(matches!(
        fetcher.fetch("ftp://files.example.com/feed.xml").await,
        Err(Error::InvalidUrl(_))
    ));
    assert!(matches!(fetcher.fetch("not a url").await, Err(Error::InvalidUrl(_))));
}

#[tokio::test]
async fn test_feed_going_down_keeps_last_articles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/raw"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TECH_NEWS_RSS))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/raw"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let feed = store.add_feed("Tech", TECH_URL).await.unwrap();
    assert_eq!(store.load_feed(&feed.id).await, LoadStatus::Loaded(3));

    assert_eq!(store.load_feed(&feed.id).await, LoadStatus::Failed);
    assert_eq!(store.articles().len(), 3);
    assert_eq!(store.current_feed().unwrap().id, feed.id);
    assert_eq!(store.last_error().as_deref(), Some(LOAD_FEED_ERROR));

    // Each failure overwrites the shared message.
    let _ = store.add_feed("Tech", TECH_URL).await;
    assert_eq!(store.last_error().as_deref(), Some(ADD_FEED_ERROR));
}

#[tokio::test]
async fn test_html_error_page_yields_no_articles() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        TECH_URL,
        "<html><body><h1>Moved</h1><p>See elsewhere</p></body></html>",
    )
    .await;

    let store = store_for(&server);
    let feed = store.add_feed("Moved", TECH_URL).await.unwrap();
    assert_eq!(store.load_feed(&feed.id).await, LoadStatus::Loaded(0));
    assert!(store.articles().is_empty());
}

#[tokio::test]
async fn test_large_feed_is_truncated_to_configured_limit() {
    let server = MockServer::start().await;
    mount_feed(&server, TECH_URL, numbered_feed(40)).await;

    let store = FeedStore::with_limit(
        Arc::new(fetcher_for(&server)),
        Arc::new(MemoryStorage::new()),
        25,
    );
    store.init().unwrap();

    let feed = store.add_feed("Numbers", TECH_URL).await.unwrap();
    assert_eq!(store.load_feed(&feed.id).await, LoadStatus::Loaded(25));
    assert_eq!(store.articles().last().unwrap().title, "Article 24");
}
