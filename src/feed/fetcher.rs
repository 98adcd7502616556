use crate::config::Settings;
use crate::error::{Error, Result};
use crate::feed::parser::MarkupParser;
use crate::feed::Article;
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_PROXY_URL: &str = "https://api.allorigins.win/raw";

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is escaped.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Anything that can turn a feed URL into parsed article candidates.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<Article>>;
}

/// Retrieves feeds through a public passthrough proxy so that origins which
/// do not allow cross-origin reads can still be consumed.
///
/// The target URL is percent-encoded into the proxy's `url` query parameter.
/// Only HTTP 200 counts as success and the body is handed to the parser
/// without looking at its content type. No timeout and no retry are applied.
#[derive(Debug, Clone)]
pub struct ProxiedFeedFetcher {
    client: Client,
    proxy_endpoint: Url,
    user_agent: String,
    parser: MarkupParser,
}

impl ProxiedFeedFetcher {
    pub fn new(proxy_endpoint: &str) -> Result<Self> {
        let proxy_endpoint = Url::parse(proxy_endpoint)
            .map_err(|e| Error::InvalidUrl(format!("Invalid proxy URL {}: {}", proxy_endpoint, e)))?;

        let client = Client::builder()
            .gzip(true)
            .build()
            .map_err(|e| Error::Fetch(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            proxy_endpoint,
            user_agent: format!("RSS-Shelf/{}", env!("CARGO_PKG_VERSION")),
            parser: MarkupParser::new(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(&settings.proxy_url)?.with_user_agent(settings.user_agent.clone()))
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn proxy_endpoint(&self) -> &Url {
        &self.proxy_endpoint
    }

    /// The proxy URL that retrieves `target`, encoded the way
    /// `encodeURIComponent` does (a space becomes `%20`, never `+`).
    pub fn proxied_url(&self, target: &str) -> Url {
        let encoded = utf8_percent_encode(target, URI_COMPONENT);
        let query = match self.proxy_endpoint.query() {
            Some(existing) if !existing.is_empty() => format!("{}&url={}", existing, encoded),
            _ => format!("url={}", encoded),
        };

        let mut url = self.proxy_endpoint.clone();
        url.set_query(Some(&query));
        url
    }

    pub fn validate_feed_url(&self, url: &str) -> Result<()> {
        let parsed_url =
            Url::parse(url).map_err(|e| Error::InvalidUrl(format!("Invalid URL: {}", e)))?;

        match parsed_url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(Error::InvalidUrl(format!("Unsupported scheme: {}", scheme))),
        }
    }

    /// Fetches the raw markup behind `url`.
    pub async fn fetch_markup(&self, url: &str) -> Result<String> {
        self.validate_feed_url(url)?;

        let proxied = self.proxied_url(url);
        debug!("Fetching {} via {}", url, proxied);

        let response = self
            .client
            .get(proxied)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("Request for {} failed: {}", url, e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Proxy answered HTTP {} for {}", status.as_u16(), url);
            return Err(Error::Fetch(format!(
                "HTTP {} for {}: {}",
                status.as_u16(),
                url,
                status.canonical_reason().unwrap_or("Unknown error")
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to read response body: {}", e)))?;

        debug!("Downloaded {} bytes for {}", body.len(), url);
        Ok(body)
    }
}

#[async_trait]
impl FeedSource for ProxiedFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<Article>> {
        let markup = self.fetch_markup(url).await?;
        Ok(self.parser.parse(&markup))
    }
}
