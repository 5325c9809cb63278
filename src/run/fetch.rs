use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use feed_rs::model::Feed;
use feed_rs::parser;
use reqwest::Client;
use url::Url;

use crate::run::types::Entry;

const FETCH_TIMEOUT_SECS: u64 = 30;

/// Where feed documents come from. The pipeline only sees this trait, so
/// tests substitute fixture documents for live HTTP.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Feed>;
}

pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("rss-digest/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Bytes> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("feed fetch failed with status: {status}"));
        }
        Ok(resp.bytes().await?)
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &str) -> Result<Feed> {
        // friendly error before any HTTP I/O
        if Url::parse(url).is_err() {
            return Err(anyhow!("invalid feed url: {url}"));
        }
        let bytes = self.fetch_bytes(url).await?;
        Ok(parser::parse(&bytes[..])?)
    }
}

/// Map a parsed feed entry onto the pipeline's entry shape, applying the
/// ordered fallbacks: a missing title becomes "Untitled"; the article body
/// prefers structured content, then the summary/description, then the
/// title. An entry without a link has no stable identity and yields `None`.
pub fn entry_fields(entry: &feed_rs::model::Entry) -> Option<Entry> {
    let link = entry.links.first().map(|l| l.href.clone())?;
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.clone())
        .unwrap_or_else(|| "Untitled".to_string());
    let article = entry
        .content
        .as_ref()
        .and_then(|c| c.body.clone())
        .or_else(|| entry.summary.as_ref().map(|s| s.content.clone()))
        .unwrap_or_else(|| title.clone());
    Some(Entry {
        title,
        article,
        link,
        summary: None,
    })
}
