//! Facebook Graph API feed client.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::relay::error::RelayError;

const GRAPH_API_URL: &str = "https://graph.facebook.com/v2.5";

/// One post from the page feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedPost {
    pub id: String,
    /// Textual body; posts without one (photo-only etc.) are never broadcast.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub updated_time: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
}

impl FeedPost {
    /// Publish date as `YYYYMMDD`, preferring `updated_time` over
    /// `created_time`. Timestamps arrive as `<date>T<time>`; the date part
    /// is taken verbatim, no timezone normalization.
    pub fn published_date(&self) -> Option<String> {
        let raw = self.updated_time.as_deref().or(self.created_time.as_deref())?;
        let (date, _) = raw.split_once('T')?;
        Some(date.replace('-', ""))
    }

    pub fn permalink(&self) -> String {
        format!("https://fb.com/{}", self.id)
    }
}

#[derive(Deserialize)]
struct FeedPage {
    #[serde(default)]
    data: Vec<FeedPost>,
}

/// Feed source seam.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch up to the configured page size of recent posts.
    async fn recent_posts(&self) -> Result<Vec<FeedPost>, RelayError>;
}

/// Graph API client for a single page feed.
pub struct FacebookFeed {
    client: reqwest::Client,
    token: String,
    page_id: String,
    page_size: u32,
}

impl FacebookFeed {
    pub fn new(token: String, page_id: String, page_size: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            page_id,
            page_size,
        }
    }
}

#[async_trait]
impl FeedSource for FacebookFeed {
    async fn recent_posts(&self) -> Result<Vec<FeedPost>, RelayError> {
        let url = format!("{GRAPH_API_URL}/{}/feed", self.page_id);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("access_token", self.token.as_str()),
                ("limit", &self.page_size.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Feed(format!("feed request failed ({status}): {body}")));
        }

        let page: FeedPage = response.json().await?;
        debug!("fetched {} post(s) from feed", page.data.len());
        Ok(page.data)
    }
}
