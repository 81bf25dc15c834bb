pub mod types;

pub use types::Item;

use async_trait::async_trait;
use tracing::debug;

/// Public Firebase endpoint for the Hacker News API.
pub const DEFAULT_API_BASE: &str = "https://hacker-news.firebaseio.com/v0";

/// Point-fetch of a single item by id.
///
/// The contract is deliberately lossy: network errors, non-success statuses,
/// and undecodable payloads all map to `None`. Nothing is retried and no
/// error escapes to the caller; the caller decides whether an absent item is
/// terminal or tolerable.
#[async_trait]
pub trait ItemFetch: Send + Sync {
    async fn fetch_item(&self, id: u64) -> Option<Item>;
}

/// HTTP client for the Hacker News item endpoint.
pub struct HnClient {
    http: reqwest::Client,
    base_url: String,
}

impl HnClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn item_url(&self, id: u64) -> String {
        format!("{}/item/{}.json", self.base_url.trim_end_matches('/'), id)
    }
}

#[async_trait]
impl ItemFetch for HnClient {
    async fn fetch_item(&self, id: u64) -> Option<Item> {
        let response = match self.http.get(self.item_url(id)).send().await {
            Ok(response) => response,
            Err(error) => {
                debug!(id, %error, "item request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(id, status = %response.status(), "item request returned non-success");
            return None;
        }

        // The endpoint answers 200 with a literal `null` body for ids that
        // do not exist, so decode through Option.
        match response.json::<Option<Item>>().await {
            Ok(item) => item,
            Err(error) => {
                debug!(id, %error, "item decode failed");
                None
            }
        }
    }
}
