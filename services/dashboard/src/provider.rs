use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error! status: {status}")]
    Http { status: u16 },

    #[error("Failed to parse JSON response: {0}")]
    Parse(String),

    #[error("Request failed: {0}")]
    Transport(String),
}

/// One GET per call, no retries.
#[async_trait]
pub trait DataFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError>;
}

/// Fetches `url` and decodes it into `T`. A body of the wrong shape is a
/// `Parse` failure, same as one that is not JSON at all.
pub async fn fetch_typed<T: DeserializeOwned>(
    fetcher: &dyn DataFetcher,
    url: &str,
) -> Result<T, FetchError> {
    let value = fetcher.fetch_json(url).await?;
    serde_json::from_value(value).map_err(|e| FetchError::Parse(e.to_string()))
}

/// Remote snapshot locations, relative to one base URL.
#[derive(Clone, Debug)]
pub struct Endpoints {
    base_url: String,
}

impl Endpoints {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn current_stats(&self) -> String {
        format!("{}/mesh-stats/mesh_stats.json", self.base_url)
    }

    pub fn yearly_stats(&self, year: i32) -> String {
        format!("{}/mesh-stats/mesh-yearly-stats-{year}.json", self.base_url)
    }

    pub fn yearly_votes(&self, year: i32) -> String {
        format!("{}/drep-voting/{year}_voting.json", self.base_url)
    }

    pub fn catalyst(&self) -> String {
        format!("{}/catalyst-proposals/catalyst-data.json", self.base_url)
    }
}
