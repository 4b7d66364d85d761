//! OpenSky state-vector client.

use std::time::Duration;

use airspace_core::geo::BoundingBox;
use airspace_core::opensky::{query_params, StatesResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum TrafficError {
    #[error("OpenSky API error: {0}")]
    Status(reqwest::StatusCode),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Anything that can answer "which aircraft are in this box".
#[async_trait::async_trait]
pub trait TrafficSource: Send + Sync {
    async fn fetch_states(&self, bbox: &BoundingBox) -> Result<StatesResponse, TrafficError>;
}

#[derive(Clone)]
pub struct OpenSkyClient {
    url: String,
    client: reqwest::Client,
}

impl OpenSkyClient {
    /// Client with a request timeout. Fails if the TLS backend cannot be
    /// initialised.
    pub fn new(url: &str) -> Result<Self, TrafficError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(OpenSkyClient {
            url: url.to_string(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl TrafficSource for OpenSkyClient {
    async fn fetch_states(&self, bbox: &BoundingBox) -> Result<StatesResponse, TrafficError> {
        let response = self
            .client
            .get(&self.url)
            .query(&query_params(bbox))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TrafficError::Status(response.status()));
        }
        Ok(response.json::<StatesResponse>().await?)
    }
}
