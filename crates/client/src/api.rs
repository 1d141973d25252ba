//! REST client for the platform's generation data endpoint.
//!
//! Wraps `GET /api/generation/data` using [`reqwest`]. The reference is
//! encoded as a query string and the JSON body decoded into
//! [`GenerationData`].

use async_trait::async_trait;
use genpanel_core::{GenerationData, GenerationDataReference};

/// Path of the generation data endpoint, relative to the API base URL.
pub const GENERATION_DATA_PATH: &str = "/api/generation/data";

/// Errors from fetching generation data.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("Generation data request failed ({status}): {status_text}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase for the status.
        status_text: String,
    },

    /// The body was not valid generation data.
    #[error("Failed to decode generation data: {0}")]
    Decode(String),
}

/// Anything that can produce generation data for a reference.
///
/// [`GenerationApi`] is the production implementation; the fetcher only
/// depends on this trait.
#[async_trait]
pub trait GenerationDataSource: Send + Sync {
    async fn get_generation_data(
        &self,
        reference: &GenerationDataReference,
    ) -> Result<GenerationData, FetchError>;
}

/// HTTP client for the generation data API.
pub struct GenerationApi {
    client: reqwest::Client,
    api_url: String,
}

impl GenerationApi {
    /// Create a new API client.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://localhost:3000`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (shares the connection pool with the source image resolver).
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { client, api_url }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Fetch generation data for `reference`.
    pub async fn fetch(
        &self,
        reference: &GenerationDataReference,
    ) -> Result<GenerationData, FetchError> {
        let response = self
            .client
            .get(format!("{}{GENERATION_DATA_PATH}", self.api_url))
            .query(&reference.query_pairs())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl GenerationDataSource for GenerationApi {
    async fn get_generation_data(
        &self,
        reference: &GenerationDataReference,
    ) -> Result<GenerationData, FetchError> {
        self.fetch(reference).await
    }
}
