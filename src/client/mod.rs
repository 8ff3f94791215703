//! reqwest-backed implementations of the asset store and the product API.

mod assets;
mod products;

pub use assets::HttpAssetStore;
pub use products::HttpProductApi;

use std::sync::Arc;

use crate::config::ClientConfig;

/// Shared HTTP client pointed at the shop's API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: Arc::from(config.api_url.trim_end_matches('/')),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}
