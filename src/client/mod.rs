pub mod api;
pub mod stream;

use crate::{
    config::ClientConfig,
    error::{LlmError, Result},
};

pub use api::ApiClient;
pub use stream::{QueryClient, QueryRequest};

/// Facade over the server's one-shot and streaming surfaces. Explicitly
/// constructed from a [`ClientConfig`]; no ambient global client exists.
#[derive(Clone)]
pub struct LlmClient {
    api: ApiClient,
    query: QueryClient,
}

impl LlmClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        Ok(Self {
            api: ApiClient::new(client.clone(), config.base_url.clone()),
            query: QueryClient::new(client, config.base_url),
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn query(&self) -> &QueryClient {
        &self.query
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url()
    }
}
