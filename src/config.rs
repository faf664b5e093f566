use std::env;
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Connection settings for the inference server.
///
/// Timeouts match the original client: generous read timeout because the
/// streaming endpoint holds the connection open while tokens are produced.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: DEFAULT_SERVER_URL.to_string(),
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        ClientConfig {
            base_url: normalize_base_url(base_url.into()),
            ..Default::default()
        }
    }

    pub fn from_env() -> Self {
        let base_url = env::var("LLM_SERVER_URL")
            .ok()
            .map(normalize_base_url)
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        ClientConfig {
            base_url,
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(base_url.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

fn normalize_base_url(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_SERVER_URL);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.read_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let config = ClientConfig::new("http://10.0.0.5:5000/");
        assert_eq!(config.base_url, "http://10.0.0.5:5000");

        let config = config.with_base_url("http://10.0.0.5:5000//");
        assert_eq!(config.base_url, "http://10.0.0.5:5000");
    }
}
