use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error: {status}")]
    Server { status: u16 },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            LlmError::Server {
                status: status.as_u16(),
            }
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for LlmError {
    fn from(err: std::io::Error) -> Self {
        LlmError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
