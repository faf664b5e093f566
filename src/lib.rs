//! Client library for a self-hosted LLM inference server.
//!
//! Wraps the server's REST surface (model listing, load/unload, token
//! counting, parameter schemas) and its newline-delimited JSON streaming
//! `/query` endpoint, and keeps the client-side state around them: tunable
//! parameter overrides, the current model snapshot, persisted preferences,
//! and a local saved-prompt table.

pub mod client;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod params;
pub mod prefs;
pub mod prompts;
pub mod session;

pub use client::{ApiClient, LlmClient, QueryClient, QueryRequest};
pub use config::{ClientConfig, DEFAULT_SERVER_URL};
pub use error::{LlmError, Result};
pub use models::{
    ContextUsage, ModelLoadResult, ModelStatus, ParamValue, ParameterSchema, PromptFormat,
    StreamEvent, TokenCount, ValueType,
};
pub use params::{ParameterKind, ParameterStore};
pub use prefs::Preferences;
pub use prompts::{PromptStore, SavedPrompt};
pub use session::LlmSession;
