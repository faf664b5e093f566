use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A saved prompt. Ids are sequential and assigned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPrompt {
    pub id: u64,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait PromptStorage: Send + Sync {
    async fn create(&self, name: &str, content: &str) -> Result<SavedPrompt>;
    async fn get(&self, id: u64) -> Result<Option<SavedPrompt>>;
    async fn update(&self, id: u64, name: &str, content: &str) -> Result<SavedPrompt>;
    async fn delete(&self, id: u64) -> Result<bool>;
    async fn delete_batch(&self, ids: &[u64]) -> Result<usize>;
    /// All prompts, most recently updated first.
    async fn list(&self) -> Result<Vec<SavedPrompt>>;
    /// Case-insensitive substring match on name or content, recency-ordered.
    async fn search(&self, query: &str) -> Result<Vec<SavedPrompt>>;
    async fn count(&self) -> Result<usize>;
}

pub(crate) fn sort_by_recency(prompts: &mut [SavedPrompt]) {
    prompts.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

pub(crate) fn matches_query(prompt: &SavedPrompt, query: &str) -> bool {
    let query = query.to_lowercase();
    prompt.name.to_lowercase().contains(&query) || prompt.content.to_lowercase().contains(&query)
}
