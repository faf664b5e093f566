use crate::error::{LlmError, Result};
use crate::prompts::traits::{matches_query, sort_by_recency, PromptStorage, SavedPrompt};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    prompts: HashMap<u64, SavedPrompt>,
}

/// In-memory backend; nothing survives a restart. Used by tests and as a
/// fallback when no data directory is available.
#[derive(Debug, Default)]
pub struct MemoryPromptStorage {
    state: Mutex<MemoryState>,
}

impl MemoryPromptStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PromptStorage for MemoryPromptStorage {
    async fn create(&self, name: &str, content: &str) -> Result<SavedPrompt> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let now = Utc::now();
        let prompt = SavedPrompt {
            id: state.next_id,
            name: name.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.prompts.insert(prompt.id, prompt.clone());
        Ok(prompt)
    }

    async fn get(&self, id: u64) -> Result<Option<SavedPrompt>> {
        let state = self.state.lock().await;
        Ok(state.prompts.get(&id).cloned())
    }

    async fn update(&self, id: u64, name: &str, content: &str) -> Result<SavedPrompt> {
        let mut state = self.state.lock().await;
        let prompt = state
            .prompts
            .get_mut(&id)
            .ok_or_else(|| LlmError::Storage(format!("no saved prompt with id {}", id)))?;
        prompt.name = name.to_string();
        prompt.content = content.to_string();
        prompt.updated_at = Utc::now();
        Ok(prompt.clone())
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let mut state = self.state.lock().await;
        Ok(state.prompts.remove(&id).is_some())
    }

    async fn delete_batch(&self, ids: &[u64]) -> Result<usize> {
        let mut state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter(|id| state.prompts.remove(*id).is_some())
            .count())
    }

    async fn list(&self) -> Result<Vec<SavedPrompt>> {
        let state = self.state.lock().await;
        let mut prompts: Vec<SavedPrompt> = state.prompts.values().cloned().collect();
        sort_by_recency(&mut prompts);
        Ok(prompts)
    }

    async fn search(&self, query: &str) -> Result<Vec<SavedPrompt>> {
        let state = self.state.lock().await;
        let mut prompts: Vec<SavedPrompt> = state
            .prompts
            .values()
            .filter(|prompt| matches_query(prompt, query))
            .cloned()
            .collect();
        sort_by_recency(&mut prompts);
        Ok(prompts)
    }

    async fn count(&self) -> Result<usize> {
        let state = self.state.lock().await;
        Ok(state.prompts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get() {
        let storage = MemoryPromptStorage::new();
        let prompt = storage.create("greeting", "Say hello").await.unwrap();
        assert_eq!(prompt.id, 1);

        let fetched = storage.get(prompt.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "greeting");
        assert_eq!(fetched.content, "Say hello");
        assert!(storage.get(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_bumps_recency() {
        let storage = MemoryPromptStorage::new();
        let first = storage.create("a", "alpha").await.unwrap();
        let _second = storage.create("b", "beta").await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        storage.update(first.id, "a", "alpha edited").await.unwrap();

        let listed = storage.list().await.unwrap();
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[0].content, "alpha edited");
        assert_eq!(listed[0].created_at, first.created_at);
        assert!(listed[0].updated_at > first.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_is_storage_error() {
        let storage = MemoryPromptStorage::new();
        assert!(matches!(
            storage.update(42, "x", "y").await,
            Err(LlmError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_search_matches_name_and_content_case_insensitive() {
        let storage = MemoryPromptStorage::new();
        storage.create("Summarize", "Summarize this text").await.unwrap();
        storage.create("translate", "Translate to French").await.unwrap();
        storage.create("other", "nothing relevant").await.unwrap();

        let hits = storage.search("SUMMAR").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Summarize");

        let hits = storage.search("french").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "translate");
    }

    #[tokio::test]
    async fn test_delete_and_batch_delete() {
        let storage = MemoryPromptStorage::new();
        let a = storage.create("a", "").await.unwrap();
        let b = storage.create("b", "").await.unwrap();
        let c = storage.create("c", "").await.unwrap();

        assert!(storage.delete(a.id).await.unwrap());
        assert!(!storage.delete(a.id).await.unwrap());

        let removed = storage.delete_batch(&[b.id, c.id, 999]).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(storage.count().await.unwrap(), 0);
    }
}
