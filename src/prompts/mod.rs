//! Local saved-prompt storage: a small CRUD table behind a backend trait.

pub mod file;
pub mod memory;
pub mod traits;

use crate::error::{LlmError, Result};
use directories::ProjectDirs;
use std::path::PathBuf;
use std::sync::Arc;

pub use file::FilePromptStorage;
pub use memory::MemoryPromptStorage;
pub use traits::{PromptStorage, SavedPrompt};

/// Saved-prompt store over a chosen backend.
#[derive(Clone)]
pub struct PromptStore {
    backend: Arc<dyn PromptStorage>,
}

impl PromptStore {
    pub fn with_backend(backend: Arc<dyn PromptStorage>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::with_backend(Arc::new(MemoryPromptStorage::new()))
    }

    pub fn open_file(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::with_backend(Arc::new(FilePromptStorage::open(
            path,
        )?)))
    }

    /// File-backed store in the platform data directory.
    pub fn open_default() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "llmlink")
            .ok_or_else(|| LlmError::Config("no home directory available".into()))?;
        Self::open_file(dirs.data_dir().join("prompts.json"))
    }

    pub async fn create(&self, name: &str, content: &str) -> Result<SavedPrompt> {
        self.backend.create(name, content).await
    }

    pub async fn get(&self, id: u64) -> Result<Option<SavedPrompt>> {
        self.backend.get(id).await
    }

    pub async fn update(&self, id: u64, name: &str, content: &str) -> Result<SavedPrompt> {
        self.backend.update(id, name, content).await
    }

    pub async fn delete(&self, id: u64) -> Result<bool> {
        self.backend.delete(id).await
    }

    pub async fn delete_batch(&self, ids: &[u64]) -> Result<usize> {
        self.backend.delete_batch(ids).await
    }

    pub async fn list(&self) -> Result<Vec<SavedPrompt>> {
        self.backend.list().await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SavedPrompt>> {
        self.backend.search(query).await
    }

    pub async fn count(&self) -> Result<usize> {
        self.backend.count().await
    }
}
