use crate::error::{LlmError, Result};
use crate::prompts::traits::{matches_query, sort_by_recency, PromptStorage, SavedPrompt};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug, Default, Serialize, Deserialize)]
struct FileState {
    next_id: u64,
    prompts: Vec<SavedPrompt>,
}

/// JSON-file backend. The whole table is loaded on open and rewritten on
/// every mutation; prompt collections are small enough that this stays
/// simpler than an embedded database.
#[derive(Debug)]
pub struct FilePromptStorage {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl FilePromptStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| LlmError::Storage(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileState::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    fn persist(path: &Path, state: &FileState) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(state)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

#[async_trait]
impl PromptStorage for FilePromptStorage {
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
        state.prompts.push(prompt.clone());
        Self::persist(&self.path, &state)?;
        Ok(prompt)
    }

    async fn get(&self, id: u64) -> Result<Option<SavedPrompt>> {
        let state = self.state.lock().await;
        Ok(state.prompts.iter().find(|p| p.id == id).cloned())
    }

    async fn update(&self, id: u64, name: &str, content: &str) -> Result<SavedPrompt> {
        let mut state = self.state.lock().await;
        let prompt = state
            .prompts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| LlmError::Storage(format!("no saved prompt with id {}", id)))?;
        prompt.name = name.to_string();
        prompt.content = content.to_string();
        prompt.updated_at = Utc::now();
        let updated = prompt.clone();
        Self::persist(&self.path, &state)?;
        Ok(updated)
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let mut state = self.state.lock().await;
        let before = state.prompts.len();
        state.prompts.retain(|p| p.id != id);
        let removed = state.prompts.len() != before;
        if removed {
            Self::persist(&self.path, &state)?;
        }
        Ok(removed)
    }

    async fn delete_batch(&self, ids: &[u64]) -> Result<usize> {
        let mut state = self.state.lock().await;
        let before = state.prompts.len();
        state.prompts.retain(|p| !ids.contains(&p.id));
        let removed = before - state.prompts.len();
        if removed > 0 {
            Self::persist(&self.path, &state)?;
        }
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<SavedPrompt>> {
        let state = self.state.lock().await;
        let mut prompts = state.prompts.clone();
        sort_by_recency(&mut prompts);
        Ok(prompts)
    }

    async fn search(&self, query: &str) -> Result<Vec<SavedPrompt>> {
        let state = self.state.lock().await;
        let mut prompts: Vec<SavedPrompt> = state
            .prompts
            .iter()
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
