use serde::{Deserialize, Serialize};

/// Snapshot of what the server currently has loaded. Pulled on demand after
/// state-changing operations; the server does not push changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelStatus {
    pub loaded: bool,
    pub current_model: Option<String>,
    pub context_length: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelLoadResult {
    pub model: String,
    pub context_length: Option<u64>,
    pub message: String,
}

/// Advisory context-window usage reported by `/count_tokens`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextUsage {
    pub token_count: u64,
    pub max_context: u64,
    pub usage_percentage: f64,
    pub remaining_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCount {
    pub text: String,
    pub model: String,
    pub context_usage: Option<ContextUsage>,
}

/// Prompt-formatting prefixes and suffixes declared by the server for a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptFormat {
    pub model: String,
    #[serde(default)]
    pub pre_prompt_prefix: String,
    #[serde(default)]
    pub pre_prompt_suffix: String,
    #[serde(default)]
    pub input_prefix: String,
    #[serde(default)]
    pub input_suffix: String,
    #[serde(default)]
    pub assistant_prefix: String,
    #[serde(default)]
    pub assistant_suffix: String,
}

impl PromptFormat {
    /// Labeled non-empty affixes, for display.
    pub fn available_affixes(&self) -> Vec<(&'static str, &str)> {
        let candidates: [(&'static str, &str); 6] = [
            ("System Prefix", &self.pre_prompt_prefix),
            ("System Suffix", &self.pre_prompt_suffix),
            ("User Prefix", &self.input_prefix),
            ("User Suffix", &self.input_suffix),
            ("Assistant Prefix", &self.assistant_prefix),
            ("Assistant Suffix", &self.assistant_suffix),
        ];
        candidates
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .collect()
    }
}
