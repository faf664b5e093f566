use crate::{
    client::{LlmClient, QueryRequest},
    config::ClientConfig,
    error::{LlmError, Result},
    models::{ContextUsage, ModelLoadResult, ModelStatus, ParamValue, PromptFormat, StreamEvent},
    params::{ParameterKind, ParameterStore},
    prefs::Preferences,
};
use futures::StreamExt;
use std::collections::HashMap;

/// Single owner of client-side state: preferences, the HTTP client, the
/// parameter store, and the latest server snapshots. All operations on the
/// parameter maps go through this type, which satisfies the
/// single-writer-per-family rule; only immutable snapshots are handed to
/// spawned request tasks.
///
/// Every failure is recorded as a short human-readable status message and
/// none is fatal: the caller stays interactive and may retry.
pub struct LlmSession {
    prefs: Preferences,
    client: LlmClient,
    params: ParameterStore,
    available_models: Vec<String>,
    status: ModelStatus,
    context_usage: Option<ContextUsage>,
    prompt_format: Option<PromptFormat>,
    /// The exact overrides sent with the most recent successful model load.
    loading_overrides_in_use: Option<HashMap<String, ParamValue>>,
    status_message: String,
}

impl LlmSession {
    /// Build a session from the persisted server URL.
    pub fn new() -> Result<Self> {
        Self::with_preferences(Preferences::load_default()?)
    }

    pub fn with_preferences(prefs: Preferences) -> Result<Self> {
        let client = LlmClient::new(ClientConfig::new(prefs.server_url()))?;
        Ok(Self {
            prefs,
            client,
            params: ParameterStore::new(),
            available_models: Vec::new(),
            status: ModelStatus::default(),
            context_usage: None,
            prompt_format: None,
            loading_overrides_in_use: None,
            status_message: "Please configure server address in settings".to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        self.prefs.server_url()
    }

    pub fn status(&self) -> &ModelStatus {
        &self.status
    }

    pub fn available_models(&self) -> &[String] {
        &self.available_models
    }

    pub fn context_usage(&self) -> Option<&ContextUsage> {
        self.context_usage.as_ref()
    }

    pub fn prompt_format(&self) -> Option<&PromptFormat> {
        self.prompt_format.as_ref()
    }

    pub fn loading_overrides_in_use(&self) -> Option<&HashMap<String, ParamValue>> {
        self.loading_overrides_in_use.as_ref()
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn parameters(&self) -> &ParameterStore {
        &self.params
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterStore {
        &mut self.params
    }

    /// Persist a new server URL and rebuild the client against it. Cached
    /// schemas and snapshots belong to the old server and are dropped. With
    /// `auto_connect`, immediately refresh models, the loading-parameter
    /// schema, and the model status (best effort; failures land in the
    /// status message).
    pub async fn set_server_url(&mut self, url: &str, auto_connect: bool) -> Result<()> {
        self.prefs.set_server_url(url)?;
        self.client = LlmClient::new(ClientConfig::new(url))?;
        self.params.clear();
        self.available_models.clear();
        self.status = ModelStatus::default();
        self.context_usage = None;
        self.prompt_format = None;
        self.loading_overrides_in_use = None;
        log::info!("Server URL updated to {}", url);

        if auto_connect {
            self.status_message = "Connecting to server...".to_string();
            let _ = self.refresh_models().await;
            let _ = self.fetch_loading_parameters().await;
            let _ = self.refresh_status().await;
        }
        Ok(())
    }

    /// Probe `/server/ping` with a short timeout.
    pub async fn ping(&self) -> Result<bool> {
        self.client.api().ping().await
    }

    pub async fn refresh_models(&mut self) -> Result<&[String]> {
        match self.client.api().fetch_models().await {
            Ok(models) => {
                self.status_message = if models.is_empty() {
                    "No models found. Please check server configuration.".to_string()
                } else {
                    format!("{} models loaded", models.len())
                };
                self.available_models = models;
                Ok(&self.available_models)
            }
            Err(e) => {
                self.status_message = format!("Error loading models: {}", e);
                Err(e)
            }
        }
    }

    pub async fn refresh_status(&mut self) -> Result<&ModelStatus> {
        match self.client.api().model_status().await {
            Ok(status) => {
                self.apply_status(status);
                if self.status_message == "Please configure server address in settings"
                    || self.status_message == "Connecting to server..."
                {
                    self.status_message.clear();
                }
                Ok(&self.status)
            }
            Err(e) => {
                self.status_message = format!("Error checking model status: {}", e);
                Err(e)
            }
        }
    }

    pub(crate) fn apply_status(&mut self, status: ModelStatus) {
        if status.loaded {
            self.status = status;
        } else {
            // Nothing loaded: any previously displayed model and usage data
            // is stale.
            self.status = ModelStatus::default();
            self.context_usage = None;
        }
    }

    /// Record the model the user is working with. Routing through the
    /// parameter store enforces per-model override isolation; if the switch
    /// emptied the maps and schemas are cached, they are reseeded with the
    /// new model's defaults.
    pub fn select_model(&mut self, model: &str) {
        self.params.select_model(model);
        for kind in [ParameterKind::Loading, ParameterKind::Inference] {
            if self.params.has_schema(kind) && self.params.overrides(kind).is_empty() {
                self.params.reset_to_defaults(kind, Some(model));
            }
        }
    }

    pub async fn fetch_loading_parameters(&mut self) -> Result<()> {
        match self.client.api().loading_parameters().await {
            Ok(response) => {
                self.params.ingest_loading_schema(response);
                Ok(())
            }
            Err(e) => {
                self.status_message = format!("Error loading parameters: {}", e);
                Err(e)
            }
        }
    }

    pub async fn fetch_inference_parameters(&mut self, model: Option<&str>) -> Result<()> {
        match self.client.api().inference_parameters(model).await {
            Ok(response) => {
                self.params.ingest_inference_schema(response);
                Ok(())
            }
            Err(e) => {
                self.status_message = format!("Error loading inference parameters: {}", e);
                Err(e)
            }
        }
    }

    pub async fn fetch_prompt_format(&mut self, model: Option<&str>) -> Result<&PromptFormat> {
        let target = model.or(self.status.current_model.as_deref());
        match self.client.api().prompt_format(target).await {
            Ok(format) => Ok(&*self.prompt_format.insert(format)),
            Err(e) => {
                self.prompt_format = None;
                Err(e)
            }
        }
    }

    /// Load a model, sending the current loading-parameter overrides with
    /// the request.
    pub async fn load_model(&mut self, model: &str) -> Result<ModelLoadResult> {
        self.status_message = "Loading model...".to_string();
        self.select_model(model);
        let overrides: HashMap<String, ParamValue> =
            self.params.overrides(ParameterKind::Loading).as_ref().clone();

        match self.client.api().load_model(model, &overrides).await {
            Ok(result) => {
                self.status = ModelStatus {
                    loaded: true,
                    current_model: Some(model.to_string()),
                    context_length: result.context_length,
                };
                self.loading_overrides_in_use = Some(overrides);
                self.status_message = result.message.clone();
                Ok(result)
            }
            Err(e) => {
                self.status_message = format!("Error: {}", e);
                Err(e)
            }
        }
    }

    pub async fn unload_model(&mut self) -> Result<String> {
        self.status_message = "Unloading model...".to_string();
        match self.client.api().unload_model().await {
            Ok(message) => {
                self.status = ModelStatus::default();
                self.loading_overrides_in_use = None;
                self.context_usage = None;
                self.status_message = message.clone();
                Ok(message)
            }
            Err(e) => {
                self.status_message = format!("Error: {}", e);
                Err(e)
            }
        }
    }

    /// Count tokens for the given text against the loaded model and record
    /// the advisory usage numbers. Checked client-side: without a model there
    /// is no round trip.
    pub async fn update_context_usage(&mut self, text: &str) -> Result<Option<ContextUsage>> {
        let model = match &self.status.current_model {
            Some(model) => model.clone(),
            None => return Err(LlmError::Precondition("No model selected".into())),
        };

        match self.client.api().count_tokens(text, &model).await {
            Ok(count) => {
                self.context_usage = count.context_usage.clone();
                Ok(count.context_usage)
            }
            Err(e) => {
                self.context_usage = None;
                Err(e)
            }
        }
    }

    /// Submit a streaming prompt. Returns immediately after the precondition
    /// check; `on_event` is invoked from a background task, in order, once
    /// per delivered event. The caller marshals to its own thread if needed.
    pub fn send_prompt(
        &mut self,
        prompt: &str,
        system_prompt: &str,
        mut on_event: impl FnMut(StreamEvent) + Send + 'static,
    ) -> Result<()> {
        let model = match (self.status.loaded, &self.status.current_model) {
            (true, Some(model)) => model.clone(),
            _ => {
                self.status_message = "Please load a model first".to_string();
                return Err(LlmError::Precondition("Please load a model first".into()));
            }
        };

        let overrides: HashMap<String, ParamValue> = self
            .params
            .overrides(ParameterKind::Inference)
            .as_ref()
            .clone();
        let request = QueryRequest::new(prompt, model)
            .with_system_prompt(system_prompt)
            .with_overrides(overrides);

        let mut stream = self.client.query().query(request);
        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                let terminal = event.is_terminal();
                on_event(event);
                if terminal {
                    break;
                }
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn session() -> LlmSession {
        let dir = tempdir().unwrap();
        let prefs = Preferences::load_from(dir.path().join("preferences.json"));
        LlmSession::with_preferences(prefs).unwrap()
    }

    #[tokio::test]
    async fn test_send_prompt_requires_loaded_model() {
        let mut session = session();
        let result = session.send_prompt("hi", "", |_| {});
        assert!(matches!(result, Err(LlmError::Precondition(_))));
        assert_eq!(session.status_message(), "Please load a model first");
    }

    #[tokio::test]
    async fn test_context_usage_requires_model() {
        let mut session = session();
        let result = session.update_context_usage("some text").await;
        assert!(matches!(result, Err(LlmError::Precondition(_))));
    }

    #[tokio::test]
    async fn test_unloaded_status_clears_model_and_usage() {
        let mut session = session();
        session.status = ModelStatus {
            loaded: true,
            current_model: Some("llama-7b".to_string()),
            context_length: Some(4096),
        };
        session.context_usage = Some(ContextUsage {
            token_count: 10,
            max_context: 4096,
            usage_percentage: 0.2,
            remaining_tokens: 4086,
        });

        session.apply_status(ModelStatus {
            loaded: false,
            current_model: None,
            context_length: None,
        });

        assert!(!session.status().loaded);
        assert!(session.status().current_model.is_none());
        assert!(session.status().context_length.is_none());
        assert!(session.context_usage().is_none());
    }

    #[tokio::test]
    async fn test_server_url_change_drops_cached_state() {
        let dir = tempdir().unwrap();
        let prefs = Preferences::load_from(dir.path().join("preferences.json"));
        let mut session = LlmSession::with_preferences(prefs).unwrap();

        let schema = serde_json::from_value(serde_json::json!({
            "global_defaults": {
                "n_ctx": {"default": 2048, "type": "integer", "description": ""}
            },
            "model_specific": {}
        }))
        .unwrap();
        session.select_model("llama-7b");
        session.parameters_mut().ingest_loading_schema(schema);
        session.parameters_mut().set_override(
            ParameterKind::Loading,
            "n_ctx",
            ParamValue::Int(1024),
        );
        session.available_models = vec!["llama-7b".to_string()];
        session.status = ModelStatus {
            loaded: true,
            current_model: Some("llama-7b".to_string()),
            context_length: Some(4096),
        };
        session.context_usage = Some(ContextUsage {
            token_count: 10,
            max_context: 4096,
            usage_percentage: 0.2,
            remaining_tokens: 4086,
        });

        session
            .set_server_url("http://other:5000", false)
            .await
            .unwrap();

        // Everything learned from the old server is gone.
        assert_eq!(session.server_url(), "http://other:5000");
        assert!(!session.parameters().has_schema(ParameterKind::Loading));
        assert!(!session.parameters().has_schema(ParameterKind::Inference));
        assert!(session
            .parameters()
            .overrides(ParameterKind::Loading)
            .is_empty());
        assert!(session.available_models().is_empty());
        assert!(!session.status().loaded);
        assert!(session.status().current_model.is_none());
        assert!(session.context_usage().is_none());
        assert!(session.prompt_format().is_none());
        assert!(session.loading_overrides_in_use().is_none());
    }

    #[tokio::test]
    async fn test_select_model_reseeds_after_switch() {
        let mut session = session();
        let schema = serde_json::from_value(serde_json::json!({
            "global_defaults": {
                "n_ctx": {"default": 2048, "type": "integer", "description": ""}
            },
            "model_specific": {
                "model-b": {
                    "n_ctx": {"default": 8192, "type": "integer", "description": ""}
                }
            }
        }))
        .unwrap();

        session.select_model("model-a");
        session.parameters_mut().ingest_loading_schema(schema);
        session.parameters_mut().set_override(
            ParameterKind::Loading,
            "n_ctx",
            ParamValue::Int(1024),
        );

        session.select_model("model-b");
        assert_eq!(
            session
                .parameters()
                .effective_value(ParameterKind::Loading, "n_ctx")
                .unwrap(),
            ParamValue::Int(8192)
        );
    }
}
