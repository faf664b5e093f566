use crate::{
    error::{LlmError, Result},
    models::{
        ContextUsage, InferenceParametersResponse, LoadingParametersResponse, ModelLoadResult,
        ModelStatus, ParamValue, PromptFormat, TokenCount,
    },
};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::Duration;

/// One-shot REST endpoints of the inference server. Each call opens an
/// independent request; nothing is retried or coalesced at this layer.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /models`
    pub async fn fetch_models(&self) -> Result<Vec<String>> {
        log::debug!("Fetching models from {}/models", self.base_url);
        let body = self.get("/models", &[]).await?;

        let models = body
            .get("models")
            .and_then(Value::as_array)
            .ok_or_else(|| LlmError::Decode("missing 'models' array".into()))?
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect::<Vec<_>>();

        log::debug!("Server reports {} models", models.len());
        Ok(models)
    }

    /// `GET /model/status`
    pub async fn model_status(&self) -> Result<ModelStatus> {
        let body = self.get("/model/status", &[]).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// `POST /model/load` with the model name plus any loading-parameter
    /// overrides flattened into the request body.
    pub async fn load_model(
        &self,
        model: &str,
        overrides: &HashMap<String, ParamValue>,
    ) -> Result<ModelLoadResult> {
        let mut body = Map::new();
        body.insert("model".to_string(), json!(model));
        for (name, value) in overrides {
            body.insert(name.clone(), serde_json::to_value(value)?);
        }

        log::info!("Loading model '{}' ({} overrides)", model, overrides.len());
        let response = self.post("/model/load", Value::Object(body)).await?;

        let message = response
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Model loaded successfully")
            .to_string();
        let context_length = response
            .get("loading_parameters")
            .and_then(|params| params.get("n_ctx"))
            .and_then(Value::as_u64);

        Ok(ModelLoadResult {
            model: model.to_string(),
            context_length,
            message,
        })
    }

    /// `POST /model/unload`
    pub async fn unload_model(&self) -> Result<String> {
        log::info!("Unloading current model");
        let response = self.post("/model/unload", json!({})).await?;
        Ok(response
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Model unloaded successfully")
            .to_string())
    }

    /// `POST /count_tokens`
    pub async fn count_tokens(&self, text: &str, model: &str) -> Result<TokenCount> {
        let response = self
            .post("/count_tokens", json!({"text": text, "model": model}))
            .await?;

        let model = response
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(model)
            .to_string();
        let context_usage = match response.get("context_usage") {
            Some(usage) if !usage.is_null() => {
                Some(serde_json::from_value::<ContextUsage>(usage.clone())?)
            }
            _ => None,
        };

        Ok(TokenCount {
            text: text.to_string(),
            model,
            context_usage,
        })
    }

    /// `GET /model/parameters[?model=]`
    pub async fn prompt_format(&self, model: Option<&str>) -> Result<PromptFormat> {
        let query: Vec<(&str, &str)> = model.map(|m| ("model", m)).into_iter().collect();
        let body = self.get("/model/parameters", &query).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// `GET /model/loading-parameters`
    pub async fn loading_parameters(&self) -> Result<LoadingParametersResponse> {
        let body = self.get("/model/loading-parameters", &[]).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// `GET /model/inference-parameters[?model=]`
    pub async fn inference_parameters(
        &self,
        model: Option<&str>,
    ) -> Result<InferenceParametersResponse> {
        let query: Vec<(&str, &str)> = model.map(|m| ("model", m)).into_iter().collect();
        let body = self.get("/model/inference-parameters", &query).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// `GET /server/ping` connectivity probe. Uses its own short-timeout
    /// client so an unreachable host fails fast instead of hanging for the
    /// normal connect timeout.
    pub async fn ping(&self) -> Result<bool> {
        let probe = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        let response = probe
            .get(format!("{}/server/ping", self.base_url))
            .send()
            .await?;

        if response.status().is_success() {
            log::debug!("Server ping successful");
            Ok(true)
        } else {
            log::warn!("Server ping failed with status {}", response.status());
            Ok(false)
        }
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await?;

        Self::decode_response(path, response).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await?;

        Self::decode_response(path, response).await
    }

    async fn decode_response(path: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            log::warn!("{} returned {}", path, status);
            return Err(LlmError::Server {
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| LlmError::Decode(format!("{}: {}", path, e)))
    }
}
