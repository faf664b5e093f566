use crate::models::{ParamValue, StreamDecoder, StreamEvent};
use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// A prompt-completion request for the streaming `/query` endpoint.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub prompt: String,
    pub system_prompt: String,
    pub model: String,
    /// Inference-parameter overrides, flattened into the request body.
    pub overrides: HashMap<String, ParamValue>,
}

impl QueryRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: String::new(),
            model: model.into(),
            overrides: HashMap::new(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_overrides(mut self, overrides: HashMap<String, ParamValue>) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Streaming query client.
///
/// `query` returns immediately; the request runs on a spawned task that
/// pushes decoded events through a channel, so events for one request are
/// strictly ordered and never delivered concurrently. Failures surface as a
/// single terminal [`StreamEvent::Error`], never as a `Result`. Dropping the
/// returned stream is the only way to stop an in-flight request.
#[derive(Clone)]
pub struct QueryClient {
    client: Client,
    base_url: String,
}

impl QueryClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub fn query(&self, request: QueryRequest) -> ReceiverStream<StreamEvent> {
        let (tx, rx) = mpsc::channel(32);
        let client = self.client.clone();
        let url = format!("{}/query", self.base_url);

        tokio::spawn(async move {
            Self::run(client, url, request, tx).await;
        });

        ReceiverStream::new(rx)
    }

    async fn run(
        client: Client,
        url: String,
        request: QueryRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) {
        log::info!("Streaming query to model '{}'", request.model);
        let body = build_query_body(&request);

        let response = match client.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let _ = tx
                .send(StreamEvent::Error(format!(
                    "Server error: {}",
                    status.as_u16()
                )))
                .await;
            return;
        }

        let mut decoder = StreamDecoder::new();
        let mut body_stream = response.bytes_stream();

        while let Some(chunk) = body_stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                    return;
                }
            };
            for event in decoder.feed(&chunk) {
                if tx.send(event).await.is_err() {
                    // Receiver dropped; abandon the connection.
                    return;
                }
            }
            if decoder.is_finished() {
                // Terminal event seen; stop reading and drop the connection.
                return;
            }
        }

        for event in decoder.finish() {
            if tx.send(event).await.is_err() {
                return;
            }
        }

        // A body whose lines were all skipped ends silently; only a body
        // that never carried a byte is reported as an error.
        if !decoder.saw_input() {
            let _ = tx.send(StreamEvent::Error("Empty response".into())).await;
        }
    }
}

fn build_query_body(request: &QueryRequest) -> Value {
    let mut body = Map::new();
    body.insert("prompt".to_string(), json!(request.prompt));
    body.insert("system_prompt".to_string(), json!(request.system_prompt));
    body.insert("model".to_string(), json!(request.model));
    body.insert("stream".to_string(), json!(true));
    for (name, value) in &request.overrides {
        body.insert(
            name.clone(),
            serde_json::to_value(value).unwrap_or(Value::Null),
        );
    }
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_body_flattens_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert("temperature".to_string(), ParamValue::Float(0.9));
        overrides.insert("top_k".to_string(), ParamValue::Int(40));

        let request = QueryRequest::new("Hello", "llama-7b")
            .with_system_prompt("You are terse.")
            .with_overrides(overrides);
        let body = build_query_body(&request);

        assert_eq!(body["prompt"], "Hello");
        assert_eq!(body["system_prompt"], "You are terse.");
        assert_eq!(body["model"], "llama-7b");
        assert_eq!(body["stream"], true);
        assert_eq!(body["temperature"], 0.9);
        assert_eq!(body["top_k"], 40);
    }
}
