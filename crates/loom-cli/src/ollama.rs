//! Real `ModelConnector` backed by a local Ollama server, grounded on the
//! teacher's `skynet-agent::ollama::OllamaProvider` — the same
//! request/response shapes and the same hand-rolled NDJSON stream parser,
//! adapted from the teacher's `LlmProvider`/`StreamEvent` pair to this
//! crate's `ModelConnector`/`ChatChunk`.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use loom_core::{ChatChunk, ChatRequest, ChatStats, Message, ModelConnector, ModelConnectorError, ModelInfo, Role};

pub struct OllamaConnector {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

fn to_ollama_role(role: Role) -> &'static str {
    match role {
        Role::UserSent => "user",
        Role::Ui => "system",
        _ => "assistant",
    }
}

fn build_request_body(request: &ChatRequest, stream: bool) -> serde_json::Value {
    let messages: Vec<serde_json::Value> = request
        .messages
        .iter()
        .filter(|m: &&Message| m.role.is_visible_persisted())
        .map(|m| {
            serde_json::json!({
                "role": to_ollama_role(m.role),
                "content": m.content,
            })
        })
        .collect();

    serde_json::json!({
        "model": request.model_name,
        "messages": messages,
        "stream": stream,
        "think": request.thinking,
    })
}

#[async_trait]
impl ModelConnector for OllamaConnector {
    async fn stream_chat(&self, request: ChatRequest, tx: mpsc::Sender<ChatChunk>) -> Result<(), ModelConnectorError> {
        let body = build_request_body(&request, true);
        debug!(model = %request.model_name, "sending streaming request to Ollama");

        let response = self
            .client
            .post(self.chat_url())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(connect_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            warn!(status, body = %text, "Ollama streaming API error");
            return Err(ModelConnectorError::Malformed(format!("status {status}: {text}")));
        }

        process_stream(response, tx).await;
        Ok(())
    }

    async fn generate(&self, model_name: &str, prompt: &str) -> Result<String, ModelConnectorError> {
        let body = serde_json::json!({
            "model": model_name,
            "messages": [{"role": "user", "content": prompt}],
            "stream": false,
        });

        let response = self
            .client
            .post(self.chat_url())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(connect_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(ModelConnectorError::Malformed(format!("status {status}")));
        }

        let parsed: OllamaChunk = response
            .json()
            .await
            .map_err(|e| ModelConnectorError::Malformed(e.to_string()))?;
        Ok(parsed.message.content)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ModelConnectorError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await.map_err(connect_error)?;
        if !response.status().is_success() {
            return Err(ModelConnectorError::Unavailable(format!(
                "status {}",
                response.status().as_u16()
            )));
        }
        let parsed: OllamaTagsResponse = response
            .json()
            .await
            .map_err(|e| ModelConnectorError::Malformed(e.to_string()))?;
        Ok(parsed
            .models
            .into_iter()
            .map(|m| ModelInfo {
                model_name: m.name,
                supports_thinking: false,
            })
            .collect())
    }
}

fn connect_error(error: reqwest::Error) -> ModelConnectorError {
    if error.is_connect() || error.is_timeout() {
        ModelConnectorError::Unavailable(error.to_string())
    } else {
        ModelConnectorError::Transport(error.to_string())
    }
}

/// Parses Ollama's newline-delimited JSON streaming format, same
/// buffering approach as the teacher's `process_ollama_stream`: bytes
/// accumulate in a line buffer until a full line is available, since a
/// TCP chunk boundary need not land on a JSON-object boundary.
async fn process_stream(response: reqwest::Response, tx: mpsc::Sender<ChatChunk>) {
    let mut line_buf = String::new();
    let mut byte_stream = response.bytes_stream();

    while let Some(chunk) = byte_stream.next().await {
        let bytes = match chunk {
            Ok(b) => b,
            Err(error) => {
                warn!(%error, "Ollama stream read error");
                return;
            }
        };
        let Ok(text) = std::str::from_utf8(&bytes) else {
            continue;
        };
        line_buf.push_str(text);

        let mut lines: Vec<&str> = line_buf.split('\n').collect();
        let remainder = lines.pop().unwrap_or("").to_string();

        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<OllamaChunk>(line) {
                Ok(parsed) => {
                    if !send_chunk(&tx, &parsed).await {
                        return;
                    }
                }
                Err(error) => warn!(line, %error, "failed to parse Ollama stream chunk"),
            }
        }
        line_buf = remainder;
    }
}

/// Emits a thinking chunk and/or a content chunk for one decoded line,
/// returns `false` if the receiver has gone away.
async fn send_chunk(tx: &mpsc::Sender<ChatChunk>, parsed: &OllamaChunk) -> bool {
    if !parsed.message.thinking.is_empty() {
        let thinking = ChatChunk {
            text: parsed.message.thinking.clone(),
            is_thinking: true,
            done: false,
            stop_reason: None,
            stats: None,
        };
        if tx.send(thinking).await.is_err() {
            return false;
        }
    }

    let stats = parsed.done.then(|| ChatStats {
        tokens_in: parsed.prompt_eval_count.unwrap_or(0),
        tokens_out: parsed.eval_count.unwrap_or(0),
        duration_ms: parsed.total_duration.unwrap_or(0) / 1_000_000,
    });

    if !parsed.message.content.is_empty() || parsed.done {
        let content = ChatChunk {
            text: parsed.message.content.clone(),
            is_thinking: false,
            done: parsed.done,
            stop_reason: parsed.done.then(|| parsed.done_reason.clone().unwrap_or_else(|| "stop".to_string())),
            stats,
        };
        tx.send(content).await.is_ok()
    } else {
        true
    }
}

#[derive(Debug, Deserialize)]
struct OllamaChunk {
    message: OllamaMessage,
    #[serde(default)]
    done: bool,
    done_reason: Option<String>,
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
    total_duration: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    thinking: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaTagEntry>,
}

#[derive(Debug, Deserialize)]
struct OllamaTagEntry {
    name: String,
}
