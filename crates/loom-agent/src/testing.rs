//! Test doubles for `ModelConnector`, in the spirit of `AlwaysFail`/
//! `AlwaysOk` stub providers — generalized here to also drive a canned
//! multi-chunk stream so request-cycle tests don't need a real model
//! server.

use async_trait::async_trait;
use tokio::sync::mpsc;

use loom_core::{ChatChunk, ChatRequest, ChatStats, ModelConnector, ModelConnectorError, ModelInfo};

/// Streams a fixed thinking-then-content response and reports success for
/// `generate`/`list_models`: one thinking segment, one content segment,
/// then done.
#[derive(Default)]
pub struct AlwaysOkConnector {
    pub models: Vec<ModelInfo>,
}

#[async_trait]
impl ModelConnector for AlwaysOkConnector {
    async fn stream_chat(&self, _request: ChatRequest, tx: mpsc::Sender<ChatChunk>) -> Result<(), ModelConnectorError> {
        let chunks = [
            ChatChunk {
                text: "reasoning…".to_string(),
                is_thinking: true,
                done: false,
                stop_reason: None,
                stats: None,
            },
            ChatChunk {
                text: "more".to_string(),
                is_thinking: true,
                done: false,
                stop_reason: None,
                stats: None,
            },
            ChatChunk {
                text: "answer ".to_string(),
                is_thinking: false,
                done: false,
                stop_reason: None,
                stats: None,
            },
            ChatChunk {
                text: "done.".to_string(),
                is_thinking: false,
                done: true,
                stop_reason: Some("stop".to_string()),
                stats: Some(ChatStats {
                    tokens_in: 12,
                    tokens_out: 4,
                    duration_ms: 42,
                }),
            },
        ];
        for chunk in chunks {
            if tx.send(chunk).await.is_err() {
                return Err(ModelConnectorError::Cancelled);
            }
        }
        Ok(())
    }

    async fn generate(&self, _model_name: &str, prompt: &str) -> Result<String, ModelConnectorError> {
        Ok(format!("Title for: {prompt}"))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ModelConnectorError> {
        Ok(self.models.clone())
    }
}

/// Every call fails, for exercising error-propagation paths.
#[derive(Default)]
pub struct AlwaysFailConnector;

#[async_trait]
impl ModelConnector for AlwaysFailConnector {
    async fn stream_chat(&self, _request: ChatRequest, _tx: mpsc::Sender<ChatChunk>) -> Result<(), ModelConnectorError> {
        Err(ModelConnectorError::Unavailable("connector offline".to_string()))
    }

    async fn generate(&self, _model_name: &str, _prompt: &str) -> Result<String, ModelConnectorError> {
        Err(ModelConnectorError::Unavailable("connector offline".to_string()))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ModelConnectorError> {
        Err(ModelConnectorError::Unavailable("connector offline".to_string()))
    }
}
