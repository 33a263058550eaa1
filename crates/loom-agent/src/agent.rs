use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use loom_core::{
    self as core, Agent, AgentError, ChatCall, ChatChunk, ChatRequest, ChatStats, Message, ModelConnector,
    PermissionProvider, Role, StreamSink, Tool,
};

/// Built from the per-request config an `Agent` is handed at construction
/// time: the model connector it drives, the tools it may call, and the
/// permission provider those tools consult. One struct per session,
/// owning one `ChatCall` and a pluggable tool registry.
pub struct SessionAgent {
    chat_call: ChatCall,
    connector: Arc<dyn ModelConnector>,
    tool_registry: Arc<HashMap<String, Arc<dyn Tool>>>,
    permission: Arc<dyn PermissionProvider>,
    system_prompt: Option<String>,
}

impl SessionAgent {
    pub fn new(
        chat_call: ChatCall,
        connector: Arc<dyn ModelConnector>,
        tool_registry: Arc<HashMap<String, Arc<dyn Tool>>>,
        permission: Arc<dyn PermissionProvider>,
        system_prompt: Option<String>,
    ) -> Self {
        Self {
            chat_call,
            connector,
            tool_registry,
            permission,
            system_prompt,
        }
    }

    /// Outbound message array: transient roles filtered, system prompt
    /// prefixed if configured.
    fn build_outbound(&self, history: &[Message]) -> Vec<Message> {
        let mut out = Vec::with_capacity(history.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            out.push(Message::new(Role::Ui, prompt.clone()));
        }
        out.extend(
            history
                .iter()
                .filter(|m| !m.role.is_streaming_scaffolding() && m.role.is_persistable())
                .cloned(),
        );
        out
    }

    fn classify(&self, chunk: &ChatChunk) -> Role {
        if chunk.is_thinking {
            Role::ThinkStream
        } else {
            Role::ContentStream
        }
    }

    fn summary_line(stats: &Option<ChatStats>) -> String {
        match stats {
            Some(s) => format!(
                "{} tokens in, {} tokens out, {}ms",
                s.tokens_in, s.tokens_out, s.duration_ms
            ),
            None => String::new(),
        }
    }
}

#[async_trait]
impl Agent for SessionAgent {
    #[instrument(skip(self, history, new_message, sink, cancel))]
    async fn send_async(
        &mut self,
        history: Vec<Message>,
        new_message: Message,
        sink: &mut dyn StreamSink,
        cancel: CancellationToken,
    ) -> Result<(), AgentError> {
        self.chat_call.reset_cancellation();

        let mut outbound = self.build_outbound(&history);
        outbound.push(new_message);

        let request = ChatRequest {
            model_name: self.chat_call.model_name.clone(),
            options: self.chat_call.options.clone(),
            thinking: self.chat_call.think,
            messages: outbound,
            tool_names: self.chat_call.tool_names.clone(),
        };

        let (tx, mut rx) = mpsc::channel::<ChatChunk>(32);
        let connector = Arc::clone(&self.connector);
        let stream_task = tokio::spawn(async move { connector.stream_chat(request, tx).await });

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    sink.on_chunk(Role::ContentStream, "", true, None);
                    stream_task.abort();
                    return Err(AgentError::Cancelled);
                }
                chunk = rx.recv() => {
                    match chunk {
                        Some(chunk) => {
                            let role = self.classify(&chunk);
                            if chunk.text.is_empty() && chunk.done {
                                sink.on_chunk(role, "", true, chunk.stats.clone());
                            } else {
                                sink.on_chunk(role, &chunk.text, chunk.done, chunk.stats.clone());
                            }
                            if chunk.done {
                                sink.on_message(Message::new(Role::Done, ""));
                                sink.on_message(Message::new(Role::Ui, Self::summary_line(&chunk.stats)));
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        match stream_task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => {
                warn!(%error, "model connector reported an error after streaming completed");
                Err(AgentError::ModelCall(error.to_string()))
            }
            Err(join_error) if join_error.is_cancelled() => Err(AgentError::Cancelled),
            Err(join_error) => Err(AgentError::ModelCall(join_error.to_string())),
        }
    }

    fn chat_call(&self) -> &ChatCall {
        &self.chat_call
    }

    fn chat_call_mut(&mut self) -> &mut ChatCall {
        &mut self.chat_call
    }

    fn replace_chat_call(&mut self, call: ChatCall) {
        self.chat_call = call;
    }

    fn rebuild_tools(&mut self, enabled_tool_names: &[String]) {
        self.chat_call.tool_names = enabled_tool_names
            .iter()
            .filter(|name| self.tool_registry.contains_key(*name))
            .cloned()
            .collect();
    }
}

/// Builds a [`core::ToolContext`] for a tool invocation during a request
/// cycle. Kept free-standing since tool execution is driven by whichever
/// concrete connector surfaces a tool call — the wire shape of "the model
/// asked for tool X" is connector-specific and out of scope here.
pub fn tool_context<'a>(session_fid: &'a str, permission: &'a dyn PermissionProvider) -> core::ToolContext<'a> {
    core::ToolContext { session_fid, permission }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{AlwaysFailConnector, AlwaysOkConnector};
    use loom_core::{DenyAllPermissions, ModelUsage};

    #[derive(Default)]
    struct RecordingSink {
        chunks: Vec<(Role, String, bool)>,
        messages: Vec<Message>,
    }

    impl StreamSink for RecordingSink {
        fn on_chunk(&mut self, role: Role, text: &str, done: bool, _stats: Option<ChatStats>) {
            self.chunks.push((role, text.to_string(), done));
        }

        fn on_message(&mut self, message: Message) {
            self.messages.push(message);
        }
    }

    fn agent_with(connector: impl ModelConnector + 'static) -> SessionAgent {
        let usage = ModelUsage::new("local", "llama3");
        SessionAgent::new(
            ChatCall::new(&usage, Vec::new()),
            Arc::new(connector),
            Arc::new(HashMap::new()),
            Arc::new(DenyAllPermissions),
            None,
        )
    }

    #[tokio::test]
    async fn scenario_b_streams_thinking_then_content() {
        let mut agent = agent_with(AlwaysOkConnector::default());
        let mut sink = RecordingSink::default();
        let cancel = CancellationToken::new();

        agent
            .send_async(Vec::new(), Message::user("hi"), &mut sink, cancel)
            .await
            .unwrap();

        assert_eq!(sink.chunks[0].0, Role::ThinkStream);
        assert_eq!(sink.chunks[2].0, Role::ContentStream);
        assert!(sink.chunks.last().unwrap().2, "final chunk marks done");
        assert_eq!(sink.messages.len(), 2, "one done message, one ui message");
        assert_eq!(sink.messages[0].role, Role::Done);
        assert_eq!(sink.messages[1].role, Role::Ui);
    }

    #[tokio::test]
    async fn connector_failure_surfaces_as_model_call_error() {
        let mut agent = agent_with(AlwaysFailConnector);
        let mut sink = RecordingSink::default();
        let cancel = CancellationToken::new();

        let result = agent
            .send_async(Vec::new(), Message::user("hi"), &mut sink, cancel)
            .await;

        assert!(matches!(result, Err(AgentError::ModelCall(_))));
    }

    /// Connector for Scenario D: streams three content chunks, signals a
    /// `Notify` so the test knows they've been sent, then blocks forever —
    /// standing in for a server that keeps the connection open. The test
    /// cancels once the signal fires, so `send_async` is torn down with
    /// chunks already in flight rather than before the stream even starts.
    struct StallingConnector {
        notify: Arc<tokio::sync::Notify>,
    }

    #[async_trait]
    impl ModelConnector for StallingConnector {
        async fn stream_chat(
            &self,
            _request: ChatRequest,
            tx: mpsc::Sender<ChatChunk>,
        ) -> Result<(), loom_core::ModelConnectorError> {
            for text in ["one ", "two ", "three"] {
                let chunk = ChatChunk {
                    text: text.to_string(),
                    is_thinking: false,
                    done: false,
                    stop_reason: None,
                    stats: None,
                };
                if tx.send(chunk).await.is_err() {
                    return Err(loom_core::ModelConnectorError::Cancelled);
                }
                // Give the single-threaded test runtime a chance to drain
                // this chunk into the sink before the next one is queued,
                // so the notify below fires only once all three have
                // actually been observed rather than merely buffered.
                for _ in 0..8 {
                    tokio::task::yield_now().await;
                }
            }
            self.notify.notify_one();
            let (_guard, rx) = tokio::sync::oneshot::channel::<()>();
            let _ = rx.await;
            Ok(())
        }

        async fn generate(&self, _model_name: &str, _prompt: &str) -> Result<String, loom_core::ModelConnectorError> {
            unimplemented!("not exercised by this scenario")
        }

        async fn list_models(&self) -> Result<Vec<loom_core::ModelInfo>, loom_core::ModelConnectorError> {
            unimplemented!("not exercised by this scenario")
        }
    }

    #[tokio::test]
    async fn scenario_d_cancel_mid_stream_finalizes_without_done_or_ui() {
        let notify = Arc::new(tokio::sync::Notify::new());
        let mut agent = agent_with(StallingConnector {
            notify: Arc::clone(&notify),
        });
        let mut sink = RecordingSink::default();
        let cancel = CancellationToken::new();
        let cancel_handle = cancel.clone();

        let send_fut = agent.send_async(Vec::new(), Message::user("hi"), &mut sink, cancel);
        tokio::pin!(send_fut);

        tokio::select! {
            _ = notify.notified() => {}
            _ = &mut send_fut => panic!("send_async completed before three chunks were streamed"),
        }
        cancel_handle.cancel();
        let result = send_fut.await;

        assert!(matches!(result, Err(AgentError::Cancelled)));
        assert_eq!(sink.chunks.len(), 4, "three content chunks plus one finalizing chunk");
        assert_eq!(
            sink.chunks[..3].iter().map(|c| c.1.as_str()).collect::<Vec<_>>(),
            vec!["one ", "two ", "three"]
        );
        let finalizing = &sink.chunks[3];
        assert_eq!(finalizing.1, "");
        assert!(finalizing.2, "finalizing chunk marks done");
        assert!(sink.messages.is_empty(), "no done/ui message on mid-stream cancellation");
    }

    #[tokio::test]
    async fn cancellation_finalizes_without_done_or_ui() {
        let mut agent = agent_with(AlwaysOkConnector::default());
        let mut sink = RecordingSink::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = agent
            .send_async(Vec::new(), Message::user("hi"), &mut sink, cancel)
            .await;

        assert!(matches!(result, Err(AgentError::Cancelled)));
        assert!(sink.messages.is_empty(), "no done/ui message on cancellation");
        assert!(sink.chunks.last().unwrap().2, "a finalizing chunk was still emitted");
    }
}
