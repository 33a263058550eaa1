use tracing::warn;

use loom_core::{Message, ModelConnector, ModelUsage, Role};

const MAX_TITLE_CHARS: usize = 50;

/// Derives a short title for a freshly persisted session.
/// Failure of the model call never fails the surrounding `save`; a local
/// default is always available.
pub struct TitleGenerator;

impl TitleGenerator {
    /// `title_model_usage`/`connector` are `None` when no title model is
    /// configured, in which case the local default is used directly.
    pub async fn generate(
        messages: &[Message],
        title_model_usage: Option<&ModelUsage>,
        connector: Option<&dyn ModelConnector>,
    ) -> String {
        let first_user_sent = messages
            .iter()
            .find(|m| m.role == Role::UserSent)
            .map(|m| m.content.as_str())
            .unwrap_or("");

        if let (Some(usage), Some(connector)) = (title_model_usage, connector) {
            match connector.generate(&usage.model_name, first_user_sent).await {
                Ok(title) => return Self::truncate(title.trim()),
                Err(error) => {
                    warn!(%error, "title model call failed, falling back to local default");
                }
            }
        }

        Self::local_default(first_user_sent)
    }

    fn local_default(first_user_sent: &str) -> String {
        let first_line = first_user_sent.lines().find(|line| !line.trim().is_empty()).unwrap_or("");
        Self::truncate(first_line.trim())
    }

    fn truncate(s: &str) -> String {
        if s.chars().count() <= MAX_TITLE_CHARS {
            s.to_string()
        } else {
            let truncated: String = s.chars().take(MAX_TITLE_CHARS).collect();
            format!("{truncated}…")
        }
    }
}
