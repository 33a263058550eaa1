use std::collections::HashMap;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use loom_core::{ConfigProvider, ConnectionInfo, ModelInfo, ModelUsage, OptionValue};

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_connection_id() -> String {
    "ollama".to_string()
}

fn default_model_name() -> String {
    "llama3".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConnectionConfig {
    #[serde(default = "default_connection_id")]
    pub connection_id: String,
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub models: Vec<String>,
}

impl Default for OllamaConnectionConfig {
    fn default() -> Self {
        Self {
            connection_id: default_connection_id(),
            base_url: default_ollama_base_url(),
            models: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelConfig {
    #[serde(default = "default_connection_id")]
    pub connection_id: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    /// Name of the connection/model used to generate session titles.
    /// Falls back to the local first-line default when unset.
    pub title_connection_id: Option<String>,
    pub title_model_name: Option<String>,
    #[serde(default)]
    pub options: HashMap<String, OptionValue>,
}

/// Top-level `loom.toml` shape, plus `LOOM_`-prefixed env overrides.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoomConfigData {
    #[serde(default)]
    pub ollama: OllamaConnectionConfig,
    #[serde(default)]
    pub model: ModelConfig,
    /// Tool names explicitly disabled; everything else defaults to on.
    #[serde(default)]
    pub disabled_tools: Vec<String>,
}

/// Loaded configuration, implementing `loom_core::ConfigProvider`. The
/// `changed` channel exists so in-process config mutation (not yet wired
/// to a file watcher) can still notify live sessions the same way the
/// teacher's config layer notifies its websocket clients.
pub struct LoomConfig {
    data: LoomConfigData,
    changed: broadcast::Sender<()>,
}

impl LoomConfig {
    /// Checks, in order: explicit path argument, `LOOM_CONFIG` env var,
    /// `~/.loom/loom.toml`.
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("LOOM_CONFIG").ok())
            .unwrap_or_else(default_config_path);

        let data: LoomConfigData = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("LOOM_").split("_"))
            .extract()
            .unwrap_or_else(|error| {
                tracing::warn!(%error, path = %path, "config load failed, using defaults");
                LoomConfigData::default()
            });

        let (changed, _receiver) = broadcast::channel(16);
        Ok(Self { data, changed })
    }

    pub fn history_root(&self) -> std::path::PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        std::path::PathBuf::from(home).join(".loom").join("history")
    }

    pub fn db_path(&self) -> std::path::PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        std::path::PathBuf::from(home).join(".loom").join("sessions.sqlite3")
    }

    pub fn ollama(&self) -> &OllamaConnectionConfig {
        &self.data.ollama
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.loom/loom.toml")
}

impl ConfigProvider for LoomConfig {
    fn connections(&self) -> Vec<ConnectionInfo> {
        vec![ConnectionInfo {
            connection_id: self.data.ollama.connection_id.clone(),
            models: self
                .data
                .ollama
                .models
                .iter()
                .map(|name| ModelInfo {
                    model_name: name.clone(),
                    supports_thinking: false,
                })
                .collect(),
        }]
    }

    fn model_options(&self, _model_name: &str) -> HashMap<String, OptionValue> {
        self.data.model.options.clone()
    }

    fn tool_enabled(&self, tool_name: &str) -> bool {
        !self.data.disabled_tools.iter().any(|disabled| disabled == tool_name)
    }

    fn default_model_usage(&self) -> ModelUsage {
        ModelUsage::new(self.data.model.connection_id.clone(), self.data.model.model_name.clone())
    }

    fn title_model_usage(&self) -> Option<ModelUsage> {
        match (&self.data.model.title_connection_id, &self.data.model.title_model_name) {
            (Some(connection_id), Some(model_name)) => {
                Some(ModelUsage::new(connection_id.clone(), model_name.clone()))
            }
            _ => None,
        }
    }

    fn subscribe_changed(&self) -> broadcast::Receiver<()> {
        self.changed.subscribe()
    }
}
