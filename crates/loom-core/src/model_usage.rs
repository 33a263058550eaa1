use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single tuning parameter value in a [`ModelUsage::options`] bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

/// Capabilities of a model, resolved once from the connection's model
/// catalog (see [`crate::ModelConnector::list_models`]).
///
/// `supports_thinking` and `thinking_budget` drive whether an [`Agent`] asks
/// for a reasoning stream at all — a capability flag plus an optional
/// provider-specific budget hint rather than a fixed enum
/// of tiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCaps {
    #[serde(default)]
    pub supports_thinking: bool,
    #[serde(default)]
    pub thinking_budget_tokens: Option<u32>,
}

/// The triple `(connection, model, options)` a session will send its next
/// request with. Cloneable value type — the single source of truth for
/// what the next `ChatCall` will target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub connection_id: String,
    pub model_name: String,
    #[serde(default)]
    pub model_caps: ModelCaps,
    #[serde(default)]
    pub options: HashMap<String, OptionValue>,
}

impl ModelUsage {
    pub fn new(connection_id: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            model_name: model_name.into(),
            model_caps: ModelCaps::default(),
            options: HashMap::new(),
        }
    }

    /// Overlay `overrides` onto a clone of `self`; entries in `overrides`
    /// win.
    pub fn with_overlaid_options(&self, overrides: &HashMap<String, OptionValue>) -> Self {
        let mut usage = self.clone();
        for (k, v) in overrides {
            usage.options.insert(k.clone(), v.clone());
        }
        usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_prefers_override_values() {
        let mut base = ModelUsage::new("local", "llama3");
        base.options.insert("temperature".into(), OptionValue::Number(0.7));
        base.options.insert("top_p".into(), OptionValue::Number(0.9));

        let mut overrides = HashMap::new();
        overrides.insert("temperature".into(), OptionValue::Number(0.2));

        let overlaid = base.with_overlaid_options(&overrides);
        assert_eq!(overlaid.options["temperature"], OptionValue::Number(0.2));
        assert_eq!(overlaid.options["top_p"], OptionValue::Number(0.9));
    }
}
