//! Model configuration.
//!
//! The `models` section of `agentflow.yaml`: endpoints, sampling defaults,
//! and the fallback chain. Also hosts the `${VAR:-default}` interpolation
//! shared by the whole configuration file.

use std::collections::HashMap;

use serde::Deserialize;

use super::errors::InferenceError;

/// Fallback chain sentinel: no model, the caller answers statically.
pub const STATIC_RESPONSE_KEY: &str = "static_response";

// ─── Public Types ────────────────────────────────────────────────────────────

/// A single model's runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub display_name: String,
    pub runtime: String,
    #[serde(default)]
    pub model_name: Option<String>,
    pub base_url: String,
    #[serde(default = "default_context_window")]
    pub context_window: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// When `true`, sends `response_format: {"type":"json_object"}` on calls
    /// that expect a JSON reply.
    #[serde(default)]
    pub force_json_response: bool,
}

fn default_context_window() -> u32 {
    8192
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}

/// Model registry.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    pub active_model: String,
    pub models: HashMap<String, ModelConfig>,
    #[serde(default)]
    pub fallback_chain: Vec<String>,
}

impl Default for ModelsConfig {
    /// A single local Ollama model.
    fn default() -> Self {
        let mut models = HashMap::new();
        models.insert(
            "local".to_string(),
            ModelConfig {
                display_name: "Local model".to_string(),
                runtime: "ollama".to_string(),
                model_name: Some("llama3.1:8b".to_string()),
                base_url: "http://localhost:11434/v1".to_string(),
                context_window: default_context_window(),
                temperature: default_temperature(),
                max_tokens: default_max_tokens(),
                force_json_response: true,
            },
        );
        Self {
            active_model: "local".to_string(),
            models,
            fallback_chain: vec!["local".to_string(), STATIC_RESPONSE_KEY.to_string()],
        }
    }
}

/// Resolve the active model configuration, respecting the fallback chain.
///
/// Returns `(model_key, ModelConfig)` for the first configured model.
/// Connectivity is checked at runtime by the client.
pub fn resolve_active_model(config: &ModelsConfig) -> Result<(String, ModelConfig), InferenceError> {
    if let Some(model) = config.models.get(&config.active_model) {
        return Ok((config.active_model.clone(), model.clone()));
    }

    for key in &config.fallback_chain {
        if key == STATIC_RESPONSE_KEY {
            continue;
        }
        if let Some(model) = config.models.get(key) {
            return Ok((key.clone(), model.clone()));
        }
    }

    Err(InferenceError::ConfigError {
        reason: format!(
            "active model '{}' not found in config and no fallback available",
            config.active_model
        ),
    })
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
pub fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr));
        } else {
            result.push(ch);
        }
    }

    result
}

/// Resolve a variable expression like `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str) -> String {
    match expr.split_once(":-") {
        Some((name, default)) => std::env::var(name).unwrap_or_else(|_| expand_tilde(default)),
        None => std::env::var(expr).unwrap_or_default(),
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
