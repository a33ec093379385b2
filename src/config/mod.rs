//! Engine configuration
//!
//! Defaults, then an optional JSON file, then environment overrides.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::llm::LlmProvider;

/// Full engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub server: ServerConfig,
    pub assistant: AssistantConfig,
    pub llm: LlmConfig,
    pub automation: AutomationConfig,
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Name used for greetings and the wake phrase ("hey aansh")
    pub name: String,
}

impl AssistantConfig {
    /// Name as shown to the user ("Aansh")
    pub fn display_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: "aansh".to_string(),
        }
    }
}

/// Remote completion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// Falls back to the provider's default model
    pub model: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub base_url: Option<String>,
    pub request_timeout_secs: u64,
    /// Minimum spacing between two outbound calls
    pub min_call_spacing_ms: u64,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
}

impl LlmConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn min_call_spacing(&self) -> Duration {
        Duration::from_millis(self.min_call_spacing_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn model_name(&self) -> String {
        self.model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            model: None,
            api_key: String::new(),
            base_url: None,
            request_timeout_secs: 30,
            min_call_spacing_ms: 2000,
            max_attempts: 2,
            retry_base_delay_ms: 3000,
        }
    }
}

/// Timings for desktop automation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    pub focus_attempts: u32,
    pub focus_interval_ms: u64,
    pub launch_settle_ms: u64,
    pub uri_launch_settle_ms: u64,
    pub open_then_type_delay_ms: u64,
    pub per_char_delay_ms: u64,
    pub recipient_char_delay_ms: u64,
    pub chunk_size: usize,
    /// Lower bound for any single host script
    pub script_timeout_secs: u64,
    pub compose_wait_ms: u64,
}

impl AutomationConfig {
    pub fn focus_interval(&self) -> Duration {
        Duration::from_millis(self.focus_interval_ms)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs)
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            focus_attempts: 30,
            focus_interval_ms: 400,
            launch_settle_ms: 2000,
            uri_launch_settle_ms: 3000,
            open_then_type_delay_ms: 1000,
            per_char_delay_ms: 40,
            recipient_char_delay_ms: 80,
            chunk_size: 80,
            script_timeout_secs: 30,
            compose_wait_ms: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_sessions: usize,
    pub idle_timeout_secs: u64,
    /// Chat exchanges (user + assistant pairs) kept per session
    pub chat_exchanges: usize,
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 64,
            idle_timeout_secs: 3600,
            chat_exchanges: 10,
        }
    }
}

impl EngineConfig {
    /// Load from disk (if present) and apply environment overrides
    pub fn load() -> Self {
        let mut config = Self::load_from_disk().unwrap_or_default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    fn storage_path() -> Result<PathBuf, String> {
        if let Ok(path) = std::env::var("LISTENOS_ENGINE_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let data_dir =
            dirs_next::data_dir().ok_or_else(|| "Could not find data directory".to_string())?;
        Ok(data_dir.join("ListenOS").join("engine.json"))
    }

    pub fn load_from_disk() -> Option<Self> {
        let path = Self::storage_path().ok()?;
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<Self>(&content) {
            Ok(config) => {
                log::info!("Loaded engine config from {}", path.display());
                Some(config)
            }
            Err(e) => {
                log::warn!("Ignoring invalid config at {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn save_to_disk(&self) -> Result<(), String> {
        let path = Self::storage_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let payload = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize engine config: {}", e))?;
        std::fs::write(&path, payload)
            .map_err(|e| format!("Failed to write engine config: {}", e))?;
        Ok(())
    }

    /// Apply environment-style overrides from `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(name) = get("LISTENOS_ASSISTANT_NAME") {
            self.assistant.name = name.to_lowercase();
        }
        if let Some(model) = get("LISTENOS_LLM_MODEL") {
            self.llm.model = Some(model);
        }

        let google_key = get("GOOGLE_API_KEY");
        let groq_key = get("GROQ_API_KEY");

        match get("LISTENOS_LLM_PROVIDER").and_then(|p| LlmProvider::from_name(&p)) {
            Some(provider) => self.llm.provider = provider,
            None if google_key.is_none() && groq_key.is_some() && !self.llm.has_api_key() => {
                self.llm.provider = LlmProvider::Groq;
            }
            None => {}
        }

        let key = match self.llm.provider {
            LlmProvider::Gemini => google_key,
            LlmProvider::Groq => groq_key,
        };
        if let Some(key) = key {
            self.llm.api_key = key;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.assistant.name, "aansh");
        assert_eq!(config.assistant.display_name(), "Aansh");
        assert_eq!(config.llm.min_call_spacing(), Duration::from_secs(2));
        assert_eq!(config.llm.max_attempts, 2);
        assert_eq!(config.automation.focus_attempts, 30);
        assert_eq!(config.automation.chunk_size, 80);
        assert_eq!(config.sessions.chat_exchanges, 10);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"server": {"port": 8080}, "automation": {"focus_attempts": 40}}"#)
                .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.automation.focus_attempts, 40);
        assert_eq!(config.automation.focus_interval_ms, 400);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = EngineConfig::default();
        config.apply_overrides(lookup(&[
            ("PORT", "7000"),
            ("GOOGLE_API_KEY", "g-key"),
            ("LISTENOS_ASSISTANT_NAME", "Nova"),
        ]));

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.llm.provider, LlmProvider::Gemini);
        assert_eq!(config.llm.api_key, "g-key");
        assert_eq!(config.assistant.name, "nova");
    }

    #[test]
    fn test_groq_key_alone_selects_groq() {
        let mut config = EngineConfig::default();
        config.apply_overrides(lookup(&[("GROQ_API_KEY", "gsk")]));

        assert_eq!(config.llm.provider, LlmProvider::Groq);
        assert_eq!(config.llm.api_key, "gsk");
        assert_eq!(config.llm.model_name(), LlmProvider::Groq.default_model());
    }

    #[test]
    fn test_bad_port_is_ignored() {
        let mut config = EngineConfig::default();
        config.apply_overrides(lookup(&[("PORT", "not-a-port")]));
        assert_eq!(config.server.port, 5000);
    }
}
