//! Remote completion client for ListenOS
//!
//! Parser, content generator and chat all go through [`CompletionClient`].
//! [`RemoteLlm`] talks to Gemini or Groq over HTTP, paces calls and retries
//! transient failures. Quota refusals are never retried.

pub mod pacing;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::LlmConfig;
use crate::conversation::Role;
use crate::retry::{retry, Attempt, RetryPolicy};
use pacing::CallPacer;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const GROQ_BASE_URL: &str = "https://api.groq.com";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    Groq,
}

impl LlmProvider {
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "gemini-2.0-flash",
            LlmProvider::Groq => "llama-3.3-70b-versatile",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(LlmProvider::Gemini),
            "groq" => Some(LlmProvider::Groq),
            _ => None,
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::Gemini => write!(f, "Gemini"),
            LlmProvider::Groq => write!(f, "Groq"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("API quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("No API key configured for {0}")]
    MissingApiKey(LlmProvider),

    #[error("Completion request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("{provider} API error ({status}): {body}")]
    Http {
        provider: LlmProvider,
        status: u16,
        body: String,
    },

    #[error("Completion request failed: {0}")]
    Transport(String),

    #[error("Model returned an empty response")]
    Empty,
}

impl LlmError {
    pub fn is_quota(&self) -> bool {
        matches!(self, LlmError::QuotaExceeded(_))
    }

    fn is_retryable(&self) -> bool {
        !matches!(self, LlmError::QuotaExceeded(_) | LlmError::MissingApiKey(_))
    }
}

/// One earlier turn of a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub history: Vec<ChatTurn>,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Overrides the client-wide timeout
    pub timeout: Option<Duration>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            history: Vec::new(),
            prompt: prompt.into(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout: None,
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Prompt text in, free text out
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;

    /// Whether the client can reach a model at all (API key present)
    fn is_configured(&self) -> bool {
        true
    }
}

pub type SharedCompletionClient = Arc<dyn CompletionClient>;

/// HTTP client for the configured provider
pub struct RemoteLlm {
    client: Client,
    provider: LlmProvider,
    model: String,
    api_key: String,
    base_url: String,
    pacer: CallPacer,
    retry: RetryPolicy,
    timeout: Duration,
}

impl RemoteLlm {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let timeout = config.request_timeout();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = config.base_url.clone().unwrap_or_else(|| {
            match config.provider {
                LlmProvider::Gemini => GEMINI_BASE_URL,
                LlmProvider::Groq => GROQ_BASE_URL,
            }
            .to_string()
        });

        Ok(Self {
            client,
            provider: config.provider,
            model: config.model_name(),
            api_key: config.api_key.trim().to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            pacer: CallPacer::new(config.min_call_spacing()),
            retry: RetryPolicy::linear(config.max_attempts, config.retry_base_delay()),
            timeout,
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    async fn send_once(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let builder = match self.provider {
            LlmProvider::Gemini => self
                .client
                .post(format!(
                    "{}/v1beta/models/{}:generateContent",
                    self.base_url, self.model
                ))
                .query(&[("key", self.api_key.as_str())])
                .json(&gemini_body(request)),
            LlmProvider::Groq => self
                .client
                .post(format!("{}/openai/v1/chat/completions", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&groq_body(&self.model, request)),
        };
        let timeout = request.timeout.unwrap_or(self.timeout);

        let response = builder.timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(timeout)
            } else {
                LlmError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::Transport(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            if status.as_u16() == 429 || mentions_quota(&body) {
                return Err(LlmError::QuotaExceeded(truncate(&body, 200)));
            }
            return Err(LlmError::Http {
                provider: self.provider,
                status: status.as_u16(),
                body: truncate(&body, 500),
            });
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| LlmError::Transport(format!("Failed to parse {} response: {}", self.provider, e)))?;

        let text = match self.provider {
            LlmProvider::Gemini => extract_gemini_text(&value),
            LlmProvider::Groq => extract_groq_text(&value),
        };

        match text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(LlmError::Empty),
        }
    }
}

#[async_trait]
impl CompletionClient for RemoteLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::MissingApiKey(self.provider));
        }

        self.pacer.wait_turn().await;

        let request = &request;
        let result = retry(
            self.retry,
            |attempt| async move {
                log::debug!("{} completion call, attempt {}", self.provider, attempt);
                self.send_once(request).await.map_err(|e| {
                    if e.is_retryable() {
                        log::warn!("{} call attempt {} failed: {}", self.provider, attempt, e);
                        Attempt::Retry(e)
                    } else {
                        Attempt::Abort(e)
                    }
                })
            },
            tokio::time::sleep,
        )
        .await;

        result.map_err(|e| e.into_inner())
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

fn mentions_quota(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("quota") || lower.contains("resource_exhausted") || lower.contains("rate limit")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

fn gemini_body(request: &CompletionRequest) -> Value {
    let mut contents: Vec<Value> = request
        .history
        .iter()
        .map(|turn| {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "model",
            };
            json!({"role": role, "parts": [{"text": turn.text}]})
        })
        .collect();
    contents.push(json!({"role": "user", "parts": [{"text": request.prompt}]}));

    let mut body = json!({
        "contents": contents,
        "generationConfig": {
            "temperature": request.temperature,
            "maxOutputTokens": request.max_tokens,
        }
    });
    if let Some(system) = &request.system {
        body["systemInstruction"] = json!({"parts": [{"text": system}]});
    }
    body
}

fn groq_body(model: &str, request: &CompletionRequest) -> Value {
    let mut messages = Vec::new();
    if let Some(system) = &request.system {
        messages.push(json!({"role": "system", "content": system}));
    }
    for turn in &request.history {
        messages.push(json!({"role": turn.role.to_string(), "content": turn.text}));
    }
    messages.push(json!({"role": "user", "content": request.prompt}));

    json!({
        "model": model,
        "messages": messages,
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
    })
}

fn extract_gemini_text(value: &Value) -> Option<String> {
    let parts = value["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();
    Some(text)
}

fn extract_groq_text(value: &Value) -> Option<String> {
    value["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
}
