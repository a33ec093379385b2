//! Conversation memory and AI chat fallback for ListenOS
//!
//! Keeps a bounded per-session history and answers anything the router does
//! not turn into an action.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::Mutex;

use crate::llm::{ChatTurn, CompletionRequest, LlmError, SharedCompletionClient};

/// Role in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ring buffer of the most recent exchanges
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: VecDeque<Message>,
    max_exchanges: usize,
}

impl ConversationHistory {
    pub fn new(max_exchanges: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            max_exchanges: max_exchanges.max(1),
        }
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.push(Message::assistant(content));
    }

    fn push(&mut self, message: Message) {
        self.messages.push_back(message);
        while self.messages.len() > self.max_exchanges * 2 {
            self.messages.pop_front();
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    /// History in the shape the completion client expects
    pub fn turns(&self) -> Vec<ChatTurn> {
        self.messages
            .iter()
            .map(|m| ChatTurn {
                role: m.role,
                text: m.content.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Apology returned to the caller when the chat call fails
pub const CHAT_FAILURE_MESSAGE: &str = "I apologize, but I encountered an error. Please try again!";

/// Open-ended chat used when no action is detected
pub struct ChatEngine {
    llm: SharedCompletionClient,
    system_context: String,
}

impl ChatEngine {
    pub fn new(llm: SharedCompletionClient, assistant_name: &str) -> Self {
        let system_context = format!(
            "You are {name} AI, a helpful, friendly, and intelligent assistant. \
             You answer questions, explain things clearly, and keep a warm, conversational tone. \
             Keep answers short enough to be read aloud unless the user asks for detail. \
             You can also control the user's computer: open apps, type text, send messages and emails, \
             search the web and create documents, but in this conversation you only reply with text.",
            name = assistant_name
        );
        Self { llm, system_context }
    }

    pub fn system_context(&self) -> &str {
        &self.system_context
    }

    /// Answer `text` with the session history as context.
    ///
    /// The user turn is recorded even when the call fails; the assistant
    /// turn only on success.
    pub async fn respond(
        &self,
        history: &Mutex<ConversationHistory>,
        text: &str,
    ) -> Result<String, LlmError> {
        let previous = {
            let mut history = history.lock().await;
            let previous = history.turns();
            history.add_user_message(text);
            previous
        };

        let request = CompletionRequest::new(text)
            .system(self.system_context.clone())
            .history(previous)
            .temperature(0.7)
            .max_tokens(1024);

        match self.llm.complete(request).await {
            Ok(reply) => {
                let reply = reply.trim().to_string();
                history.lock().await.add_assistant_message(reply.clone());
                Ok(reply)
            }
            Err(e) => {
                log::error!("Chat completion failed: {}", e);
                Err(e)
            }
        }
    }
}
