//! Per-caller sessions
//!
//! Each caller (identified by the `x-session-id` header) gets its own
//! clipboard memory and chat history. Sessions are created on first use,
//! dropped after being idle for too long, and the least recently seen one is
//! evicted when the store is full.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::clipboard::ClipboardMemory;
use crate::config::SessionConfig;
use crate::conversation::ConversationHistory;

pub const DEFAULT_SESSION: &str = "default";

/// State owned by one caller
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub clipboard: tokio::sync::Mutex<ClipboardMemory>,
    pub conversation: tokio::sync::Mutex<ConversationHistory>,
}

impl Session {
    fn new(id: &str, chat_exchanges: usize) -> Self {
        Self {
            id: id.to_string(),
            clipboard: tokio::sync::Mutex::new(ClipboardMemory::new()),
            conversation: tokio::sync::Mutex::new(ConversationHistory::new(chat_exchanges)),
        }
    }
}

#[derive(Debug)]
struct Entry {
    session: Arc<Session>,
    last_seen: Instant,
}

pub struct SessionStore {
    sessions: Mutex<HashMap<String, Entry>>,
    max_sessions: usize,
    idle_timeout: Duration,
    chat_exchanges: usize,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_sessions: config.max_sessions.max(1),
            idle_timeout: config.idle_timeout(),
            chat_exchanges: config.chat_exchanges,
        }
    }

    /// Session for `id`, created if needed
    pub fn get(&self, id: &str) -> Arc<Session> {
        self.get_at(id, Instant::now())
    }

    fn get_at(&self, id: &str, now: Instant) -> Arc<Session> {
        let id = normalize_id(id);
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());

        let idle_timeout = self.idle_timeout;
        let before = sessions.len();
        sessions.retain(|key, entry| key == id || now.duration_since(entry.last_seen) <= idle_timeout);
        if sessions.len() < before {
            log::debug!("Dropped {} idle sessions", before - sessions.len());
        }

        if let Some(entry) = sessions.get_mut(id) {
            entry.last_seen = now;
            return entry.session.clone();
        }

        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                log::info!("Session store full, evicting {}", oldest);
                sessions.remove(&oldest);
            }
        }

        log::info!("Creating session {}", id);
        let session = Arc::new(Session::new(id, self.chat_exchanges));
        sessions.insert(
            id.to_string(),
            Entry {
                session: session.clone(),
                last_seen: now,
            },
        );
        session
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn normalize_id(id: &str) -> &str {
    let id = id.trim();
    if id.is_empty() {
        DEFAULT_SESSION
    } else {
        id
    }
}
