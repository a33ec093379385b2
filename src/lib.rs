//! ListenOS - command interpretation and desktop automation engine
//!
//! Takes a natural-language command, decides whether it is a conversation or
//! an action, and for actions drives the local desktop: launching apps,
//! focusing windows, typing, messaging, e-mail, search and documents.

pub mod automation;
pub mod clipboard;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod error;
pub mod generator;
pub mod intent;
pub mod llm;
pub mod retry;
pub mod router;
pub mod session;

#[cfg(test)]
mod testing;

pub use automation::{AutomationExecutor, ExecutionResult, Platform, SharedDesktop, SystemDesktop};
pub use config::EngineConfig;
pub use error::EngineError;
pub use intent::{Command, Intent};
pub use llm::{RemoteLlm, SharedCompletionClient};
pub use router::{CommandRouter, RouterResponse};
pub use session::SessionStore;

/// Shared state behind the HTTP commands
pub struct AppState {
    pub router: CommandRouter,
    pub sessions: SessionStore,
    pub platform: Platform,
    pub ai_enabled: bool,
}

impl AppState {
    pub fn new(
        config: &EngineConfig,
        llm: SharedCompletionClient,
        desktop: SharedDesktop,
        ai_enabled: bool,
    ) -> Result<Self, EngineError> {
        let platform = desktop.platform();
        Ok(Self {
            router: CommandRouter::new(llm, desktop, config)?,
            sessions: SessionStore::new(&config.sessions),
            platform,
            ai_enabled,
        })
    }
}
