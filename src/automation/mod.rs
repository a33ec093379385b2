//! Desktop automation for ListenOS
//!
//! Turns a planned [`Action`](crate::intent::Action) into OS-level side
//! effects: launching apps, focusing windows, simulated typing, messaging,
//! e-mail, documents and web search.

pub mod apps;
pub mod documents;
pub mod executor;
pub mod focus;
pub mod keyboard;
pub mod platform;
pub mod result;
pub mod scripts;
pub mod system;

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub use executor::AutomationExecutor;
pub use focus::WindowFocusManager;
pub use platform::{Desktop, KeyInput, KeyPress, Platform, ScriptOutput, SharedDesktop};
pub use result::ExecutionResult;
pub use system::SystemDesktop;

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("{what} timed out after {}ms", .after.as_millis())]
    Timeout { what: String, after: Duration },

    #[error("Failed to bring {app} to foreground after {attempts} attempts")]
    FocusFailure { app: String, attempts: u32 },

    #[error("Script failed: {0}")]
    Script(String),

    #[error("Failed to launch {program}: {reason}")]
    Launch { program: String, reason: String },

    #[error("Keyboard input failed: {0}")]
    Input(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Failed to write {}: {reason}", .path.display())]
    File { path: PathBuf, reason: String },

    #[error("Failed to send email via Gmail or Outlook ({0})")]
    EmailExhausted(String),

    #[error("{0} is not supported on this platform")]
    Unsupported(String),
}
