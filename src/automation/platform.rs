//! Host platform abstraction
//!
//! Everything the engine does to the desktop goes through [`Desktop`], so
//! automation sequences can be exercised without a real session.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::AutomationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// Node-style platform identifier reported to clients
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Windows => "win32",
            Platform::MacOs => "darwin",
            Platform::Linux => "linux",
        }
    }
}

/// Captured output of a host script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ScriptOutput {
    pub fn new(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn contains(&self, marker: &str) -> bool {
        self.stdout.contains(marker)
    }
}

/// Non-text keys used by automation sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
    Enter,
    Tab,
    Backspace,
    Down,
    /// Primary modifier (Ctrl, or Cmd on macOS) plus a letter
    Shortcut(char),
    /// Primary modifier plus Enter
    SubmitShortcut,
}

impl KeyPress {
    /// SendKeys notation
    pub fn send_keys(&self) -> String {
        match self {
            KeyPress::Enter => "{ENTER}".to_string(),
            KeyPress::Tab => "{TAB}".to_string(),
            KeyPress::Backspace => "{BACKSPACE}".to_string(),
            KeyPress::Down => "{DOWN}".to_string(),
            KeyPress::Shortcut(c) => format!("^{}", c.to_ascii_lowercase()),
            KeyPress::SubmitShortcut => "^{ENTER}".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
    Text(String),
    Press(KeyPress),
}

/// Outbound primitives the engine needs from the host
#[async_trait]
pub trait Desktop: Send + Sync {
    fn platform(&self) -> Platform;

    /// Run a PowerShell (Windows) or AppleScript (macOS) script
    async fn run_script(&self, script: &str, timeout: Duration) -> Result<ScriptOutput, AutomationError>;

    /// Start a process without waiting for it
    async fn launch(&self, program: &str, args: &[String]) -> Result<(), AutomationError>;

    /// Native keystroke simulation
    async fn send_input(&self, input: &[KeyInput]) -> Result<(), AutomationError>;

    async fn read_clipboard(&self) -> Result<String, AutomationError>;

    async fn write_clipboard(&self, text: &str) -> Result<(), AutomationError>;

    async fn pause(&self, duration: Duration);
}

pub type SharedDesktop = Arc<dyn Desktop>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_keys_notation() {
        assert_eq!(KeyPress::Enter.send_keys(), "{ENTER}");
        assert_eq!(KeyPress::Shortcut('F').send_keys(), "^f");
        assert_eq!(KeyPress::SubmitShortcut.send_keys(), "^{ENTER}");
    }

    #[test]
    fn test_platform_names() {
        assert_eq!(Platform::Windows.name(), "win32");
        assert_eq!(Platform::MacOs.name(), "darwin");
    }
}
