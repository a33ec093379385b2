//! Real host implementation of [`Desktop`]
//!
//! Scripts run through PowerShell on Windows and osascript on macOS,
//! keystrokes go through enigo and the clipboard through arboard.

use arboard::Clipboard;
use async_trait::async_trait;
use base64::Engine;
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::platform::{Desktop, KeyInput, KeyPress, Platform, ScriptOutput};
use super::AutomationError;

/// Longest base64 payload passed on the command line; longer scripts go
/// through a temporary .ps1 file
const MAX_ENCODED_COMMAND: usize = 8000;

pub struct SystemDesktop {
    platform: Platform,
}

impl SystemDesktop {
    pub fn new() -> Self {
        Self {
            platform: Platform::current(),
        }
    }

    fn script_command(&self, script: &str) -> Result<(Command, Option<PathBuf>), AutomationError> {
        match self.platform {
            Platform::Windows => {
                let encoded = encode_powershell(script);
                if encoded.len() <= MAX_ENCODED_COMMAND {
                    let mut cmd = Command::new("powershell");
                    cmd.args(["-NoProfile", "-NonInteractive", "-EncodedCommand", &encoded]);
                    return Ok((cmd, None));
                }

                let path = std::env::temp_dir().join(format!("listenos-{}.ps1", uuid::Uuid::new_v4()));
                // BOM so Windows PowerShell reads the file as UTF-8
                let mut bytes = vec![0xEF, 0xBB, 0xBF];
                bytes.extend_from_slice(script.as_bytes());
                std::fs::write(&path, bytes).map_err(|e| AutomationError::File {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;

                let mut cmd = Command::new("powershell");
                cmd.args(["-NoProfile", "-NonInteractive", "-ExecutionPolicy", "Bypass", "-File"])
                    .arg(&path);
                Ok((cmd, Some(path)))
            }
            Platform::MacOs => {
                let mut cmd = Command::new("osascript");
                cmd.args(["-e", script]);
                Ok((cmd, None))
            }
            Platform::Linux => {
                let mut cmd = Command::new("sh");
                cmd.args(["-c", script]);
                Ok((cmd, None))
            }
        }
    }
}

impl Default for SystemDesktop {
    fn default() -> Self {
        Self::new()
    }
}

/// PowerShell -EncodedCommand expects base64 of UTF-16LE
fn encode_powershell(script: &str) -> String {
    let utf16: Vec<u8> = script.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect();
    base64::engine::general_purpose::STANDARD.encode(utf16)
}

fn press_key(enigo: &mut Enigo, key: KeyPress, platform: Platform) -> Result<(), AutomationError> {
    let modifier = if platform == Platform::MacOs { Key::Meta } else { Key::Control };
    let click = |enigo: &mut Enigo, key: Key| {
        enigo
            .key(key, Direction::Click)
            .map_err(|e| AutomationError::Input(format!("Failed to press key: {}", e)))
    };
    let chord = |enigo: &mut Enigo, key: Key| -> Result<(), AutomationError> {
        enigo
            .key(modifier, Direction::Press)
            .map_err(|e| AutomationError::Input(format!("Failed to press modifier: {}", e)))?;
        let result = click(enigo, key);
        enigo
            .key(modifier, Direction::Release)
            .map_err(|e| AutomationError::Input(format!("Failed to release modifier: {}", e)))?;
        result
    };

    match key {
        KeyPress::Enter => click(enigo, Key::Return),
        KeyPress::Tab => click(enigo, Key::Tab),
        KeyPress::Backspace => click(enigo, Key::Backspace),
        KeyPress::Down => click(enigo, Key::DownArrow),
        KeyPress::Shortcut(c) => chord(enigo, Key::Unicode(c.to_ascii_lowercase())),
        KeyPress::SubmitShortcut => chord(enigo, Key::Return),
    }
}

#[async_trait]
impl Desktop for SystemDesktop {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn run_script(&self, script: &str, timeout: Duration) -> Result<ScriptOutput, AutomationError> {
        let (mut cmd, script_file) = self.script_command(script)?;
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| AutomationError::Launch {
            program: "script host".to_string(),
            reason: e.to_string(),
        })?;

        let outcome = tokio::time::timeout(timeout, child.wait_with_output()).await;

        if let Some(path) = script_file {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                log::debug!("Could not remove {}: {}", path.display(), e);
            }
        }

        let output = match outcome {
            Err(_) => {
                return Err(AutomationError::Timeout {
                    what: "Host script".to_string(),
                    after: timeout,
                })
            }
            Ok(Err(e)) => return Err(AutomationError::Script(e.to_string())),
            Ok(Ok(output)) => output,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            Ok(ScriptOutput { stdout, stderr })
        } else if stderr.trim().is_empty() {
            Err(AutomationError::Script(format!("exited with {}", output.status)))
        } else {
            Err(AutomationError::Script(stderr.trim().to_string()))
        }
    }

    async fn launch(&self, program: &str, args: &[String]) -> Result<(), AutomationError> {
        log::info!("Launching {} {:?}", program, args);
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|e| AutomationError::Launch {
                program: program.to_string(),
                reason: e.to_string(),
            })
    }

    async fn send_input(&self, input: &[KeyInput]) -> Result<(), AutomationError> {
        let input = input.to_vec();
        let platform = self.platform;

        tokio::task::spawn_blocking(move || -> Result<(), AutomationError> {
            let mut enigo = Enigo::new(&Settings::default())
                .map_err(|e| AutomationError::Input(format!("Enigo not initialized: {}", e)))?;

            for item in &input {
                match item {
                    KeyInput::Text(text) => enigo
                        .text(text)
                        .map_err(|e| AutomationError::Input(format!("Failed to type text: {}", e)))?,
                    KeyInput::Press(key) => press_key(&mut enigo, *key, platform)?,
                }
            }
            Ok(())
        })
        .await
        .map_err(|e| AutomationError::Input(format!("Input task failed: {}", e)))?
    }

    async fn read_clipboard(&self) -> Result<String, AutomationError> {
        tokio::task::spawn_blocking(|| {
            let mut clipboard = Clipboard::new()
                .map_err(|e| AutomationError::Clipboard(format!("Clipboard not available: {}", e)))?;
            clipboard
                .get_text()
                .map_err(|e| AutomationError::Clipboard(format!("Failed to get clipboard: {}", e)))
        })
        .await
        .map_err(|e| AutomationError::Clipboard(format!("Clipboard task failed: {}", e)))?
    }

    async fn write_clipboard(&self, text: &str) -> Result<(), AutomationError> {
        let text = text.to_string();
        tokio::task::spawn_blocking(move || {
            let mut clipboard = Clipboard::new()
                .map_err(|e| AutomationError::Clipboard(format!("Clipboard not available: {}", e)))?;
            clipboard
                .set_text(text)
                .map_err(|e| AutomationError::Clipboard(format!("Failed to set clipboard: {}", e)))
        })
        .await
        .map_err(|e| AutomationError::Clipboard(format!("Clipboard task failed: {}", e)))?
    }

    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
