//! Copy, paste and copy-and-send
//!
//! Copying selects everything in the focused window, copies it and stores
//! the host clipboard text in the session's memory. Pasting resolves a
//! destination from the user's phrase and hands the remembered text to the
//! executor as literal content.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{preview, ClipboardMemory, NO_TEXT_IN_MEMORY, PREVIEW_CHARS, SCREEN_SOURCE};
use crate::automation::{
    scripts, AutomationExecutor, ExecutionResult, KeyInput, KeyPress, Platform, SharedDesktop,
};
use crate::error::EngineError;
use crate::intent::{Command, Destination, Intent, IntentParser};

const NOTHING_TO_COPY: &str = "No text found to copy";
const NO_RECIPIENT: &str = "Could not identify recipient";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipboardAction {
    Copy,
    /// Typed into an application or the focused window
    Paste,
    /// Sent through a messaging app
    Send,
    CopyAndSend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardOutcome {
    pub action: ClipboardAction,
    pub text_length: usize,
    pub preview: String,
    /// Command handed to the executor
    #[serde(skip)]
    pub command: Option<Command>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
}

impl ClipboardOutcome {
    fn new(action: ClipboardAction, text: &str) -> Self {
        Self {
            action,
            text_length: text.chars().count(),
            preview: preview(text, PREVIEW_CHARS),
            command: None,
            result: None,
        }
    }

    pub fn message(&self) -> String {
        match (self.action, &self.result) {
            (ClipboardAction::Copy, _) => "Text copied from screen successfully".to_string(),
            (ClipboardAction::CopyAndSend, Some(ExecutionResult::Sent { recipient, .. })) => {
                format!("Text copied and sent to {}", recipient)
            }
            (_, Some(result)) => result.message(),
            (_, None) => format!("{} characters handled", self.text_length),
        }
    }
}

/// Command delivering `text` to `destination` verbatim
pub fn delivery_command(destination: &Destination, text: &str) -> (ClipboardAction, Command) {
    match destination {
        Destination::Messaging { app, recipient } => {
            let mut command = Command::new(Intent::SendMessage)
                .with_app(app.clone())
                .with_content(text)
                .with_action("send");
            command.recipient = recipient.clone();
            (ClipboardAction::Send, command)
        }
        Destination::App { app } => (
            ClipboardAction::Paste,
            Command::new(Intent::TypeText)
                .with_app(app.clone())
                .with_content(text)
                .with_execution("type"),
        ),
        Destination::Focused => (
            ClipboardAction::Paste,
            Command::new(Intent::TypeText).with_content(text).with_execution("type"),
        ),
    }
}

pub struct ClipboardWorkflow {
    desktop: SharedDesktop,
    parser: Arc<IntentParser>,
    executor: Arc<AutomationExecutor>,
    script_timeout: Duration,
}

impl ClipboardWorkflow {
    pub fn new(parser: Arc<IntentParser>, executor: Arc<AutomationExecutor>, script_timeout: Duration) -> Self {
        Self {
            desktop: executor.desktop().clone(),
            parser,
            executor,
            script_timeout,
        }
    }

    /// Select all, copy, and read the host clipboard
    async fn capture(&self) -> Result<String, EngineError> {
        log::info!("Capturing text from the focused window");
        match self.desktop.platform() {
            Platform::Windows => {
                self.desktop
                    .run_script(&scripts::capture_selection(), self.script_timeout)
                    .await?;
            }
            _ => {
                self.desktop
                    .send_input(&[KeyInput::Press(KeyPress::Shortcut('a'))])
                    .await?;
                self.desktop.pause(Duration::from_millis(300)).await;
                self.desktop
                    .send_input(&[KeyInput::Press(KeyPress::Shortcut('c'))])
                    .await?;
                self.desktop.pause(Duration::from_millis(500)).await;
            }
        }

        let text = self.desktop.read_clipboard().await?;
        if text.trim().is_empty() {
            log::warn!("Nothing was copied from the focused window");
            return Err(EngineError::MissingState(NOTHING_TO_COPY.to_string()));
        }
        Ok(text)
    }

    pub async fn copy(&self, memory: &Mutex<ClipboardMemory>) -> Result<ClipboardOutcome, EngineError> {
        let text = self.capture().await?;
        memory.lock().await.store(text.clone(), SCREEN_SOURCE);

        if let Err(e) = self.desktop.write_clipboard(&text).await {
            log::warn!("Copied text kept in memory but not mirrored to the clipboard: {}", e);
        }

        log::info!("Copied {} characters from screen", text.chars().count());
        Ok(ClipboardOutcome::new(ClipboardAction::Copy, &text))
    }

    /// Type or send the remembered text wherever `phrase` points
    pub async fn paste(&self, phrase: &str, memory: &Mutex<ClipboardMemory>) -> Result<ClipboardOutcome, EngineError> {
        let text = memory
            .lock()
            .await
            .text()
            .map(str::to_string)
            .ok_or_else(|| EngineError::MissingState(NO_TEXT_IN_MEMORY.to_string()))?;

        let destination = self.parser.parse_destination(phrase).await?;
        self.deliver(&destination, &text).await
    }

    pub async fn copy_and_send(
        &self,
        phrase: &str,
        memory: &Mutex<ClipboardMemory>,
    ) -> Result<ClipboardOutcome, EngineError> {
        let copied = self.copy(memory).await?;
        let text = memory.lock().await.text().map(str::to_string).unwrap_or_default();

        let destination = match self.parser.parse_destination(phrase).await? {
            destination @ Destination::Messaging { recipient: Some(_), .. } => destination,
            other => {
                log::warn!("No recipient in '{}' ({:?})", phrase, other);
                return Err(EngineError::MissingState(NO_RECIPIENT.to_string()));
            }
        };

        let delivered = self.deliver(&destination, &text).await?;
        Ok(ClipboardOutcome {
            action: ClipboardAction::CopyAndSend,
            preview: copied.preview,
            ..delivered
        })
    }

    async fn deliver(&self, destination: &Destination, text: &str) -> Result<ClipboardOutcome, EngineError> {
        let (action, command) = delivery_command(destination, text);
        log::info!("Delivering {} remembered characters to {:?}", text.chars().count(), destination);

        let result = self.executor.execute(&command).await?;
        Ok(ClipboardOutcome {
            command: Some(command),
            result: Some(result),
            ..ClipboardOutcome::new(action, text)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AutomationConfig;
    use crate::generator::ContentGenerator;
    use crate::testing::{DesktopCall, FakeDesktop, ScriptedLlm};

    fn workflow(desktop: Arc<FakeDesktop>, llm: Arc<ScriptedLlm>) -> ClipboardWorkflow {
        let config = AutomationConfig::default();
        let executor = AutomationExecutor::new(desktop, ContentGenerator::new(llm.clone()), &config, "Aansh");
        ClipboardWorkflow::new(Arc::new(IntentParser::new(llm)), Arc::new(executor), config.script_timeout())
    }

    #[tokio::test]
    async fn test_copy_stores_and_mirrors_text() {
        let desktop = Arc::new(FakeDesktop::windows());
        desktop.set_clipboard("Quarterly numbers look good");
        let memory = Mutex::new(ClipboardMemory::new());

        let outcome = workflow(desktop.clone(), Arc::new(ScriptedLlm::empty()))
            .copy(&memory)
            .await
            .unwrap();

        assert_eq!(outcome.action, ClipboardAction::Copy);
        assert_eq!(outcome.text_length, 27);
        assert_eq!(outcome.message(), "Text copied from screen successfully");
        assert_eq!(memory.lock().await.text(), Some("Quarterly numbers look good"));
        assert_eq!(desktop.scripts_containing("SendWait('^c')"), 1);
        assert!(desktop
            .calls()
            .contains(&DesktopCall::WriteClipboard("Quarterly numbers look good".into())));
    }

    #[tokio::test]
    async fn test_copy_on_mac_uses_native_shortcuts() {
        let desktop = Arc::new(FakeDesktop::mac());
        desktop.set_clipboard("hello");
        let memory = Mutex::new(ClipboardMemory::new());

        workflow(desktop.clone(), Arc::new(ScriptedLlm::empty()))
            .copy(&memory)
            .await
            .unwrap();

        let calls = desktop.calls();
        assert_eq!(calls[0], DesktopCall::Input(vec![KeyInput::Press(KeyPress::Shortcut('a'))]));
        assert_eq!(calls[2], DesktopCall::Input(vec![KeyInput::Press(KeyPress::Shortcut('c'))]));
        assert!(desktop.scripts().is_empty());
    }

    #[tokio::test]
    async fn test_copy_with_nothing_selected_keeps_memory() {
        let desktop = Arc::new(FakeDesktop::windows());
        let memory = Mutex::new(ClipboardMemory::new());
        memory.lock().await.store("older text", SCREEN_SOURCE);

        let err = workflow(desktop, Arc::new(ScriptedLlm::empty()))
            .copy(&memory)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::MissingState(ref m) if m == NOTHING_TO_COPY));
        assert_eq!(memory.lock().await.text(), Some("older text"));
    }

    #[tokio::test]
    async fn test_paste_with_empty_memory_touches_nothing() {
        let desktop = Arc::new(FakeDesktop::windows());
        let llm = Arc::new(ScriptedLlm::empty());
        let memory = Mutex::new(ClipboardMemory::new());

        let err = workflow(desktop.clone(), llm.clone())
            .paste("paste it in notepad", &memory)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), NO_TEXT_IN_MEMORY);
        assert!(desktop.calls().is_empty());
        assert!(!desktop.touched_keyboard());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_paste_sends_exact_text_to_recipient() {
        let desktop = Arc::new(FakeDesktop::windows());
        let llm = Arc::new(ScriptedLlm::new(vec![Ok(r#"{"app":"whatsapp","recipient":"mahesh"}"#.into())]));
        let memory = Mutex::new(ClipboardMemory::new());
        memory.lock().await.store("Meeting moved to 4pm", SCREEN_SOURCE);

        let outcome = workflow(desktop.clone(), llm.clone())
            .paste("send it to mahesh", &memory)
            .await
            .unwrap();

        assert_eq!(outcome.action, ClipboardAction::Send);
        let command = outcome.command.as_ref().unwrap();
        assert!(!command.needs_generation);
        assert_eq!(command.content.as_deref(), Some("Meeting moved to 4pm"));
        assert_eq!(
            outcome.result,
            Some(ExecutionResult::Sent { app: "whatsapp".into(), recipient: "mahesh".into(), length: 20 })
        );
        assert_eq!(desktop.typed_text(), "mahesh\nMeeting moved to 4pm\n");
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_paste_into_focused_window() {
        let desktop = Arc::new(FakeDesktop::windows());
        let llm = Arc::new(ScriptedLlm::new(vec![Ok(r#"{"app":"active"}"#.into())]));
        let memory = Mutex::new(ClipboardMemory::new());
        memory.lock().await.store("line one\nline two", SCREEN_SOURCE);

        let outcome = workflow(desktop.clone(), llm).paste("paste this", &memory).await.unwrap();

        assert_eq!(outcome.action, ClipboardAction::Paste);
        assert_eq!(outcome.result, Some(ExecutionResult::Typed { app: "active".into(), length: 17 }));
        assert_eq!(desktop.typed_text(), "line one\nline two");
        assert_eq!(desktop.scripts_containing(scripts::FOCUS_PROBE_TAG), 0);
    }

    #[tokio::test]
    async fn test_copy_and_send() {
        let desktop = Arc::new(FakeDesktop::windows());
        desktop.set_clipboard("Flight lands at 9");
        let llm = Arc::new(ScriptedLlm::new(vec![Ok(r#"{"recipient":"vishal"}"#.into())]));
        let memory = Mutex::new(ClipboardMemory::new());

        let outcome = workflow(desktop.clone(), llm)
            .copy_and_send("copy this and send it to vishal", &memory)
            .await
            .unwrap();

        assert_eq!(outcome.action, ClipboardAction::CopyAndSend);
        assert_eq!(outcome.message(), "Text copied and sent to vishal");
        assert!(desktop.typed_text().ends_with("vishal\nFlight lands at 9\n"));
    }

    #[tokio::test]
    async fn test_copy_and_send_without_recipient() {
        let desktop = Arc::new(FakeDesktop::windows());
        desktop.set_clipboard("Flight lands at 9");
        let llm = Arc::new(ScriptedLlm::new(vec![Ok(r#"{"app":"notepad"}"#.into())]));
        let memory = Mutex::new(ClipboardMemory::new());

        let err = workflow(desktop, llm)
            .copy_and_send("copy this and send it", &memory)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), NO_RECIPIENT);
        assert_eq!(memory.lock().await.text(), Some("Flight lands at 9"));
    }
}
