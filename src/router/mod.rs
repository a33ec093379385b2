//! Command routing for ListenOS
//!
//! Decides whether a request is a conversation or an action, and for actions
//! whether a local pattern is enough or the model has to parse it.
//!
//! Checks run in a fixed order and the first match wins:
//! greeting, pre-parsed command, clipboard phrases, open/search fast paths,
//! action-verb patterns (parsed by the model), and finally chat.

use lazy_static::lazy_static;
use regex::{Regex, RegexSet};
use serde::Serialize;
use std::sync::Arc;

use crate::automation::{apps, AutomationExecutor, ExecutionResult, SharedDesktop};
use crate::clipboard::{ClipboardOutcome, ClipboardWorkflow};
use crate::config::EngineConfig;
use crate::conversation::{ChatEngine, CHAT_FAILURE_MESSAGE};
use crate::error::EngineError;
use crate::generator::ContentGenerator;
use crate::intent::{Command, Intent, IntentParser};
use crate::llm::SharedCompletionClient;
use crate::session::Session;

lazy_static! {
    static ref COPY_AND_SEND: Regex = Regex::new(r"\bcopy\b.*\b(send|share)\b.*\bto\s+\w+").unwrap();
    static ref PASTE: Regex =
        Regex::new(r"\b(paste|send)\s+(this|it|that|the\s+(copied\s+)?text|copied\s+text)\b").unwrap();
    static ref COPY: Regex = Regex::new(r"\bcopy\b.*?\b(text|screen|this|that|it)\b").unwrap();
    static ref OPEN_APP: Regex = Regex::new(r"(?i)^(?:open|launch|start)\s+(.+?)[\s.!]*$").unwrap();
    static ref SEARCH: Regex =
        Regex::new(r"(?i)^(?:search\s+(?:for|about|on)|google|look\s+up)\s+(.+?)[\s.?!]*$").unwrap();
    static ref ACTION_PATTERNS: RegexSet = RegexSet::new([
        r"^(open|launch|start|run)\s+",
        r"\b(open|launch|start|run)\s+(whatsapp|chrome|notepad|word|excel|powerpoint|outlook|gmail)",
        r"^send\s+(a\s+)?(message|email|whatsapp|mail)",
        r"\bsend\s+.*\s+to\s+",
        r"\bemail\s+to\s+",
        r"\bwhatsapp\s+to\s+",
        r"^(create|make|generate)\s+(a\s+)?(word|excel|powerpoint|document|spreadsheet|presentation)",
        r"\bcreate\s+.*\s+(document|presentation|spreadsheet)",
        r"^(type|write)\s+.*\s+in\s+",
        r"^search\s+(for|about|on)\s+",
        r"^google\s+",
        r"^look\s+up\s+",
        r"^find\s+information\s+(about|on)\s+",
    ])
    .unwrap();
}

const OPERATION_ACTIONS: &[&str] = &["open", "send", "type", "create", "search"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    CommandExecution,
    Clipboard,
    AiChat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseResult {
    Execution(ExecutionResult),
    Clipboard(ClipboardOutcome),
}

/// Answer to one routed request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterResponse {
    pub status: ResponseStatus,
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<Command>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResponseResult>,
    pub message: String,
}

impl RouterResponse {
    fn executed(text: &str, command: Command, result: ExecutionResult) -> Self {
        let status = if result.is_error() {
            ResponseStatus::Error
        } else {
            ResponseStatus::Success
        };
        Self {
            status,
            kind: ResponseKind::CommandExecution,
            command: text.to_string(),
            parsed: Some(command),
            message: result.message(),
            result: Some(ResponseResult::Execution(result)),
        }
    }

    fn clipboard(text: &str, outcome: ClipboardOutcome) -> Self {
        Self {
            status: ResponseStatus::Success,
            kind: ResponseKind::Clipboard,
            command: text.to_string(),
            parsed: outcome.command.clone(),
            message: outcome.message(),
            result: Some(ResponseResult::Clipboard(outcome)),
        }
    }

    fn chat(text: &str, status: ResponseStatus, message: String) -> Self {
        Self {
            status,
            kind: ResponseKind::AiChat,
            command: text.to_string(),
            parsed: None,
            result: None,
            message,
        }
    }
}

/// Whether a caller-supplied command names something to do
fn indicates_operation(command: &Command) -> bool {
    let has_action = command
        .action
        .as_deref()
        .is_some_and(|a| OPERATION_ACTIONS.contains(&a.to_lowercase().as_str()));
    command.intent != Intent::Other
        || has_action
        || (command.app.is_some() && command.recipient.is_some())
        || command.document_kind().is_some()
}

/// Commands recognised without a model call
pub fn fast_command(text: &str) -> Option<Command> {
    if let Some(caps) = OPEN_APP.captures(text) {
        let app = caps[1].trim().to_lowercase();
        if apps::is_known(&app) {
            return Some(Command::new(Intent::OpenApp).with_app(app).with_action("open").with_execution("open"));
        }
    }

    SEARCH.captures(text).map(|caps| {
        Command::new(Intent::Search)
            .with_app("chrome")
            .with_content(caps[1].trim())
            .with_action("search")
            .with_execution("open")
    })
}

pub fn is_action_text(text: &str) -> bool {
    ACTION_PATTERNS.is_match(&text.trim().to_lowercase())
}

pub struct CommandRouter {
    parser: Arc<IntentParser>,
    executor: Arc<AutomationExecutor>,
    clipboard: ClipboardWorkflow,
    chat: ChatEngine,
    greeting: Regex,
    wake_prefix: Regex,
}

impl CommandRouter {
    pub fn new(llm: SharedCompletionClient, desktop: SharedDesktop, config: &EngineConfig) -> Result<Self, EngineError> {
        let display_name = config.assistant.display_name();
        let executor = AutomationExecutor::new(
            desktop,
            ContentGenerator::new(llm.clone()),
            &config.automation,
            &display_name,
        );
        Self::with_executor(llm, executor, config)
    }

    pub fn with_executor(
        llm: SharedCompletionClient,
        executor: AutomationExecutor,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        let name = regex::escape(config.assistant.name.trim());
        if name.is_empty() {
            return Err(EngineError::Config("assistant name must not be empty".to_string()));
        }

        let greeting = Regex::new(&format!(
            r"(?i)^(hi|hello|hey|good morning|good afternoon|good evening|greetings)\s*({})?[\s!.]*$",
            name
        ))
        .map_err(|e| EngineError::Config(format!("greeting pattern: {}", e)))?;
        let wake_prefix = Regex::new(&format!(r"(?i)^(?:(?:hey|hi|hello|ok)\s+)?{}\b[\s,.!]*", name))
            .map_err(|e| EngineError::Config(format!("wake word pattern: {}", e)))?;

        let parser = Arc::new(IntentParser::new(llm.clone()));
        let executor = Arc::new(executor);
        let clipboard = ClipboardWorkflow::new(parser.clone(), executor.clone(), config.automation.script_timeout());

        Ok(Self {
            parser,
            executor,
            clipboard,
            chat: ChatEngine::new(llm, &config.assistant.display_name()),
            greeting,
            wake_prefix,
        })
    }

    /// Text with a leading "hey <name>" removed
    pub fn strip_wake_word(&self, text: &str) -> String {
        self.wake_prefix.replace(text.trim(), "").trim().to_string()
    }

    pub fn is_greeting(&self, text: &str) -> bool {
        self.greeting.is_match(text.trim())
    }

    pub async fn route(
        &self,
        session: &Session,
        text: &str,
        parsed: Option<Command>,
    ) -> Result<RouterResponse, EngineError> {
        let raw = text.trim();
        if raw.is_empty() {
            return Err(EngineError::EmptyCommand);
        }
        log::info!("[{}] Routing \"{}\"", session.id, raw);

        if self.is_greeting(raw) {
            log::info!("Greeting detected, answering with chat");
            return self.chat(session, raw, raw).await;
        }

        if let Some(command) = parsed.filter(indicates_operation) {
            log::info!("Executing supplied {} command", command.intent);
            match command.validate() {
                Ok(command) => return self.execute(raw, command).await,
                Err(e) => {
                    log::warn!("Supplied command rejected, answering with chat: {}", e);
                    return self.chat(session, raw, raw).await;
                }
            }
        }

        let clean = self.strip_wake_word(raw);
        if clean.is_empty() {
            return self.chat(session, raw, raw).await;
        }

        if let Some(response) = self.clipboard_fast_path(session, raw, &clean).await? {
            return Ok(response);
        }

        if let Some(command) = fast_command(&clean) {
            log::info!("Fast path: {} {:?}", command.intent, command.app);
            return self.execute(raw, command).await;
        }

        if is_action_text(&clean) {
            match self.parser.parse(&clean).await {
                Ok(command) if command.is_concrete() => return self.execute(raw, command).await,
                Ok(command) => {
                    log::info!("Parsed {} command has nothing to execute, answering with chat", command.intent);
                }
                Err(e) if e.degrades_to_chat() => {
                    log::warn!("Could not parse action, answering with chat: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        self.chat(session, raw, &clean).await
    }

    async fn clipboard_fast_path(
        &self,
        session: &Session,
        raw: &str,
        clean: &str,
    ) -> Result<Option<RouterResponse>, EngineError> {
        let lower = clean.to_lowercase();
        let outcome = if COPY_AND_SEND.is_match(&lower) {
            log::info!("Copy and send requested");
            self.clipboard.copy_and_send(clean, &session.clipboard).await?
        } else if PASTE.is_match(&lower) {
            log::info!("Paste from memory requested");
            self.clipboard.paste(clean, &session.clipboard).await?
        } else if COPY.is_match(&lower) {
            log::info!("Copy requested");
            self.clipboard.copy(&session.clipboard).await?
        } else {
            return Ok(None);
        };
        Ok(Some(RouterResponse::clipboard(raw, outcome)))
    }

    async fn execute(&self, raw: &str, command: Command) -> Result<RouterResponse, EngineError> {
        let result = self.executor.execute(&command).await?;
        log::info!("Command finished with status {}", result.status());
        Ok(RouterResponse::executed(raw, command, result))
    }

    async fn chat(&self, session: &Session, raw: &str, prompt: &str) -> Result<RouterResponse, EngineError> {
        match self.chat.respond(&session.conversation, prompt).await {
            Ok(reply) => Ok(RouterResponse::chat(raw, ResponseStatus::Success, reply)),
            Err(e) if e.is_quota() => Err(EngineError::Llm(e)),
            Err(_) => Ok(RouterResponse::chat(
                raw,
                ResponseStatus::Error,
                CHAT_FAILURE_MESSAGE.to_string(),
            )),
        }
    }
}
