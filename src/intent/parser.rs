//! Model-backed intent parser
//!
//! One completion call per command with a fixed few-shot prompt, followed by
//! JSON recovery and validation. Content failures of the remote call are
//! retried inside the client; parse failures are not retried here.

use serde::Deserialize;
use std::time::Duration;

use super::recovery::recover;
use super::{loose_string, Command};
use crate::automation::apps;
use crate::error::EngineError;
use crate::llm::{CompletionRequest, SharedCompletionClient};

const PARSE_TIMEOUT: Duration = Duration::from_secs(15);
const DESTINATION_TIMEOUT: Duration = Duration::from_secs(10);

fn command_prompt(text: &str) -> String {
    format!(
        r#"You are a voice assistant. Parse this command into JSON.

Command: "{text}"

Detect:
1. **intent**: open_app, type_text, send_message, send_email, search, other
2. **app**: whatsapp, chrome, notepad, word, excel, powerpoint, outlook, gmail, etc.
3. **recipient**: person's name or e-mail address (for messages/emails)
4. **content**: message text, email body or text to type
5. **topic**: email subject or document title
6. **action**: send, open, type, search, create
7. **execution**: how to execute (send/open/type/search/create)
8. **needsAIGeneration**: true if content is a description of what to write (like "tell a joke", "write formal email", "presentation about climate change") rather than the literal text

Examples:
- "send whatsapp message to vishal and say hello vishal"
  → {{"intent":"send_message","app":"whatsapp","recipient":"vishal","content":"hello vishal","action":"send","execution":"send","needsAIGeneration":false}}

- "send whatsapp message to mahesh tell him a joke"
  → {{"intent":"send_message","app":"whatsapp","recipient":"mahesh","content":"tell him a joke","action":"send","execution":"send","needsAIGeneration":true}}

- "send email to john@example.com about meeting tomorrow"
  → {{"intent":"send_email","app":"gmail","recipient":"john@example.com","content":"meeting tomorrow","topic":"Meeting Tomorrow","action":"send","execution":"send","needsAIGeneration":true}}

- "open notepad and type hello world"
  → {{"intent":"type_text","app":"notepad","content":"hello world","action":"type","execution":"open","needsAIGeneration":false}}

- "search for python tutorials"
  → {{"intent":"search","app":"chrome","content":"python tutorials","action":"search","execution":"open","needsAIGeneration":false}}

- "create a presentation about climate change"
  → {{"intent":"other","app":"powerpoint","content":"climate change","topic":"Climate Change","action":"create","execution":"create","needsAIGeneration":true}}

Return only valid JSON, no explanation."#,
        text = text.replace('"', "'")
    )
}

fn destination_prompt(phrase: &str) -> String {
    format!(
        r#"Extract where to paste/send:
Command: "{phrase}"

If mentions:
- "whatsapp", "telegram" or another chat app with a name → {{"app":"whatsapp","recipient":"name"}}
- only a name like "mahesh", "john" → {{"recipient":"name"}}
- "word" → {{"app":"word"}}
- "notepad" → {{"app":"notepad"}}
- "excel" → {{"app":"excel"}}
- If no app mentioned → {{"app":"active"}}

JSON only:"#,
        phrase = phrase.replace('"', "'")
    )
}

/// Raw destination as the model returns it
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DestinationHint {
    #[serde(default, deserialize_with = "loose_string")]
    pub app: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub recipient: Option<String>,
}

/// Where copied text should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Chat application, addressed to a contact when one was named
    Messaging {
        app: String,
        recipient: Option<String>,
    },
    /// Desktop application such as Word or Notepad
    App { app: String },
    /// Whatever window currently has focus
    Focused,
}

impl Destination {
    pub fn from_hint(hint: DestinationHint) -> Self {
        let app = hint
            .app
            .map(|a| a.to_lowercase())
            .filter(|a| !matches!(a.as_str(), "active" | "current" | "focused"));

        match (app, hint.recipient) {
            (Some(app), recipient) if apps::is_messenger(&app) => Destination::Messaging { app, recipient },
            (None, Some(recipient)) => Destination::Messaging {
                app: "whatsapp".to_string(),
                recipient: Some(recipient),
            },
            (Some(app), _) if apps::is_known(&app) => Destination::App { app },
            _ => Destination::Focused,
        }
    }
}

pub struct IntentParser {
    llm: SharedCompletionClient,
}

impl IntentParser {
    pub fn new(llm: SharedCompletionClient) -> Self {
        Self { llm }
    }

    /// Turn free text into a validated command
    pub async fn parse(&self, text: &str) -> Result<Command, EngineError> {
        log::info!("Parsing command with AI: {}", text);

        let request = CompletionRequest::new(command_prompt(text))
            .temperature(0.2)
            .max_tokens(512)
            .timeout(PARSE_TIMEOUT);
        let raw = self.llm.complete(request).await?;

        let command = recover::<Command>(&raw)
            .and_then(Command::validate)
            .map_err(|e| {
                log::warn!("Could not recover a command from model output: {}", e);
                e
            })?;

        log::info!(
            "Parsed command: intent={} app={:?} recipient={:?}",
            command.intent,
            command.app,
            command.recipient
        );
        Ok(command)
    }

    /// Where to paste or send remembered text, from the user's phrase
    pub async fn parse_destination(&self, phrase: &str) -> Result<Destination, EngineError> {
        let request = CompletionRequest::new(destination_prompt(phrase))
            .temperature(0.1)
            .max_tokens(256)
            .timeout(DESTINATION_TIMEOUT);
        let raw = self.llm.complete(request).await?;

        let destination = Destination::from_hint(recover::<DestinationHint>(&raw)?);
        log::info!("Destination for '{}': {:?}", phrase, destination);
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::intent::Intent;
    use crate::llm::LlmError;
    use crate::testing::ScriptedLlm;
    use std::sync::Arc;

    fn parser(responses: Vec<Result<String, LlmError>>) -> (IntentParser, Arc<ScriptedLlm>) {
        let llm = Arc::new(ScriptedLlm::new(responses));
        (IntentParser::new(llm.clone()), llm)
    }

    #[tokio::test]
    async fn test_parse_builds_prompt_and_recovers_command() {
        let (parser, llm) = parser(vec![Ok(
            "```json\n{\"intent\":\"type_text\",\"app\":\"notepad\",\"content\":\"hello world\",\"action\":\"type\",\"execution\":\"open\",\"needsAIGeneration\":false}\n```"
                .into(),
        )]);

        let command = parser.parse("open notepad and type hello world").await.unwrap();
        assert_eq!(command.intent, Intent::TypeText);
        assert_eq!(command.app.as_deref(), Some("notepad"));
        assert_eq!(command.content.as_deref(), Some("hello world"));

        let request = &llm.requests()[0];
        assert!(request.prompt.contains("Command: \"open notepad and type hello world\""));
        assert_eq!(request.temperature, 0.2);
        assert_eq!(request.max_tokens, 512);
    }

    #[tokio::test]
    async fn test_parse_rejects_missing_required_field() {
        let (parser, _) = parser(vec![Ok(r#"{"intent":"send_email","content":"hi"}"#.into())]);

        let err = parser.parse("email hi").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Parse(ParseError::MissingField { intent: Intent::SendEmail, field: "recipient" })
        ));
    }

    #[tokio::test]
    async fn test_parse_error_is_not_retried() {
        let (parser, llm) = parser(vec![Ok("{\"intent\": \"search\"".into()), Ok("{}".into())]);

        let err = parser.parse("search").await.unwrap_err();
        assert!(matches!(err, EngineError::Parse(ParseError::Unbalanced)));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_quota_propagates() {
        let (parser, _) = parser(vec![Err(LlmError::QuotaExceeded("429".into()))]);
        let err = parser.parse("open chrome please").await.unwrap_err();
        assert!(err.is_quota());
    }

    #[tokio::test]
    async fn test_parse_destination() {
        let (parser, llm) = parser(vec![
            Ok(r#"{"app":"whatsapp","recipient":"mahesh"}"#.into()),
            Ok(r#"{"recipient":"john"}"#.into()),
            Ok(r#"{"app":"Word"}"#.into()),
            Ok(r#"{"app":"active"}"#.into()),
        ]);

        assert_eq!(
            parser.parse_destination("send it to mahesh on whatsapp").await.unwrap(),
            Destination::Messaging { app: "whatsapp".into(), recipient: Some("mahesh".into()) }
        );
        assert_eq!(
            parser.parse_destination("send this to john").await.unwrap(),
            Destination::Messaging { app: "whatsapp".into(), recipient: Some("john".into()) }
        );
        assert_eq!(
            parser.parse_destination("paste it in word").await.unwrap(),
            Destination::App { app: "word".into() }
        );
        assert_eq!(parser.parse_destination("paste it").await.unwrap(), Destination::Focused);

        assert_eq!(llm.requests()[0].temperature, 0.1);
    }

    #[test]
    fn test_unknown_app_goes_to_focused_window() {
        let hint = DestinationHint { app: Some("mystery".into()), recipient: None };
        assert_eq!(Destination::from_hint(hint), Destination::Focused);
    }
}
