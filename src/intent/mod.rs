//! Structured commands for ListenOS
//!
//! A [`Command`] is what the parser (or a fast path) extracts from the user's
//! text. It is validated once at the parse boundary and then planned into an
//! [`Action`], the closed set of things the executor knows how to do.

pub mod parser;
pub mod recovery;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::automation::apps;
use crate::error::ParseError;

pub use parser::{Destination, IntentParser};

lazy_static! {
    static ref EMAIL_ADDRESS: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub fn looks_like_email(value: &str) -> bool {
    EMAIL_ADDRESS.is_match(value.trim())
}

/// What a command should do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Intent {
    OpenApp,
    TypeText,
    SendMessage,
    SendEmail,
    Search,
    #[default]
    Other,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::OpenApp => "open_app",
            Intent::TypeText => "type_text",
            Intent::SendMessage => "send_message",
            Intent::SendEmail => "send_email",
            Intent::Search => "search",
            Intent::Other => "other",
        }
    }

    /// Anything outside the known set is `Other`
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "open_app" | "open" => Intent::OpenApp,
            "type_text" | "type" => Intent::TypeText,
            "send_message" => Intent::SendMessage,
            "send_email" | "email" => Intent::SendEmail,
            "search" => Intent::Search,
            _ => Intent::Other,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Intent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Intent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = Option::<String>::deserialize(deserializer)?;
        Ok(name.map(|n| Intent::from_name(&n)).unwrap_or_default())
    }
}

/// Model output is loose: strings may be blank, "null" or numbers
pub(crate) fn loose_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    let text = match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => return Ok(None),
    };
    if text.is_empty() || text.eq_ignore_ascii_case("null") || text.eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

fn loose_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_i64().map(|n| n != 0).unwrap_or(false),
        _ => false,
    })
}

/// Parsed user command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    #[serde(default)]
    pub intent: Intent,
    #[serde(default, deserialize_with = "loose_string", skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, deserialize_with = "loose_string", skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(default, deserialize_with = "loose_string", skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    /// Literal text, or a generation prompt when `needs_generation` is set
    #[serde(default, deserialize_with = "loose_string", skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Subject or title
    #[serde(default, deserialize_with = "loose_string", skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, deserialize_with = "loose_string", skip_serializing_if = "Option::is_none")]
    pub execution: Option<String>,
    #[serde(default, deserialize_with = "loose_bool", alias = "needsAIGeneration")]
    pub needs_generation: bool,
}

impl Command {
    pub fn new(intent: Intent) -> Self {
        Self {
            intent,
            ..Self::default()
        }
    }

    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = Some(app.into());
        self
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_execution(mut self, execution: impl Into<String>) -> Self {
        self.execution = Some(execution.into());
        self
    }

    fn action_is(&self, name: &str) -> bool {
        self.action.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(name))
    }

    fn execution_is(&self, name: &str) -> bool {
        self.execution.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(name))
    }

    fn app_is(&self, check: impl Fn(&str) -> bool) -> bool {
        self.app.as_deref().is_some_and(check)
    }

    /// Content, or the topic when no content was given
    pub fn body(&self) -> Option<&str> {
        self.content.as_deref().or(self.topic.as_deref())
    }

    pub fn is_email(&self) -> bool {
        self.intent == Intent::SendEmail
            || self.app_is(apps::is_email_client)
            || self.recipient.as_deref().is_some_and(looks_like_email)
    }

    /// `other` commands are remapped by their action
    pub fn effective_intent(&self) -> Intent {
        if self.intent != Intent::Other {
            return self.intent;
        }
        match self.action.as_deref().map(str::to_lowercase).as_deref() {
            Some("type") => Intent::TypeText,
            Some("open") => Intent::OpenApp,
            Some("search") => Intent::Search,
            Some("send") if self.is_email() => Intent::SendEmail,
            Some("send") => Intent::SendMessage,
            _ => Intent::Other,
        }
    }

    /// Office document requested through Word, PowerPoint or Excel
    pub fn document_kind(&self) -> Option<DocumentKind> {
        let kind = self.app.as_deref().and_then(DocumentKind::from_app)?;
        self.content.as_ref()?;
        let wants_creation = self.action_is("create")
            || self.execution_is("create")
            || self.needs_generation
            || self.intent == Intent::Other;
        wants_creation.then_some(kind)
    }

    /// Whether executing this command would do anything
    pub fn is_concrete(&self) -> bool {
        self.effective_intent() != Intent::Other || self.document_kind().is_some()
    }

    /// Check the fields the declared intent needs
    pub fn validate(self) -> Result<Self, ParseError> {
        if self.document_kind().is_some() {
            return Ok(self);
        }

        let intent = self.effective_intent();
        let missing = |field: &'static str| Err(ParseError::MissingField { intent, field });

        match intent {
            Intent::OpenApp if self.app.is_none() => missing("app"),
            Intent::TypeText if self.content.is_none() => missing("content"),
            Intent::SendMessage if self.body().is_none() => missing("content"),
            Intent::SendEmail if self.recipient.is_none() => missing("recipient"),
            Intent::Search if self.body().is_none() => missing("content"),
            _ => Ok(self),
        }
    }

    /// Decide what the executor will do. Call on a validated command.
    pub fn plan(&self) -> Action {
        if let Some(kind) = self.document_kind() {
            return Action::CreateDocument {
                kind,
                title: self.topic.clone(),
                content: self.content.clone().unwrap_or_default(),
            };
        }

        let intent = self.effective_intent();
        let text = self.body().unwrap_or_default().to_string();

        if intent == Intent::Search || self.action_is("search") {
            let browser = match self.app.as_deref() {
                Some(app) if apps::is_browser(app) => app.to_string(),
                _ => "chrome".to_string(),
            };
            return Action::Search { browser, query: text };
        }

        if intent == Intent::OpenApp || (self.execution_is("open") && intent != Intent::SendMessage && intent != Intent::SendEmail) {
            if let Some(app) = &self.app {
                return Action::Open {
                    app: app.clone(),
                    then_type: self.content.clone(),
                };
            }
        }

        match intent {
            Intent::TypeText => Action::Type {
                app: self.app.clone(),
                text,
            },
            Intent::SendEmail | Intent::SendMessage if self.is_email() => match &self.recipient {
                Some(recipient) => Action::SendEmail {
                    recipient: recipient.clone(),
                    subject: self.topic.clone(),
                    body: self.content.clone().unwrap_or_default(),
                },
                None => Action::Unsupported { intent },
            },
            Intent::SendMessage => Action::SendMessage {
                app: self.app.clone().unwrap_or_else(|| "whatsapp".to_string()),
                recipient: self.recipient.clone(),
                text,
            },
            _ => Action::Unsupported { intent },
        }
    }
}

/// Kind of office file to create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Document,
    Presentation,
    Spreadsheet,
}

impl DocumentKind {
    pub fn from_app(app: &str) -> Option<Self> {
        let app = app.trim().to_lowercase();
        if app.contains("powerpoint") || app == "ppt" {
            Some(DocumentKind::Presentation)
        } else if app.contains("word") {
            Some(DocumentKind::Document)
        } else if app.contains("excel") {
            Some(DocumentKind::Spreadsheet)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Document => "Document",
            DocumentKind::Presentation => "Presentation",
            DocumentKind::Spreadsheet => "Spreadsheet",
        }
    }

    pub fn app(&self) -> &'static str {
        match self {
            DocumentKind::Document => "word",
            DocumentKind::Presentation => "powerpoint",
            DocumentKind::Spreadsheet => "excel",
        }
    }

    /// Office file extension
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Document => "docx",
            DocumentKind::Presentation => "pptx",
            DocumentKind::Spreadsheet => "xlsx",
        }
    }

    /// Plain-text extension used when office automation is unavailable
    pub fn text_extension(&self) -> &'static str {
        match self {
            DocumentKind::Spreadsheet => "csv",
            _ => "md",
        }
    }
}

/// What the executor does for a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Open {
        app: String,
        then_type: Option<String>,
    },
    Type {
        app: Option<String>,
        text: String,
    },
    SendMessage {
        app: String,
        recipient: Option<String>,
        text: String,
    },
    SendEmail {
        recipient: String,
        subject: Option<String>,
        body: String,
    },
    Search {
        browser: String,
        query: String,
    },
    CreateDocument {
        kind: DocumentKind,
        title: Option<String>,
        content: String,
    },
    Unsupported {
        intent: Intent,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Command {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_deserialize_model_shape() {
        let command = parse(
            r#"{"intent":"send_message","app":"whatsapp","recipient":"mahesh","content":"tell him a joke","action":"send","execution":"send","needsAIGeneration":true}"#,
        );
        assert_eq!(command.intent, Intent::SendMessage);
        assert_eq!(command.recipient.as_deref(), Some("mahesh"));
        assert!(command.needs_generation);
        assert_eq!(command.topic, None);
    }

    #[test]
    fn test_loose_fields() {
        let command = parse(r#"{"intent":"OPEN_APP","app":"  ","content":null,"topic":"null","needsGeneration":"true"}"#);
        assert_eq!(command.intent, Intent::OpenApp);
        assert_eq!(command.app, None);
        assert_eq!(command.content, None);
        assert_eq!(command.topic, None);
        assert!(command.needs_generation);

        let unknown = parse(r#"{"intent":"play_music"}"#);
        assert_eq!(unknown.intent, Intent::Other);
        let missing = parse(r#"{"app":"notepad"}"#);
        assert_eq!(missing.intent, Intent::Other);
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let command = Command::new(Intent::TypeText).with_app("notepad").with_content("hi");
        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(value["intent"], "type_text");
        assert_eq!(value["needsGeneration"], false);
        assert!(value.get("recipient").is_none());
    }

    #[test]
    fn test_validate_rejects_missing_required_fields() {
        let err = Command::new(Intent::OpenApp).validate().unwrap_err();
        assert_eq!(err, ParseError::MissingField { intent: Intent::OpenApp, field: "app" });

        let err = Command::new(Intent::SendEmail).with_content("hi").validate().unwrap_err();
        assert_eq!(err, ParseError::MissingField { intent: Intent::SendEmail, field: "recipient" });

        let err = Command::new(Intent::TypeText).with_app("notepad").validate().unwrap_err();
        assert!(matches!(err, ParseError::MissingField { field: "content", .. }));

        assert!(Command::new(Intent::Search).with_topic("rust").validate().is_ok());
        assert!(Command::new(Intent::Other).validate().is_ok());
    }

    #[test]
    fn test_validate_uses_remapped_intent() {
        let err = Command::new(Intent::Other).with_action("type").validate().unwrap_err();
        assert_eq!(err, ParseError::MissingField { intent: Intent::TypeText, field: "content" });
    }

    #[test]
    fn test_other_is_remapped_by_action() {
        let send = Command::new(Intent::Other).with_action("send").with_recipient("a@b.com");
        assert_eq!(send.effective_intent(), Intent::SendEmail);
        let send = Command::new(Intent::Other).with_action("send").with_recipient("vishal");
        assert_eq!(send.effective_intent(), Intent::SendMessage);
        assert_eq!(Command::new(Intent::Other).effective_intent(), Intent::Other);
        assert!(!Command::new(Intent::Other).with_app("notepad").is_concrete());
    }

    #[test]
    fn test_plan_open_then_type() {
        let command = Command::new(Intent::TypeText)
            .with_app("notepad")
            .with_content("hello world")
            .with_action("type")
            .with_execution("open");
        assert_eq!(
            command.plan(),
            Action::Open { app: "notepad".into(), then_type: Some("hello world".into()) }
        );

        let type_only = Command::new(Intent::TypeText).with_content("hi").with_execution("type");
        assert_eq!(type_only.plan(), Action::Type { app: None, text: "hi".into() });
    }

    #[test]
    fn test_plan_search_defaults_to_chrome() {
        let command = Command::new(Intent::Search)
            .with_app("google")
            .with_content("python tutorials")
            .with_execution("open");
        assert_eq!(
            command.plan(),
            Action::Search { browser: "chrome".into(), query: "python tutorials".into() }
        );

        let firefox = Command::new(Intent::Search).with_app("firefox").with_topic("rust");
        assert_eq!(firefox.plan(), Action::Search { browser: "firefox".into(), query: "rust".into() });
    }

    #[test]
    fn test_plan_email_vs_message() {
        let email = Command::new(Intent::SendMessage)
            .with_recipient("john@example.com")
            .with_content("see you");
        assert!(matches!(email.plan(), Action::SendEmail { ref recipient, subject: None, .. } if recipient == "john@example.com"));

        let message = Command::new(Intent::SendMessage).with_recipient("vishal").with_content("hello");
        assert_eq!(
            message.plan(),
            Action::SendMessage { app: "whatsapp".into(), recipient: Some("vishal".into()), text: "hello".into() }
        );
    }

    #[test]
    fn test_plan_document() {
        let command = Command::new(Intent::Other)
            .with_app("PowerPoint")
            .with_content("climate change")
            .with_topic("Climate");
        assert_eq!(
            command.plan(),
            Action::CreateDocument {
                kind: DocumentKind::Presentation,
                title: Some("Climate".into()),
                content: "climate change".into(),
            }
        );

        // typing into Word is not a document request
        let typing = Command::new(Intent::TypeText).with_app("word").with_content("hello");
        assert_eq!(typing.document_kind(), None);
    }

    #[test]
    fn test_plan_unsupported() {
        assert_eq!(Command::new(Intent::Other).plan(), Action::Unsupported { intent: Intent::Other });
    }

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("john@example.com"));
        assert!(!looks_like_email("john"));
        assert!(!looks_like_email("john@localhost"));
    }
}
