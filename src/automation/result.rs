//! Outcome of an executed command and its user-facing message

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::intent::{DocumentKind, Intent};

/// Mail client that delivered an e-mail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailClient {
    Gmail,
    Outlook,
}

impl fmt::Display for EmailClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmailClient::Gmail => write!(f, "Gmail"),
            EmailClient::Outlook => write!(f, "Outlook"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    UnsupportedIntent,
    MissingRecipient,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::UnsupportedIntent => write!(f, "unsupported_intent"),
            IgnoreReason::MissingRecipient => write!(f, "missing_recipient"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionResult {
    Opened {
        app: String,
    },
    OpenedAndTyped {
        app: String,
        length: usize,
    },
    Typed {
        app: String,
        length: usize,
    },
    Sent {
        app: String,
        recipient: String,
        length: usize,
    },
    EmailSent {
        recipient: String,
        subject: String,
        length: usize,
        client: EmailClient,
    },
    SearchCompleted {
        app: String,
        query: String,
        url: String,
    },
    #[serde(rename_all = "camelCase")]
    DocumentCreated {
        title: String,
        file_path: PathBuf,
    },
    #[serde(rename_all = "camelCase")]
    PresentationCreated {
        title: String,
        file_path: PathBuf,
    },
    #[serde(rename_all = "camelCase")]
    SpreadsheetCreated {
        title: String,
        file_path: PathBuf,
    },
    TypedForSend {
        app: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        recipient: Option<String>,
        length: usize,
    },
    Ignored {
        reason: IgnoreReason,
        intent: Intent,
    },
    Error {
        message: String,
    },
}

impl ExecutionResult {
    pub fn created(kind: DocumentKind, title: String, file_path: PathBuf) -> Self {
        match kind {
            DocumentKind::Document => ExecutionResult::DocumentCreated { title, file_path },
            DocumentKind::Presentation => ExecutionResult::PresentationCreated { title, file_path },
            DocumentKind::Spreadsheet => ExecutionResult::SpreadsheetCreated { title, file_path },
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ExecutionResult::Error {
            message: message.into(),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            ExecutionResult::Opened { .. } => "opened",
            ExecutionResult::OpenedAndTyped { .. } => "opened_and_typed",
            ExecutionResult::Typed { .. } => "typed",
            ExecutionResult::Sent { .. } => "sent",
            ExecutionResult::EmailSent { .. } => "email_sent",
            ExecutionResult::SearchCompleted { .. } => "search_completed",
            ExecutionResult::DocumentCreated { .. } => "document_created",
            ExecutionResult::PresentationCreated { .. } => "presentation_created",
            ExecutionResult::SpreadsheetCreated { .. } => "spreadsheet_created",
            ExecutionResult::TypedForSend { .. } => "typed_for_send",
            ExecutionResult::Ignored { .. } => "ignored",
            ExecutionResult::Error { .. } => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ExecutionResult::Error { .. })
    }

    /// One fixed sentence per status
    pub fn message(&self) -> String {
        match self {
            ExecutionResult::Opened { app } => format!("{} has been opened successfully!", app),
            ExecutionResult::OpenedAndTyped { app, length } => {
                format!("{} opened and {} characters typed successfully!", app, length)
            }
            ExecutionResult::Typed { app, length } => {
                format!("Successfully typed {} characters in {}!", length, app)
            }
            ExecutionResult::Sent { app, recipient, length } => {
                format!("Message sent to {} via {}! ({} characters)", recipient, app, length)
            }
            ExecutionResult::EmailSent { recipient, length, .. } => {
                format!("Email sent to {} successfully! ({} characters)", recipient, length)
            }
            ExecutionResult::SearchCompleted { query, .. } => format!("Search completed for: \"{}\"", query),
            ExecutionResult::DocumentCreated { title, file_path } => created_message("Document", title, file_path),
            ExecutionResult::PresentationCreated { title, file_path } => {
                created_message("Presentation", title, file_path)
            }
            ExecutionResult::SpreadsheetCreated { title, file_path } => {
                created_message("Spreadsheet", title, file_path)
            }
            ExecutionResult::TypedForSend { recipient, .. } => format!(
                "Message typed and ready to send to {}!",
                recipient.as_deref().unwrap_or("the open chat")
            ),
            ExecutionResult::Ignored { reason, .. } => format!("Command was not executed: {}", reason),
            ExecutionResult::Error { message } => message.clone(),
        }
    }
}

fn created_message(kind: &str, title: &str, file_path: &std::path::Path) -> String {
    format!("{} \"{}\" created successfully!\nFile: {}", kind, title, file_path.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let result = ExecutionResult::OpenedAndTyped { app: "notepad".into(), length: 11 };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "opened_and_typed");
        assert_eq!(value["app"], "notepad");
        assert_eq!(value["length"], 11);

        let created = ExecutionResult::created(
            DocumentKind::Presentation,
            "Climate".into(),
            PathBuf::from("/tmp/Climate_1.pptx"),
        );
        let value = serde_json::to_value(&created).unwrap();
        assert_eq!(value["status"], "presentation_created");
        assert_eq!(value["filePath"], "/tmp/Climate_1.pptx");

        let ignored = ExecutionResult::Ignored {
            reason: IgnoreReason::UnsupportedIntent,
            intent: Intent::Other,
        };
        let value = serde_json::to_value(&ignored).unwrap();
        assert_eq!(value["reason"], "unsupported_intent");
        assert_eq!(value["intent"], "other");
    }

    #[test]
    fn test_status_matches_serialized_tag() {
        let results = [
            ExecutionResult::Opened { app: "chrome".into() },
            ExecutionResult::Typed { app: "active".into(), length: 3 },
            ExecutionResult::EmailSent {
                recipient: "a@b.co".into(),
                subject: "Hi".into(),
                length: 2,
                client: EmailClient::Outlook,
            },
            ExecutionResult::TypedForSend { app: "slack".into(), recipient: None, length: 1 },
            ExecutionResult::error("boom"),
        ];
        for result in results {
            let value = serde_json::to_value(&result).unwrap();
            assert_eq!(value["status"], result.status());
        }
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ExecutionResult::Opened { app: "notepad".into() }.message(),
            "notepad has been opened successfully!"
        );
        assert_eq!(
            ExecutionResult::OpenedAndTyped { app: "notepad".into(), length: 11 }.message(),
            "notepad opened and 11 characters typed successfully!"
        );
        assert_eq!(
            ExecutionResult::Sent { app: "whatsapp".into(), recipient: "vishal".into(), length: 5 }.message(),
            "Message sent to vishal via whatsapp! (5 characters)"
        );
        assert_eq!(
            ExecutionResult::SearchCompleted {
                app: "chrome".into(),
                query: "rust".into(),
                url: String::new(),
            }
            .message(),
            "Search completed for: \"rust\""
        );
        assert_eq!(
            ExecutionResult::created(DocumentKind::Document, "Notes".into(), PathBuf::from("/tmp/n.docx")).message(),
            "Document \"Notes\" created successfully!\nFile: /tmp/n.docx"
        );
        assert_eq!(
            ExecutionResult::Ignored { reason: IgnoreReason::MissingRecipient, intent: Intent::SendMessage }.message(),
            "Command was not executed: missing_recipient"
        );
        assert_eq!(ExecutionResult::error("Focus failed").message(), "Focus failed");
    }
}
