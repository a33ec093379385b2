//! Error types shared across the engine

use thiserror::Error;

use crate::automation::AutomationError;
use crate::intent::Intent;
use crate::llm::LlmError;

/// Model output that could not be turned into a valid command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("No valid JSON boundaries found")]
    NoJson,

    #[error("Unbalanced braces in model response")]
    Unbalanced,

    #[error("Model response is not valid command JSON: {0}")]
    Malformed(String),

    #[error("Command with intent {intent} is missing required field '{field}'")]
    MissingField { intent: Intent, field: &'static str },
}

/// Failure of a routed request
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Automation(#[from] AutomationError),

    /// Paste or send attempted before anything was copied
    #[error("{0}")]
    MissingState(String),

    #[error("command is required")]
    EmptyCommand,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    pub fn is_quota(&self) -> bool {
        matches!(self, EngineError::Llm(err) if err.is_quota())
    }

    /// Errors the router answers with a chat turn instead of an error response
    pub fn degrades_to_chat(&self) -> bool {
        match self {
            EngineError::Parse(_) => true,
            EngineError::Llm(err) => !err.is_quota(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_is_not_degraded() {
        let quota = EngineError::from(LlmError::QuotaExceeded("429".into()));
        assert!(quota.is_quota());
        assert!(!quota.degrades_to_chat());

        let parse = EngineError::from(ParseError::Unbalanced);
        assert!(parse.degrades_to_chat());

        let missing = EngineError::MissingState("empty".into());
        assert!(!missing.degrades_to_chat());
    }
}
