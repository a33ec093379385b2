//! Content generation for ListenOS
//!
//! Expands a command whose content is a description ("tell him a joke",
//! "presentation about climate change") into the literal text to send, type
//! or put in a document. Failures never abort the command: the original
//! content is used instead.

use std::time::Duration;

use crate::intent::{Command, DocumentKind, Intent};
use crate::llm::{CompletionRequest, SharedCompletionClient};

const GENERATION_TIMEOUT: Duration = Duration::from_secs(20);

/// Sub-intent of a generated chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStyle {
    Joke,
    Story,
    Explanation,
    Translation,
    Advice,
    Friendly,
}

impl MessageStyle {
    /// First matching keyword wins
    pub fn detect(content: &str) -> Self {
        let lower = content.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        if has(&["joke"]) {
            MessageStyle::Joke
        } else if has(&["story"]) {
            MessageStyle::Story
        } else if has(&["tell", "explain", "about"]) {
            MessageStyle::Explanation
        } else if has(&["in hindi", "in marathi", "translate"]) {
            MessageStyle::Translation
        } else if has(&["quote", "advice", "suggest"]) {
            MessageStyle::Advice
        } else {
            MessageStyle::Friendly
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailRegister {
    Formal,
    Casual,
}

impl EmailRegister {
    pub fn detect(content: &str) -> Self {
        let lower = content.to_lowercase();
        if ["formal", "invitation", "professional"].iter().any(|w| lower.contains(w)) {
            EmailRegister::Formal
        } else {
            EmailRegister::Casual
        }
    }
}

fn language(lower: &str) -> &'static str {
    if lower.contains("hindi") {
        "Hindi"
    } else if lower.contains("marathi") {
        "Marathi"
    } else {
        "English"
    }
}

/// Prompt for the command's target and sub-intent
pub fn prompt_for(command: &Command) -> String {
    let content = command.content.as_deref().unwrap_or_default();
    let subject = command.topic.as_deref().unwrap_or(content);
    let recipient = command.recipient.as_deref().unwrap_or("them");
    let lower = content.to_lowercase();

    if let Some(kind) = command.app.as_deref().and_then(DocumentKind::from_app) {
        return document_prompt(kind, subject, content);
    }

    match command.effective_intent() {
        _ if command.is_email() => match EmailRegister::detect(content) {
            EmailRegister::Formal => format!(
                "Write a formal professional email.\nRecipient: {}\nSubject: {}\nContext: {}\n\n\
                 Include: greeting, 2-3 professional paragraphs, closing.\nKeep it polished and respectful.\n\
                 Return only the email body.",
                recipient,
                command.topic.as_deref().unwrap_or("Professional Communication"),
                content
            ),
            EmailRegister::Casual => format!(
                "Write a professional email.\nTo: {}\nAbout: {}\n\n2-3 sentences, friendly but professional.\n\
                 Return only the email body.",
                recipient, subject
            ),
        },
        Intent::SendMessage => match MessageStyle::detect(content) {
            MessageStyle::Joke => format!(
                "Tell a funny clean joke in {}. Just the joke, 2-3 lines, make it genuinely funny.",
                language(&lower)
            ),
            MessageStyle::Story => "Tell a short interesting story (4-5 sentences). Make it engaging.".to_string(),
            MessageStyle::Explanation => format!(
                "Explain about: {}\nKeep it conversational, 3-4 sentences, easy to understand for a chat message.",
                content
            ),
            MessageStyle::Translation => format!(
                "Translate to {}: {}\nJust give the translation, nothing else.",
                language(&lower),
                content
            ),
            MessageStyle::Advice => format!("Give advice about: {}\n2-3 sentences, helpful and friendly.", content),
            MessageStyle::Friendly => format!(
                "Write a friendly chat message about: {}\nTo: {}\nTopic: {}\n\n3-4 sentences, casual and conversational.",
                content, recipient, subject
            ),
        },
        _ => format!("Generate content about: {}\nBe informative, 3-4 sentences.", subject),
    }
}

fn document_prompt(kind: DocumentKind, subject: &str, content: &str) -> String {
    match kind {
        DocumentKind::Document => format!(
            "Write a detailed document about: {}\nDetails: {}\n\n\
             Format every section heading on its own line starting with \"## \" and separate paragraphs with a blank line.\n\
             Include an Introduction (3-4 sentences), 2-3 detailed sections and a Conclusion (2 sentences).\n\
             Do not use any other markdown.",
            subject, content
        ),
        DocumentKind::Presentation => format!(
            "Create presentation content about: {}\nDetails: {}\n\n\
             Write 5 slides. Put each slide title on its own line in square brackets, like [Slide Title], \
             followed by 3-5 bullet points starting with \"- \", each 10-15 words.\nBe specific and educational.",
            subject, content
        ),
        DocumentKind::Spreadsheet => format!(
            "Create spreadsheet data about: {}\nDetails: {}\n\n\
             Return only rows with cells separated by \"|\". The first row is the header, e.g. Name|Value.\n\
             Give 5-15 data rows and no other text.",
            subject, content
        ),
    }
}

pub struct ContentGenerator {
    llm: SharedCompletionClient,
}

impl ContentGenerator {
    pub fn new(llm: SharedCompletionClient) -> Self {
        Self { llm }
    }

    /// Generated text for `command`, or its original content on any failure
    pub async fn generate(&self, command: &Command) -> String {
        let fallback = command.body().unwrap_or_default().to_string();

        log::info!("Generating content for {} ({:?})", command.effective_intent(), command.app);
        let request = CompletionRequest::new(prompt_for(command))
            .temperature(0.8)
            .max_tokens(1024)
            .timeout(GENERATION_TIMEOUT);

        match self.llm.complete(request).await {
            Ok(text) if !text.trim().is_empty() => {
                let text = text.trim().to_string();
                log::info!("Generated {} characters", text.chars().count());
                text
            }
            Ok(_) => {
                log::warn!("Content generation returned nothing, using original content");
                fallback
            }
            Err(e) => {
                log::warn!("Content generation failed, using original content: {}", e);
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::testing::ScriptedLlm;
    use std::sync::Arc;

    #[test]
    fn test_message_style_detection_order() {
        assert_eq!(MessageStyle::detect("tell him a joke"), MessageStyle::Joke);
        assert_eq!(MessageStyle::detect("a story about dragons"), MessageStyle::Story);
        assert_eq!(MessageStyle::detect("explain black holes"), MessageStyle::Explanation);
        assert_eq!(MessageStyle::detect("good morning in hindi"), MessageStyle::Translation);
        assert_eq!(MessageStyle::detect("some advice on exams"), MessageStyle::Advice);
        assert_eq!(MessageStyle::detect("happy birthday"), MessageStyle::Friendly);
    }

    #[test]
    fn test_email_register() {
        assert_eq!(EmailRegister::detect("formal invitation to the launch"), EmailRegister::Formal);
        assert_eq!(EmailRegister::detect("lunch tomorrow?"), EmailRegister::Casual);
    }

    #[test]
    fn test_prompt_selection() {
        let joke = Command::new(Intent::SendMessage)
            .with_app("whatsapp")
            .with_recipient("mahesh")
            .with_content("tell him a joke in hindi");
        assert!(prompt_for(&joke).starts_with("Tell a funny clean joke in Hindi"));

        let email = Command::new(Intent::SendEmail)
            .with_recipient("john@example.com")
            .with_content("professional follow-up on the proposal");
        assert!(prompt_for(&email).starts_with("Write a formal professional email."));

        let deck = Command::new(Intent::Other).with_app("powerpoint").with_content("climate change");
        assert!(prompt_for(&deck).contains("[Slide Title]"));

        let sheet = Command::new(Intent::Other).with_app("excel").with_content("monthly budget");
        assert!(prompt_for(&sheet).contains("separated by \"|\""));
    }

    #[tokio::test]
    async fn test_generate_returns_model_text() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok("  Why did the chicken...  ".into())]));
        let generator = ContentGenerator::new(llm.clone());
        let command = Command::new(Intent::SendMessage).with_content("tell a joke");

        assert_eq!(generator.generate(&command).await, "Why did the chicken...");
        let request = &llm.requests()[0];
        assert_eq!(request.temperature, 0.8);
        assert_eq!(request.max_tokens, 1024);
    }

    #[tokio::test]
    async fn test_generate_degrades_to_original_content() {
        let llm = Arc::new(ScriptedLlm::new(vec![Err(LlmError::Timeout(GENERATION_TIMEOUT))]));
        let generator = ContentGenerator::new(llm);
        let command = Command::new(Intent::SendMessage).with_content("tell him a joke");

        assert_eq!(generator.generate(&command).await, "tell him a joke");
    }

    #[tokio::test]
    async fn test_generate_falls_back_to_topic() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok("   ".into())]));
        let generator = ContentGenerator::new(llm);
        let command = Command::new(Intent::SendEmail).with_recipient("a@b.co").with_topic("Quarterly report");

        assert_eq!(generator.generate(&command).await, "Quarterly report");
    }
}
