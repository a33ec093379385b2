//! Command execution
//!
//! Plans a [`Command`] into an [`Action`] and drives the desktop through the
//! matching sequence: launch, settle, focus, type. Every sequence is a
//! strictly ordered chain of awaited steps.

use std::path::PathBuf;
use std::time::Duration;

use super::apps::{self, LaunchTarget};
use super::documents::DocumentWriter;
use super::focus::WindowFocusManager;
use super::keyboard::Typist;
use super::platform::{KeyPress, Platform, SharedDesktop};
use super::result::{EmailClient, ExecutionResult, IgnoreReason};
use super::scripts;
use super::AutomationError;
use crate::config::AutomationConfig;
use crate::generator::ContentGenerator;
use crate::intent::{Action, Command, DocumentKind, Intent};
use crate::retry::first_success;

const SEARCH_URL: &str = "https://www.google.com/search?q=";
const GMAIL_COMPOSE_URL: &str = "https://mail.google.com/mail/?view=cm&fs=1";
const TYPE_SETTLE_MS: u64 = 500;
const MIN_MESSAGE_CHAR_DELAY_MS: u64 = 40;

/// One step of a scripted UI sequence
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    /// Text with its nominal per-character delay
    Type(String, u64),
    Press(KeyPress),
    Wait(u64),
}

pub struct AutomationExecutor {
    desktop: SharedDesktop,
    focus: WindowFocusManager,
    typist: Typist,
    documents: DocumentWriter,
    generator: ContentGenerator,
    config: AutomationConfig,
    assistant: String,
}

impl AutomationExecutor {
    pub fn new(
        desktop: SharedDesktop,
        generator: ContentGenerator,
        config: &AutomationConfig,
        assistant: &str,
    ) -> Self {
        Self {
            focus: WindowFocusManager::new(desktop.clone(), config),
            typist: Typist::new(desktop.clone(), config),
            documents: DocumentWriter::new(desktop.clone(), std::env::temp_dir(), config.script_timeout()),
            desktop,
            generator,
            config: config.clone(),
            assistant: assistant.to_string(),
        }
    }

    /// Write generated documents somewhere other than the temp directory
    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.documents = DocumentWriter::new(self.desktop.clone(), dir, self.config.script_timeout());
        self
    }

    pub fn desktop(&self) -> &SharedDesktop {
        &self.desktop
    }

    /// Run a validated command
    pub async fn execute(&self, command: &Command) -> Result<ExecutionResult, AutomationError> {
        let command = self.expand(command).await;
        let action = command.plan();
        log::info!("Executing {:?}", action);

        match action {
            Action::Open { app, then_type } => self.open(app, then_type).await,
            Action::Type { app, text } => self.type_into(app, &text).await,
            Action::SendMessage { app, recipient, text } => self.send_message(app, recipient, &text).await,
            Action::SendEmail { recipient, subject, body } => {
                let subject = subject.unwrap_or_else(|| format!("Message from {} AI", self.assistant));
                self.send_email(recipient, subject, &body).await
            }
            Action::Search { browser, query } => self.search(browser, query).await,
            Action::CreateDocument { kind, title, content } => self.create_document(kind, title, &content).await,
            Action::Unsupported { intent } => {
                log::warn!("No automation for intent {} (app {:?})", intent, command.app);
                Ok(ExecutionResult::Ignored {
                    reason: IgnoreReason::UnsupportedIntent,
                    intent,
                })
            }
        }
    }

    /// Replace descriptive content with generated text where needed
    async fn expand(&self, command: &Command) -> Command {
        let mut expanded = command.clone();
        let topic_only_message = command.effective_intent() == Intent::SendMessage
            && command.content.is_none()
            && command.topic.is_some();

        if command.needs_generation || command.document_kind().is_some() || topic_only_message {
            expanded.content = Some(self.generator.generate(command).await);
        }
        expanded
    }

    async fn pause_ms(&self, ms: u64) {
        if ms > 0 {
            self.desktop.pause(Duration::from_millis(ms)).await;
        }
    }

    /// Start `app` and wait for it to settle
    pub async fn launch(&self, app: &str) -> Result<(), AutomationError> {
        let target = apps::launch_target(app);
        log::info!("Opening {} ({})", app, target.as_str());

        match (self.desktop.platform(), &target) {
            (Platform::Windows, LaunchTarget::Uri(uri)) => {
                self.desktop
                    .run_script(&scripts::start_uri(uri), self.config.script_timeout())
                    .await?;
            }
            (Platform::Windows, LaunchTarget::Program(program)) => {
                self.desktop
                    .run_script(&scripts::start_program(program), self.config.script_timeout())
                    .await?;
            }
            (Platform::MacOs, LaunchTarget::Uri(uri)) => self.desktop.launch("open", &[uri.clone()]).await?,
            (Platform::MacOs, LaunchTarget::Program(_)) => {
                self.desktop
                    .launch("open", &["-a".to_string(), apps::mac_name(app)])
                    .await?
            }
            (Platform::Linux, LaunchTarget::Uri(uri)) => self.desktop.launch("xdg-open", &[uri.clone()]).await?,
            (Platform::Linux, LaunchTarget::Program(program)) => self.desktop.launch(program, &[]).await?,
        }

        let settle = match target {
            LaunchTarget::Uri(_) => self.config.uri_launch_settle_ms,
            LaunchTarget::Program(_) => self.config.launch_settle_ms,
        };
        self.pause_ms(settle).await;
        Ok(())
    }

    /// Launch, then bring to the foreground
    pub async fn open_app(&self, app: &str) -> Result<(), AutomationError> {
        self.launch(app).await?;
        self.focus.focus(app).await
    }

    async fn focus_or_open(&self, app: &str) -> Result<(), AutomationError> {
        match self.focus.focus(app).await {
            Ok(()) => Ok(()),
            Err(e) => {
                log::info!("{} not reachable ({}), opening it", app, e);
                self.open_app(app).await
            }
        }
    }

    async fn open(&self, app: String, then_type: Option<String>) -> Result<ExecutionResult, AutomationError> {
        let Some(text) = then_type else {
            self.launch(&app).await?;
            if let Err(e) = self.focus.focus(&app).await {
                log::warn!("{} was started but not focused: {}", app, e);
            }
            return Ok(ExecutionResult::Opened { app });
        };

        self.open_app(&app).await?;
        self.pause_ms(self.config.open_then_type_delay_ms).await;
        let length = self.typist.type_text(&text, self.config.per_char_delay_ms).await?;
        Ok(ExecutionResult::OpenedAndTyped { app, length })
    }

    async fn type_into(&self, app: Option<String>, text: &str) -> Result<ExecutionResult, AutomationError> {
        if let Some(app) = &app {
            self.focus_or_open(app).await?;
        }
        self.pause_ms(TYPE_SETTLE_MS).await;

        let length = self.typist.type_text(text, self.config.per_char_delay_ms).await?;
        Ok(ExecutionResult::Typed {
            app: app.unwrap_or_else(|| "active".to_string()),
            length,
        })
    }

    async fn run_steps(&self, steps: &[Step]) -> Result<(), AutomationError> {
        for step in steps {
            match step {
                Step::Type(text, delay) => {
                    self.typist.type_text(text, *delay).await?;
                }
                Step::Press(key) => self.typist.press(*key).await?,
                Step::Wait(ms) => self.pause_ms(*ms).await,
            }
        }
        Ok(())
    }

    async fn send_message(
        &self,
        app: String,
        recipient: Option<String>,
        text: &str,
    ) -> Result<ExecutionResult, AutomationError> {
        let delay = self.config.per_char_delay_ms.max(MIN_MESSAGE_CHAR_DELAY_MS);

        if !apps::is_whatsapp(&app) {
            self.focus_or_open(&app).await?;
            let length = self.typist.type_text(text, delay).await?;
            return Ok(ExecutionResult::TypedForSend { app, recipient, length });
        }

        let Some(recipient) = recipient else {
            log::warn!("WhatsApp message without a recipient, nothing sent");
            return Ok(ExecutionResult::Ignored {
                reason: IgnoreReason::MissingRecipient,
                intent: Intent::SendMessage,
            });
        };

        log::info!("Sending WhatsApp message to {}", recipient);
        self.focus_or_open(&app).await?;
        self.run_steps(&[
            Step::Wait(700),
            Step::Press(KeyPress::Shortcut('f')),
            Step::Wait(700),
            Step::Press(KeyPress::Shortcut('a')),
            Step::Wait(120),
            Step::Press(KeyPress::Backspace),
            Step::Wait(150),
            Step::Type(recipient.clone(), self.config.recipient_char_delay_ms),
            Step::Wait(900),
            Step::Press(KeyPress::Down),
            Step::Wait(350),
            Step::Press(KeyPress::Enter),
            Step::Wait(700),
            Step::Type(text.to_string(), delay),
            Step::Wait(400),
            Step::Press(KeyPress::Enter),
        ])
        .await?;

        Ok(ExecutionResult::Sent {
            app,
            recipient,
            length: text.chars().count(),
        })
    }

    async fn send_email(
        &self,
        recipient: String,
        subject: String,
        body: &str,
    ) -> Result<ExecutionResult, AutomationError> {
        log::info!("Sending email to {}", recipient);

        let client = first_success([EmailClient::Gmail, EmailClient::Outlook], |client| {
            let (recipient, subject) = (&recipient, &subject);
            async move {
                let outcome = match client {
                    EmailClient::Gmail => self.email_via_gmail(recipient, subject, body).await,
                    EmailClient::Outlook => self.email_via_outlook(recipient, subject, body).await,
                };
                match outcome {
                    Ok(()) => Ok(client),
                    Err(e) => {
                        log::warn!("{} failed: {}", client, e);
                        Err(format!("{}: {}", client, e))
                    }
                }
            }
        })
        .await
        .map_err(|e| AutomationError::EmailExhausted(e.to_string()))?;

        Ok(ExecutionResult::EmailSent {
            recipient,
            subject,
            length: body.chars().count(),
            client,
        })
    }

    fn field_steps(&self, recipient: &str, subject: &str, body: &str) -> (Step, Step, Step) {
        let delay = self.config.per_char_delay_ms;
        (
            Step::Type(recipient.to_string(), delay),
            Step::Type(subject.to_string(), delay),
            Step::Type(body.to_string(), delay),
        )
    }

    async fn email_via_gmail(&self, recipient: &str, subject: &str, body: &str) -> Result<(), AutomationError> {
        self.open_url("chrome", GMAIL_COMPOSE_URL).await?;
        self.pause_ms(self.config.compose_wait_ms).await;
        self.focus.focus("chrome").await?;

        let (to, subject, body) = self.field_steps(recipient, subject, body);
        self.run_steps(&[
            Step::Wait(1000),
            to,
            Step::Wait(800),
            Step::Press(KeyPress::Enter),
            Step::Press(KeyPress::Tab),
            subject,
            Step::Press(KeyPress::Tab),
            body,
            Step::Wait(2000),
            Step::Press(KeyPress::SubmitShortcut),
        ])
        .await
    }

    async fn email_via_outlook(&self, recipient: &str, subject: &str, body: &str) -> Result<(), AutomationError> {
        if self.desktop.platform() != Platform::Windows {
            return Err(AutomationError::Unsupported("Outlook automation".to_string()));
        }

        let output = self
            .desktop
            .run_script(&scripts::outlook_compose(), self.config.script_timeout())
            .await?;
        if !output.contains(scripts::OUTLOOK_OPENED) {
            return Err(AutomationError::Script("Failed to open Outlook".to_string()));
        }
        self.pause_ms(self.config.uri_launch_settle_ms).await;
        self.focus.focus("outlook").await?;

        let (to, subject, body) = self.field_steps(recipient, subject, body);
        self.run_steps(&[
            Step::Wait(700),
            to,
            Step::Wait(600),
            Step::Press(KeyPress::Tab),
            Step::Wait(700),
            subject,
            Step::Wait(600),
            Step::Press(KeyPress::Tab),
            Step::Wait(900),
            body,
            Step::Wait(1500),
            Step::Press(KeyPress::SubmitShortcut),
        ])
        .await
    }

    /// Open `url` in `browser`, falling back to the default browser
    async fn open_url(&self, browser: &str, url: &str) -> Result<(), AutomationError> {
        let platform = self.desktop.platform();
        if platform == Platform::Windows {
            let program = apps::launch_target(browser);
            self.desktop
                .run_script(&scripts::open_in_browser(program.as_str(), url), self.config.script_timeout())
                .await?;
            return Ok(());
        }

        first_success([Some(browser), None], |choice| async move {
            let args = |mut prefix: Vec<String>| {
                prefix.push(url.to_string());
                prefix
            };
            match (platform, choice) {
                (Platform::MacOs, Some(b)) => {
                    self.desktop
                        .launch("open", &args(vec!["-a".to_string(), apps::mac_name(b)]))
                        .await
                }
                (Platform::MacOs, None) => self.desktop.launch("open", &args(Vec::new())).await,
                (_, Some(b)) => self.desktop.launch(apps::launch_target(b).as_str(), &args(Vec::new())).await,
                (_, None) => self.desktop.launch("xdg-open", &args(Vec::new())).await,
            }
        })
        .await
        .map_err(|e| AutomationError::Launch {
            program: browser.to_string(),
            reason: e.to_string(),
        })
    }

    async fn search(&self, browser: String, query: String) -> Result<ExecutionResult, AutomationError> {
        let url = format!("{}{}", SEARCH_URL, urlencoding::encode(&query));
        log::info!("Searching for '{}' in {}", query, browser);

        self.open_url(&browser, &url).await?;
        Ok(ExecutionResult::SearchCompleted {
            app: browser,
            query,
            url,
        })
    }

    async fn create_document(
        &self,
        kind: DocumentKind,
        title: Option<String>,
        content: &str,
    ) -> Result<ExecutionResult, AutomationError> {
        let title = title.unwrap_or_else(|| kind.label().to_string());
        let path = self.documents.create(kind, &title, content).await?;
        Ok(ExecutionResult::created(kind, title, path))
    }
}
