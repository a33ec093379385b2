//! Test doubles for the host platform and the completion client

use async_trait::async_trait;
use regex::Regex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::automation::scripts;
use crate::automation::{AutomationError, Desktop, KeyInput, Platform, ScriptOutput};
use crate::llm::{CompletionClient, CompletionRequest, LlmError};

#[derive(Debug, Clone, PartialEq)]
pub enum DesktopCall {
    Script(String),
    Launch(String, Vec<String>),
    Input(Vec<KeyInput>),
    ReadClipboard,
    WriteClipboard(String),
    Pause(Duration),
}

type Responder = Box<dyn Fn(&str) -> Result<ScriptOutput, AutomationError> + Send + Sync>;

/// Records every call. Scripts succeed and report every success marker
/// unless a responder registered for a substring of the script says otherwise.
pub struct FakeDesktop {
    platform: Platform,
    calls: Mutex<Vec<DesktopCall>>,
    responders: Mutex<Vec<(String, Responder)>>,
    clipboard: Mutex<String>,
}

impl FakeDesktop {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            calls: Mutex::new(Vec::new()),
            responders: Mutex::new(Vec::new()),
            clipboard: Mutex::new(String::new()),
        }
    }

    pub fn windows() -> Self {
        Self::new(Platform::Windows)
    }

    pub fn mac() -> Self {
        Self::new(Platform::MacOs)
    }

    /// Later registrations take precedence
    pub fn respond_to(
        &self,
        needle: &str,
        responder: impl Fn(&str) -> Result<ScriptOutput, AutomationError> + Send + Sync + 'static,
    ) {
        self.responders
            .lock()
            .unwrap()
            .insert(0, (needle.to_string(), Box::new(responder)));
    }

    /// Focus probes report a missing window until the `n`-th probe
    pub fn focus_succeeds_on(&self, n: u32) {
        let probes = AtomicU32::new(0);
        self.respond_to("listenos:focus-probe", move |_| {
            let attempt = probes.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt >= n {
                Ok(ScriptOutput::new(scripts::FOCUS_OK))
            } else {
                Ok(ScriptOutput::new(scripts::FOCUS_MISSING))
            }
        });
    }

    pub fn set_clipboard(&self, text: &str) {
        *self.clipboard.lock().unwrap() = text.to_string();
    }

    pub fn calls(&self) -> Vec<DesktopCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DesktopCall::Script(script) => Some(script),
                _ => None,
            })
            .collect()
    }

    pub fn scripts_containing(&self, needle: &str) -> usize {
        self.scripts().iter().filter(|s| s.contains(needle)).count()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DesktopCall::Pause(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    /// Keyboard activity (typing or key presses) of any kind
    pub fn touched_keyboard(&self) -> bool {
        self.calls().iter().any(|call| match call {
            DesktopCall::Input(_) => true,
            DesktopCall::Script(script) => script.contains("SendKeys"),
            _ => false,
        })
    }

    /// Text typed through SendKeys scripts, with Enter/Tab as \n/\t and
    /// shortcuts and navigation keys dropped
    pub fn typed_text(&self) -> String {
        let token = Regex::new(r"SendWait\('((?:[^']|'')*)'\)").unwrap();
        let mut typed = String::new();
        for script in self.scripts() {
            for caps in token.captures_iter(&script) {
                let raw = caps[1].replace("''", "'");
                match raw.as_str() {
                    "{ENTER}" => typed.push('\n'),
                    "{TAB}" => typed.push('\t'),
                    "{{}" => typed.push('{'),
                    "{}}" => typed.push('}'),
                    t if t.starts_with('^') || t == "{BACKSPACE}" || t == "{DOWN}" => {}
                    t if t.len() == 3 && t.starts_with('{') && t.ends_with('}') => {
                        typed.push_str(&t[1..2]);
                    }
                    t => typed.push_str(t),
                }
            }
        }
        typed
    }

    fn record(&self, call: DesktopCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Desktop for FakeDesktop {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn run_script(&self, script: &str, _timeout: Duration) -> Result<ScriptOutput, AutomationError> {
        self.record(DesktopCall::Script(script.to_string()));

        let responders = self.responders.lock().unwrap();
        if let Some((_, responder)) = responders.iter().find(|(needle, _)| script.contains(needle.as_str())) {
            return responder(script);
        }

        Ok(ScriptOutput::new(format!(
            "{} {} {} {} {}",
            scripts::FOCUS_OK,
            scripts::LAUNCHED,
            scripts::OUTLOOK_OPENED,
            scripts::DOCUMENT_SAVED,
            scripts::ACTIVATED
        )))
    }

    async fn launch(&self, program: &str, args: &[String]) -> Result<(), AutomationError> {
        self.record(DesktopCall::Launch(program.to_string(), args.to_vec()));
        Ok(())
    }

    async fn send_input(&self, input: &[KeyInput]) -> Result<(), AutomationError> {
        self.record(DesktopCall::Input(input.to_vec()));
        Ok(())
    }

    async fn read_clipboard(&self) -> Result<String, AutomationError> {
        self.record(DesktopCall::ReadClipboard);
        Ok(self.clipboard.lock().unwrap().clone())
    }

    async fn write_clipboard(&self, text: &str) -> Result<(), AutomationError> {
        self.record(DesktopCall::WriteClipboard(text.to_string()));
        self.set_clipboard(text);
        Ok(())
    }

    async fn pause(&self, duration: Duration) {
        self.record(DesktopCall::Pause(duration));
    }
}

/// Replays queued responses in order and records every request
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionClient for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Transport("no scripted response".into())))
    }
}
