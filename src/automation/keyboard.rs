//! Human-like typing
//!
//! Text is split into fixed-size chunks and every character gets a delay of
//! the nominal value ±30%. On Windows each chunk is one SendKeys script, on
//! other platforms characters go through the native input simulator.

use rand::Rng;
use std::time::Duration;

use super::platform::{KeyInput, KeyPress, Platform, SharedDesktop};
use super::scripts;
use super::AutomationError;
use crate::config::AutomationConfig;

/// SendKeys token for one character; `None` for characters that are dropped
pub fn escape_send_keys(c: char) -> Option<String> {
    match c {
        '\r' => None,
        '\n' => Some("{ENTER}".to_string()),
        '\t' => Some("{TAB}".to_string()),
        '{' => Some("{{}".to_string()),
        '}' => Some("{}}".to_string()),
        '+' | '^' | '%' | '~' | '(' | ')' | '[' | ']' => Some(format!("{{{}}}", c)),
        other => Some(other.to_string()),
    }
}

/// Split into chunks of at most `size` characters
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Nominal delay scaled by a random factor in [0.7, 1.3)
pub fn jittered(nominal_ms: u64) -> u64 {
    if nominal_ms == 0 {
        return 0;
    }
    let factor: f64 = rand::thread_rng().gen_range(0.7..1.3);
    (nominal_ms as f64 * factor).round() as u64
}

pub struct Typist {
    desktop: SharedDesktop,
    chunk_size: usize,
    script_floor: Duration,
}

impl Typist {
    pub fn new(desktop: SharedDesktop, config: &AutomationConfig) -> Self {
        Self {
            desktop,
            chunk_size: config.chunk_size,
            script_floor: config.script_timeout(),
        }
    }

    /// Type `text` into the focused window. Returns the character count.
    pub async fn type_text(&self, text: &str, per_char_delay_ms: u64) -> Result<usize, AutomationError> {
        let length = text.chars().count();
        let normalized = text.replace('\r', "");
        if normalized.is_empty() {
            return Ok(length);
        }

        log::info!(
            "Typing {} characters ({}ms nominal delay)",
            length,
            per_char_delay_ms
        );

        for chunk in chunk_text(&normalized, self.chunk_size) {
            match self.desktop.platform() {
                Platform::Windows => self.type_chunk_scripted(&chunk, per_char_delay_ms).await?,
                _ => self.type_chunk_native(&chunk, per_char_delay_ms).await?,
            }
        }

        Ok(length)
    }

    async fn type_chunk_scripted(&self, chunk: &str, per_char_delay_ms: u64) -> Result<(), AutomationError> {
        let tokens: Vec<(String, u64)> = chunk
            .chars()
            .filter_map(escape_send_keys)
            .map(|token| (token, jittered(per_char_delay_ms)))
            .collect();

        let budget = Duration::from_millis(tokens.len() as u64 * (per_char_delay_ms + 10));
        let timeout = budget.max(self.script_floor);

        self.desktop
            .run_script(&scripts::send_keys_sequence(&tokens), timeout)
            .await
            .map(|_| ())
    }

    async fn type_chunk_native(&self, chunk: &str, per_char_delay_ms: u64) -> Result<(), AutomationError> {
        for c in chunk.chars() {
            let input = match c {
                '\n' => KeyInput::Press(KeyPress::Enter),
                '\t' => KeyInput::Press(KeyPress::Tab),
                other => KeyInput::Text(other.to_string()),
            };
            self.desktop.send_input(&[input]).await?;

            let delay = jittered(per_char_delay_ms);
            if delay > 0 {
                self.desktop.pause(Duration::from_millis(delay)).await;
            }
        }
        Ok(())
    }

    pub async fn press(&self, key: KeyPress) -> Result<(), AutomationError> {
        log::debug!("Pressing {:?}", key);
        match self.desktop.platform() {
            Platform::Windows => self
                .desktop
                .run_script(&scripts::send_keys_sequence(&[(key.send_keys(), 0)]), self.script_floor)
                .await
                .map(|_| ()),
            _ => self.desktop.send_input(&[KeyInput::Press(key)]).await,
        }
    }
}
