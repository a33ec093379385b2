//! Window focus management
//!
//! Brings an already running application to the foreground. Each attempt
//! finds the newest window whose process name or title matches, restores it
//! when minimized, raises it and checks that it actually holds focus. After
//! the attempts run out a single activate-by-title call is tried.

use std::time::Duration;

use super::apps;
use super::platform::{Platform, SharedDesktop};
use super::scripts;
use super::AutomationError;
use crate::config::AutomationConfig;
use crate::retry::{retry, Attempt, RetryPolicy};

pub struct WindowFocusManager {
    desktop: SharedDesktop,
    attempts: u32,
    interval: Duration,
    script_timeout: Duration,
}

impl WindowFocusManager {
    pub fn new(desktop: SharedDesktop, config: &AutomationConfig) -> Self {
        Self {
            desktop,
            attempts: config.focus_attempts,
            interval: config.focus_interval(),
            script_timeout: config.script_timeout(),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub async fn focus(&self, app: &str) -> Result<(), AutomationError> {
        self.focus_with(app, self.attempts).await
    }

    pub async fn focus_with(&self, app: &str, attempts: u32) -> Result<(), AutomationError> {
        let platform = self.desktop.platform();
        let target = match platform {
            Platform::Windows => apps::window_pattern(app),
            Platform::MacOs => apps::mac_name(app),
            Platform::Linux => {
                log::warn!("Window focus is not available on linux, using the active window for {}", app);
                return Ok(());
            }
        };

        log::info!("Focusing {} (up to {} attempts)", app, attempts);

        let outcome = retry(
            RetryPolicy::fixed(attempts, self.interval),
            |attempt| self.probe(platform, &target, attempt),
            |delay| self.desktop.pause(delay),
        )
        .await;

        let failure = match outcome {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        log::warn!(
            "{} not focused after {} attempts ({}), trying activation by title",
            app,
            failure.attempts(),
            failure.into_inner()
        );

        if self.activate(platform, &target).await {
            log::info!("{} activated by title", app);
            return Ok(());
        }

        Err(AutomationError::FocusFailure {
            app: app.to_string(),
            attempts,
        })
    }

    async fn probe(&self, platform: Platform, target: &str, attempt: u32) -> Result<(), Attempt<String>> {
        let script = match platform {
            Platform::MacOs => scripts::mac_focus_probe(target),
            _ => scripts::focus_probe(target),
        };

        match self.desktop.run_script(&script, self.script_timeout).await {
            Ok(output) if output.contains(scripts::FOCUS_OK) => {
                log::debug!("{} focused on attempt {}", target, attempt);
                Ok(())
            }
            Ok(output) if output.contains(scripts::FOCUS_MISSING) => {
                Err(Attempt::Retry(format!("no window matching {}", target)))
            }
            Ok(_) => Err(Attempt::Retry("foreground window not verified".to_string())),
            Err(e) => Err(Attempt::Retry(e.to_string())),
        }
    }

    async fn activate(&self, platform: Platform, target: &str) -> bool {
        let script = match platform {
            Platform::MacOs => scripts::mac_activate(target),
            _ => scripts::app_activate(target),
        };

        match self.desktop.run_script(&script, self.script_timeout).await {
            Ok(output) => output.contains(scripts::ACTIVATED) && !output.contains(scripts::NOT_ACTIVATED),
            Err(e) => {
                log::warn!("Activation of {} failed: {}", target, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::ScriptOutput;
    use crate::testing::FakeDesktop;
    use std::sync::Arc;

    fn manager(desktop: Arc<FakeDesktop>, attempts: u32) -> WindowFocusManager {
        let config = AutomationConfig {
            focus_attempts: attempts,
            ..AutomationConfig::default()
        };
        WindowFocusManager::new(desktop, &config)
    }

    #[tokio::test]
    async fn test_never_appearing_window_uses_exactly_n_attempts() {
        let desktop = Arc::new(FakeDesktop::windows());
        desktop.respond_to(scripts::FOCUS_PROBE_TAG, |_| Ok(ScriptOutput::new(scripts::FOCUS_MISSING)));
        desktop.respond_to("AppActivate", |_| Ok(ScriptOutput::new(scripts::NOT_ACTIVATED)));

        let err = manager(desktop.clone(), 7).focus("notepad").await.unwrap_err();

        assert!(matches!(err, AutomationError::FocusFailure { ref app, attempts: 7 } if app == "notepad"));
        assert_eq!(desktop.scripts_containing(scripts::FOCUS_PROBE_TAG), 7);
        assert_eq!(desktop.scripts_containing("AppActivate"), 1);
        // waits only between attempts
        assert_eq!(desktop.pauses().len(), 6);
    }

    #[tokio::test]
    async fn test_window_appearing_on_last_attempt_stops_immediately() {
        let desktop = Arc::new(FakeDesktop::windows());
        desktop.focus_succeeds_on(5);

        manager(desktop.clone(), 5).focus("whatsapp").await.unwrap();

        assert_eq!(desktop.scripts_containing(scripts::FOCUS_PROBE_TAG), 5);
        assert_eq!(desktop.scripts_containing("AppActivate"), 0);
    }

    #[tokio::test]
    async fn test_activation_fallback_rescues_focus() {
        let desktop = Arc::new(FakeDesktop::windows());
        desktop.respond_to(scripts::FOCUS_PROBE_TAG, |_| Ok(ScriptOutput::new(scripts::FOCUS_UNVERIFIED)));
        desktop.respond_to("AppActivate", |_| Ok(ScriptOutput::new(scripts::ACTIVATED)));

        manager(desktop.clone(), 3).focus("word").await.unwrap();
        assert_eq!(desktop.scripts_containing(scripts::FOCUS_PROBE_TAG), 3);
    }

    #[tokio::test]
    async fn test_script_errors_count_as_failed_attempts() {
        let desktop = Arc::new(FakeDesktop::windows());
        desktop.respond_to(scripts::FOCUS_PROBE_TAG, |_| {
            Err(AutomationError::Script("access denied".into()))
        });
        desktop.respond_to("AppActivate", |_| Err(AutomationError::Script("no COM".into())));

        let err = manager(desktop.clone(), 2).focus("excel").await.unwrap_err();
        assert!(matches!(err, AutomationError::FocusFailure { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_mac_uses_applescript_with_app_name() {
        let desktop = Arc::new(FakeDesktop::mac());
        desktop.focus_succeeds_on(1);

        manager(desktop.clone(), 3).focus("notepad").await.unwrap();

        let scripts = desktop.scripts();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].contains("name contains \"TextEdit\""));
    }
}
