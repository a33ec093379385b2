//! Application name resolution
//!
//! Maps spoken app names to launch identifiers, window patterns and the
//! macOS application name.

/// How an application is started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// Executable or App Paths alias (`Start-Process notepad`)
    Program(&'static str),
    /// Custom URI scheme (`whatsapp:`)
    Uri(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppEntry {
    pub names: &'static [&'static str],
    pub launch: Launch,
    /// Process name or window title pattern used for focusing
    pub window: &'static str,
    pub mac_name: &'static str,
}

const APPS: &[AppEntry] = &[
    AppEntry { names: &["notepad"], launch: Launch::Program("notepad"), window: "notepad", mac_name: "TextEdit" },
    AppEntry { names: &["chrome", "google chrome", "browser"], launch: Launch::Program("chrome"), window: "chrome", mac_name: "Google Chrome" },
    AppEntry { names: &["edge", "microsoft edge"], launch: Launch::Program("msedge"), window: "msedge", mac_name: "Microsoft Edge" },
    AppEntry { names: &["firefox"], launch: Launch::Program("firefox"), window: "firefox", mac_name: "Firefox" },
    AppEntry { names: &["brave"], launch: Launch::Program("brave"), window: "brave", mac_name: "Brave Browser" },
    AppEntry { names: &["whatsapp"], launch: Launch::Uri("whatsapp:"), window: "WhatsApp", mac_name: "WhatsApp" },
    AppEntry { names: &["telegram"], launch: Launch::Uri("tg:"), window: "Telegram", mac_name: "Telegram" },
    AppEntry { names: &["discord"], launch: Launch::Uri("discord:"), window: "Discord", mac_name: "Discord" },
    AppEntry { names: &["slack"], launch: Launch::Uri("slack:"), window: "slack", mac_name: "Slack" },
    AppEntry { names: &["teams", "microsoft teams"], launch: Launch::Uri("msteams:"), window: "Teams", mac_name: "Microsoft Teams" },
    AppEntry { names: &["spotify"], launch: Launch::Uri("spotify:"), window: "Spotify", mac_name: "Spotify" },
    AppEntry { names: &["word", "microsoft word", "ms word"], launch: Launch::Program("winword"), window: "WINWORD", mac_name: "Microsoft Word" },
    AppEntry { names: &["excel", "microsoft excel", "ms excel"], launch: Launch::Program("excel"), window: "EXCEL", mac_name: "Microsoft Excel" },
    AppEntry { names: &["powerpoint", "microsoft powerpoint", "ppt"], launch: Launch::Program("powerpnt"), window: "POWERPNT", mac_name: "Microsoft PowerPoint" },
    AppEntry { names: &["outlook", "microsoft outlook"], launch: Launch::Program("outlook"), window: "OUTLOOK", mac_name: "Microsoft Outlook" },
    AppEntry { names: &["gmail", "mail"], launch: Launch::Program("chrome"), window: "chrome", mac_name: "Google Chrome" },
    AppEntry { names: &["calculator", "calc"], launch: Launch::Program("calc"), window: "Calculator", mac_name: "Calculator" },
    AppEntry { names: &["paint", "ms paint"], launch: Launch::Program("mspaint"), window: "mspaint", mac_name: "Preview" },
    AppEntry { names: &["settings", "windows settings"], launch: Launch::Uri("ms-settings:"), window: "SystemSettings", mac_name: "System Settings" },
    AppEntry { names: &["vscode", "vs code", "visual studio code", "code"], launch: Launch::Program("code"), window: "Code", mac_name: "Visual Studio Code" },
    AppEntry { names: &["terminal", "cmd", "command prompt"], launch: Launch::Program("cmd"), window: "cmd", mac_name: "Terminal" },
    AppEntry { names: &["powershell"], launch: Launch::Program("powershell"), window: "powershell", mac_name: "Terminal" },
    AppEntry { names: &["explorer", "file explorer", "files"], launch: Launch::Program("explorer"), window: "explorer", mac_name: "Finder" },
    AppEntry { names: &["task manager"], launch: Launch::Program("taskmgr"), window: "Taskmgr", mac_name: "Activity Monitor" },
];

const EMAIL_CLIENTS: &[&str] = &["gmail", "mail", "outlook", "email", "e-mail"];
const MESSENGERS: &[&str] = &["whatsapp", "telegram", "discord", "slack", "teams", "signal", "messenger"];
const BROWSERS: &[&str] = &["chrome", "google chrome", "edge", "microsoft edge", "firefox", "brave", "browser"];

fn normalize(name: &str) -> String {
    name.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Look up a known application by any of its names
pub fn lookup(name: &str) -> Option<&'static AppEntry> {
    let name = normalize(name);
    APPS.iter().find(|entry| entry.names.contains(&name.as_str()))
}

pub fn is_known(name: &str) -> bool {
    lookup(name).is_some()
}

/// Resolved launch target; unknown names are started as-is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchTarget {
    Program(String),
    Uri(String),
}

impl LaunchTarget {
    pub fn as_str(&self) -> &str {
        match self {
            LaunchTarget::Program(program) => program,
            LaunchTarget::Uri(uri) => uri,
        }
    }
}

pub fn launch_target(name: &str) -> LaunchTarget {
    match lookup(name).map(|e| e.launch) {
        Some(Launch::Program(program)) => LaunchTarget::Program(program.to_string()),
        Some(Launch::Uri(uri)) => LaunchTarget::Uri(uri.to_string()),
        None => LaunchTarget::Program(name.trim().to_string()),
    }
}

pub fn window_pattern(name: &str) -> String {
    lookup(name)
        .map(|e| e.window.to_string())
        .unwrap_or_else(|| name.trim().to_string())
}

pub fn mac_name(name: &str) -> String {
    lookup(name)
        .map(|e| e.mac_name.to_string())
        .unwrap_or_else(|| name.trim().to_string())
}

/// Whether the app name refers to an e-mail client
pub fn is_email_client(name: &str) -> bool {
    let name = normalize(name);
    EMAIL_CLIENTS.iter().any(|client| name.contains(client))
}

pub fn is_browser(name: &str) -> bool {
    BROWSERS.contains(&normalize(name).as_str())
}

/// Chat applications that address a contact by name
pub fn is_messenger(name: &str) -> bool {
    let name = normalize(name);
    MESSENGERS.iter().any(|app| name.contains(app))
}

pub fn is_whatsapp(name: &str) -> bool {
    normalize(name).contains("whatsapp")
}
