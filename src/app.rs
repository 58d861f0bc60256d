use adw::Application;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_POLL_INTERVAL_SECS: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Webhook log endpoint, used verbatim (query string included).
    pub endpoint_url: String,
    /// Name of the response field carrying the message list.
    pub messages_field: String,
    pub poll_interval_secs: u32,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            messages_field: "messages".into(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            request_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_configured(&self) -> bool {
        !self.endpoint_url.trim().is_empty()
    }

    pub fn poll_interval(&self) -> u32 {
        self.poll_interval_secs.max(1)
    }

    // TOML is the primary format; an older JSON state file is picked up once and rewritten as TOML.
    fn toml_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("inbox-gtk.toml"))
    }

    fn legacy_json_path() -> Option<PathBuf> {
        let proj = directories::ProjectDirs::from("com", "example", "InboxGtk")?;
        Some(proj.config_dir().join("state.json"))
    }

    pub fn load() -> Self {
        if let Some(path) = Self::toml_path() {
            if let Ok(text) = fs::read_to_string(&path) {
                match toml::from_str::<AppConfig>(&text) {
                    Ok(config) => return config,
                    Err(e) => log::warn!("ignoring unreadable config {}: {e}", path.display()),
                }
            }
        }

        if let Some(legacy) = Self::legacy_json_path() {
            if let Ok(bytes) = fs::read(&legacy) {
                if let Ok(config) = serde_json::from_slice::<AppConfig>(&bytes) {
                    if let Err(e) = config.save() {
                        log::warn!("could not migrate legacy config: {e}");
                    }
                    return config;
                }
            }
        }

        Self::new()
    }

    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::toml_path() else {
            return Err(std::io::Error::new(std::io::ErrorKind::NotFound, "No config dir"));
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)
    }

    fn to_toml(&self) -> std::io::Result<String> {
        toml::to_string_pretty(self).map_err(|e| std::io::Error::other(e.to_string()))
    }
}

pub fn build_ui(app: &Application) {
    let config = AppConfig::load();
    if config.is_configured() {
        crate::ui::main_window::show_main_window(app, config);
    } else {
        crate::ui::setup::show_setup_window(app);
    }
}
