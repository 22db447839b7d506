use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::warn;

const DEFAULT_CONFIG_FILE: &str = "todo.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub storage_path: PathBuf,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000/api/".into(),
            storage_path: default_storage_path(),
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn with_overrides(mut self, server_url: Option<String>, storage_path: Option<PathBuf>) -> Self {
        if let Some(v) = server_url {
            self.server_url = v;
        }
        if let Some(v) = storage_path {
            self.storage_path = v;
        }
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    storage_path: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
}

/// Defaults, then `todo.toml` (or `$TODO_CONFIG`), then environment.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    let config_path = std::env::var("TODO_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
    if let Ok(raw) = fs::read_to_string(&config_path) {
        apply_file(&mut settings, &raw, &config_path);
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str, path: &Path) {
    let file_cfg = match toml::from_str::<FileSettings>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!(path = %path.display(), "ignoring unreadable config file: {err}");
            return;
        }
    };

    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.storage_path {
        settings.storage_path = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("TODO_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = lookup("TODO_STORAGE_PATH") {
        settings.storage_path = PathBuf::from(v);
    }
    if let Some(v) = lookup("APP__STORAGE_PATH") {
        settings.storage_path = PathBuf::from(v);
    }

    for key in ["TODO_REQUEST_TIMEOUT_SECS", "APP__REQUEST_TIMEOUT_SECS"] {
        if let Some(v) = lookup(key) {
            match v.parse::<u64>() {
                Ok(parsed) => settings.request_timeout_secs = parsed,
                Err(_) => warn!(key, value = %v, "ignoring non-numeric timeout"),
            }
        }
    }
}

fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("todo-client")
        .join("session.json")
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
