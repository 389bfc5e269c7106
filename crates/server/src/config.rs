use std::{collections::HashMap, fs};

use serde::Deserialize;
use tracing::warn;

pub const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    /// Artificial model latency, handy for exercising client cancellation.
    pub response_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".into(),
            response_delay_ms: 0,
        }
    }
}

pub fn load_settings() -> Settings {
    let raw = fs::read_to_string(SETTINGS_FILE).ok();
    settings_from(raw.as_deref(), |key| std::env::var(key).ok())
}

/// Layers `server.toml` content and then environment overrides over the
/// defaults. Unparseable values are ignored with a warning.
pub fn settings_from(raw_file: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = raw_file {
        match toml::from_str::<HashMap<String, toml::Value>>(raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("bind_addr").and_then(toml::Value::as_str) {
                    settings.bind_addr = v.to_string();
                }
                if let Some(v) = file_cfg
                    .get("response_delay_ms")
                    .and_then(toml::Value::as_integer)
                    .and_then(|v| u64::try_from(v).ok())
                {
                    settings.response_delay_ms = v;
                }
            }
            Err(error) => warn!(%error, file = SETTINGS_FILE, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("STUB_BIND") {
        settings.bind_addr = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }

    if let Some(v) = env("APP__RESPONSE_DELAY_MS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.response_delay_ms = parsed,
            Err(error) => warn!(%error, value = %v, "ignoring APP__RESPONSE_DELAY_MS"),
        }
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
