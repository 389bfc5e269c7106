use std::{path::Path, time::Duration};

use anyhow::Context;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::routing::{EndpointError, Endpoints};

pub const DEFAULT_ANALYSIS_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_PREPROCESSING_DELAY_MS: u64 = 600;
/// Looked up in the working directory when no explicit path is given.
pub const DEFAULT_CONFIG_NAME: &str = "genebridge";
pub const ENV_PREFIX: &str = "GENEBRIDGE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSettings {
    pub analysis_base_url: String,
    #[serde(default)]
    pub lung_base_url: Option<String>,
    pub preprocessing_delay_ms: u64,
    /// Unset means the request waits on the transport indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            analysis_base_url: DEFAULT_ANALYSIS_BASE_URL.into(),
            lung_base_url: None,
            preprocessing_delay_ms: DEFAULT_PREPROCESSING_DELAY_MS,
            request_timeout_secs: None,
        }
    }
}

impl ClientSettings {
    pub fn endpoints(&self) -> Result<Endpoints, EndpointError> {
        Endpoints::from_base_urls(&self.analysis_base_url, self.lung_base_url.as_deref())
    }

    pub fn preprocessing_delay(&self) -> Duration {
        Duration::from_millis(self.preprocessing_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Layers defaults, the config file, then `GENEBRIDGE__*` environment
/// variables. An explicit `path` must exist; the default file is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<ClientSettings> {
    let defaults = ClientSettings::default();
    let mut builder = Config::builder()
        .set_default("analysis_base_url", defaults.analysis_base_url)?
        .set_default(
            "preprocessing_delay_ms",
            defaults.preprocessing_delay_ms as i64,
        )?;

    builder = match path {
        Some(path) => builder.add_source(File::from(path).required(true)),
        None => builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false)),
    };

    let settings = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("failed to load client settings")?
        .try_deserialize::<ClientSettings>()
        .context("invalid client settings")?;

    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
