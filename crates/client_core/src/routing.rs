//! Endpoint selection for analysis uploads.

use shared::{
    domain::DatasetKind,
    protocol::{BREAST_ANALYZE_PATH, FAIRNESS_PATH, LUNG_ANALYZE_PATH},
};
use thiserror::Error;
use url::Url;

/// File-name tokens that send an upload to the lung endpoint.
const LUNG_NAME_TOKENS: [&str; 2] = ["lung", "luad"];

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid base url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("base url must start with http:// or https://, got '{0}'")]
    UnsupportedScheme(String),
}

/// Infers the dataset kind from the declared file name alone.
///
/// The content is never inspected; a lung file without "lung" or "luad" in
/// its name goes to the breast endpoint.
pub fn classify_file_name(file_name: &str) -> DatasetKind {
    let lower = file_name.to_lowercase();
    if LUNG_NAME_TOKENS.iter().any(|token| lower.contains(token)) {
        DatasetKind::Lung
    } else {
        DatasetKind::Breast
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    breast: Url,
    lung: Url,
    fairness: Url,
}

impl Endpoints {
    /// `lung_base_url` falls back to `analysis_base_url` when unset.
    pub fn from_base_urls(
        analysis_base_url: &str,
        lung_base_url: Option<&str>,
    ) -> Result<Self, EndpointError> {
        let analysis_base = normalize_base_url(analysis_base_url)?;
        let lung_base = match lung_base_url {
            Some(raw) => normalize_base_url(raw)?,
            None => analysis_base.clone(),
        };

        Ok(Self {
            breast: join(&analysis_base, BREAST_ANALYZE_PATH)?,
            lung: join(&lung_base, LUNG_ANALYZE_PATH)?,
            fairness: join(&analysis_base, FAIRNESS_PATH)?,
        })
    }

    pub fn for_kind(&self, kind: DatasetKind) -> &Url {
        match kind {
            DatasetKind::Breast => &self.breast,
            DatasetKind::Lung => &self.lung,
        }
    }

    pub fn fairness(&self) -> &Url {
        &self.fairness
    }
}

fn normalize_base_url(raw: &str) -> Result<Url, EndpointError> {
    let raw = raw.trim();
    let mut url = Url::parse(raw).map_err(|source| EndpointError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(EndpointError::UnsupportedScheme(raw.to_string()));
    }
    // Url::join replaces the last path segment unless the base ends with '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn join(base: &Url, path: &str) -> Result<Url, EndpointError> {
    base.join(path).map_err(|source| EndpointError::InvalidUrl {
        url: format!("{base}{path}"),
        source,
    })
}

#[cfg(test)]
#[path = "tests/routing_tests.rs"]
mod tests;
