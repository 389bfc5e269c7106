//! The remote analysis service seam and its HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde_json::Value;
use shared::{
    error::PayloadError,
    protocol::{FairnessBaseline, UPLOAD_FIELD},
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::upload::SelectedFile;

/// Everything that can go wrong between dispatching a file and holding a
/// decoded result. `Display` is the inline message shown under the upload form.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Analysis failed (status {status}): {body}")]
    Status { status: u16, body: String },
    #[error("Analysis request failed: {message}")]
    Transport { message: String },
    #[error("Analysis result unreadable: {0}")]
    Malformed(#[from] PayloadError),
}

impl ServiceError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure of the model-wide fairness snapshot request. Kept apart from
/// [`ServiceError`] so its message never reads as a failed upload.
#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("Fairness baseline request failed (status {status}): {body}")]
    Status { status: u16, body: String },
    #[error("Fairness baseline unreachable: {message}")]
    Transport { message: String },
    #[error("Fairness baseline unreadable: {0}")]
    Malformed(#[source] PayloadError),
}

impl From<ServiceError> for BaselineError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Status { status, body } => Self::Status { status, body },
            ServiceError::Transport { message } => Self::Transport { message },
            ServiceError::Malformed(source) => Self::Malformed(source),
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("timed out: {err}")
        } else if err.is_connect() {
            format!("failed to connect: {err}")
        } else {
            err.to_string()
        };
        Self::Transport { message }
    }
}

/// The external inference service: takes one file, returns a JSON body.
///
/// Implementations only move bytes. Deciding what the body means is the
/// upload controller's job.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, endpoint: &Url, file: &SelectedFile) -> Result<Value, ServiceError>;
}

#[derive(Clone)]
pub struct HttpAnalysisService {
    http: Client,
}

impl HttpAnalysisService {
    pub fn new(timeout: Option<Duration>) -> Result<Self, ServiceError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
        })
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    pub async fn fetch_fairness_baseline(
        &self,
        endpoint: &Url,
    ) -> Result<FairnessBaseline, BaselineError> {
        let response = self
            .http
            .get(endpoint.clone())
            .send()
            .await
            .map_err(ServiceError::from)?;
        let body = read_json_body(response).await?;
        serde_json::from_value(body).map_err(|source| {
            BaselineError::Malformed(PayloadError::Decode {
                kind: "fairness baseline",
                source,
            })
        })
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn analyze(&self, endpoint: &Url, file: &SelectedFile) -> Result<Value, ServiceError> {
        let part = Part::bytes(file.bytes().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.mime_type())?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        debug!(
            %endpoint,
            file_name = file.name(),
            size_bytes = file.size_bytes(),
            "posting analysis upload"
        );
        let response = self.http.post(endpoint.clone()).multipart(form).send().await?;
        read_json_body(response).await
    }
}

async fn read_json_body(response: reqwest::Response) -> Result<Value, ServiceError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|err| format!("<unreadable error body: {err}>"));
        warn!(status = status.as_u16(), %body, "service returned an error");
        return Err(ServiceError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| ServiceError::Malformed(PayloadError::NotJson(err)))
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;
