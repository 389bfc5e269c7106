use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use shared::{
    error::ApiError,
    protocol::{BreastAnalysis, FairnessBaseline, LungAnalysis, UPLOAD_FIELD},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod analysis;
mod config;

use analysis::{analyze_breast, analyze_lung, fairness_baseline, UploadSummary};
use config::{load_settings, Settings};

const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    response_delay: Duration,
}

impl AppState {
    fn from_settings(settings: &Settings) -> Self {
        Self {
            response_delay: Duration::from_millis(settings.response_delay_ms),
        }
    }
}

/// A file received under the upload field.
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let app = build_router(Arc::new(AppState::from_settings(&settings)));

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "stub analysis service listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/analyze", post(analyze_breast_upload))
        .route("/lung/analyze", post(analyze_lung_upload))
        .route("/fairness", get(fairness))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn analyze_breast_upload(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<BreastAnalysis> {
    let upload = read_upload(multipart).await?;
    let summary = UploadSummary::parse(&upload.bytes);
    simulate_latency(&state).await;
    let result = analyze_breast(&upload.file_name, &summary);
    info!(
        file_name = %upload.file_name,
        rows = summary.rows,
        risk_score = result.risk_score,
        is_biased = result.is_biased,
        "breast analysis served"
    );
    Ok(Json(result))
}

async fn analyze_lung_upload(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<LungAnalysis> {
    let upload = read_upload(multipart).await?;
    let summary = UploadSummary::parse(&upload.bytes);
    simulate_latency(&state).await;
    let result = analyze_lung(&upload.file_name, &summary);
    info!(
        file_name = %upload.file_name,
        rows = summary.rows,
        is_biased = result.is_biased,
        "lung analysis served"
    );
    Ok(Json(result))
}

async fn fairness() -> Json<FairnessBaseline> {
    Json(fairness_baseline())
}

async fn simulate_latency(state: &AppState) {
    if !state.response_delay.is_zero() {
        tokio::time::sleep(state.response_delay).await;
    }
}

/// Pulls the first `file` field out of the form; other fields are skipped.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, (StatusCode, Json<ApiError>)> {
    loop {
        let field = multipart.next_field().await.map_err(|e| {
            warn!(error = %e, "rejecting malformed multipart body");
            bad_request(format!("invalid multipart body: {e}"))
        })?;
        let Some(field) = field else {
            return Err(bad_request(format!("missing '{UPLOAD_FIELD}' field")));
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("upload")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("failed to read upload: {e}")))?;
        if bytes.is_empty() {
            return Err(bad_request("uploaded file is empty"));
        }
        return Ok(Upload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }
}

fn bad_request(detail: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (StatusCode::BAD_REQUEST, Json(ApiError::new(detail)))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
