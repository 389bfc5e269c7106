//! Shared doubles for the client_core unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::domain::Section;
use tokio::sync::{broadcast, Notify};
use url::Url;

use crate::{
    routing::Endpoints,
    scroll::Navigator,
    service::{AnalysisService, ServiceError},
    upload::{SelectedFile, UploadController},
    ClientEvent,
};

pub fn breast_payload() -> Value {
    json!({
        "risk_score": 0.62,
        "risk_label": "High",
        "fairness_metrics": {
            "0": { "accuracy": 0.84, "count": 120 },
            "1": { "accuracy": 0.71, "count": 40 },
            "7": { "accuracy": 0.80, "count": 5 }
        },
        "disparity_index": 0.13,
        "demographic_distribution": { "White": 120, "Black": 40, "Other": 5 },
        "is_biased": false,
        "insights": "**Summary**\n- HER2 risk is elevated"
    })
}

pub fn lung_payload() -> Value {
    json!({
        "subtype_distribution": { "Adenocarcinoma": 31.0, "Squamous Cell": 12.0, "SCLC": 3.0 },
        "disparity_index": 0.2,
        "fairness_metrics": {
            "2": { "accuracy": 0.66, "count": 18 },
            "3": { "accuracy": 0.86, "count": 28 }
        },
        "demographic_distribution": { "Asian": 18, "Unknown": 28 },
        "is_biased": true,
        "overall_accuracy": 0.74,
        "insights": "**Subtypes**\n- Adenocarcinoma dominates"
    })
}

#[derive(Clone)]
pub enum FakeResponse {
    Json(Value),
    Status(u16, &'static str),
    Transport(&'static str),
}

/// Records every call and answers with a fixed response, optionally waiting
/// on `gate` first so tests can observe the in-flight state.
pub struct FakeService {
    response: FakeResponse,
    gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<(Url, String)>>,
}

impl FakeService {
    pub fn new(response: FakeResponse) -> Arc<Self> {
        Arc::new(Self {
            response,
            gate: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn gated(response: FakeResponse, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            response,
            gate: Some(gate),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(Url, String)> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }
}

#[async_trait]
impl AnalysisService for FakeService {
    async fn analyze(&self, endpoint: &Url, file: &SelectedFile) -> Result<Value, ServiceError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((endpoint.clone(), file.name().to_string()));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.response {
            FakeResponse::Json(body) => Ok(body.clone()),
            FakeResponse::Status(status, body) => Err(ServiceError::Status {
                status: *status,
                body: body.to_string(),
            }),
            FakeResponse::Transport(message) => Err(ServiceError::transport(*message)),
        }
    }
}

pub fn test_endpoints() -> Endpoints {
    Endpoints::from_base_urls("http://breast.test", Some("http://lung.test")).expect("endpoints")
}

pub fn controller_with(service: Arc<FakeService>) -> UploadController {
    let (events, _) = broadcast::channel(64);
    UploadController::new(
        service,
        test_endpoints(),
        std::time::Duration::ZERO,
        events,
    )
}

/// Waits until the fake service has seen `count` calls.
pub async fn wait_for_calls(service: &FakeService, count: usize) {
    for _ in 0..1000 {
        if service.call_count() >= count {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("service never reached {count} calls");
}

pub fn drain_events(rx: &mut broadcast::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Navigator double with a configurable set of mounted sections.
pub struct RecordingNavigator {
    mounted: Vec<Section>,
    scrolled: Mutex<Vec<Section>>,
}

impl RecordingNavigator {
    pub fn with_all_sections() -> Arc<Self> {
        Self::with_sections(&Section::ALL)
    }

    pub fn with_sections(sections: &[Section]) -> Arc<Self> {
        Arc::new(Self {
            mounted: sections.to_vec(),
            scrolled: Mutex::new(Vec::new()),
        })
    }

    pub fn scrolled(&self) -> Vec<Section> {
        self.scrolled.lock().expect("scroll lock").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn is_mounted(&self, section: Section) -> bool {
        self.mounted.contains(&section)
    }

    fn smooth_scroll_to(&self, section: Section) {
        self.scrolled.lock().expect("scroll lock").push(section);
    }
}

#[derive(Debug, Clone)]
pub struct CapturedUpload {
    pub path: &'static str,
    pub field: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// In-process stand-in for the analysis service, bound to an ephemeral port.
#[derive(Clone, Default)]
pub struct MockService {
    pub uploads: Arc<tokio::sync::Mutex<Vec<CapturedUpload>>>,
    failure: Option<(u16, &'static str)>,
}

impl MockService {
    pub async fn uploads(&self) -> Vec<CapturedUpload> {
        self.uploads.lock().await.clone()
    }
}

pub async fn spawn_mock_service(
    failure: Option<(u16, &'static str)>,
) -> anyhow::Result<(String, MockService)> {
    use axum::{
        routing::{get, post},
        Router,
    };

    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = MockService {
        uploads: Arc::default(),
        failure,
    };
    let app = Router::new()
        .route("/analyze", post(mock_breast))
        .route("/lung/analyze", post(mock_lung))
        .route("/fairness", get(mock_fairness))
        .route("/not-json", post(|| async { "definitely not json" }))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

async fn mock_breast(
    axum::extract::State(state): axum::extract::State<MockService>,
    multipart: axum::extract::Multipart,
) -> axum::response::Response {
    mock_analyze(state, "/analyze", multipart, breast_payload()).await
}

async fn mock_lung(
    axum::extract::State(state): axum::extract::State<MockService>,
    multipart: axum::extract::Multipart,
) -> axum::response::Response {
    mock_analyze(state, "/lung/analyze", multipart, lung_payload()).await
}

async fn mock_analyze(
    state: MockService,
    path: &'static str,
    mut multipart: axum::extract::Multipart,
    payload: Value,
) -> axum::response::Response {
    use axum::{http::StatusCode, response::IntoResponse, Json};

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        };
        let name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        };
        state.uploads.lock().await.push(CapturedUpload {
            path,
            field: name,
            file_name,
            content_type,
            bytes,
        });
    }

    if let Some((status, body)) = state.failure {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, body).into_response();
    }
    Json(payload).into_response()
}

async fn mock_fairness() -> axum::Json<Value> {
    axum::Json(json!({
        "overall_accuracy": 0.51,
        "fairness_metrics": {
            "0": { "accuracy": 0.52, "count": 41 },
            "1": { "accuracy": 0.51, "count": 53 }
        },
        "disparity_index": 0.09
    }))
}
