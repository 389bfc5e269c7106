//! Upload lifecycle: file selection, drag state, and the single in-flight
//! analysis request.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use futures::future::{AbortHandle, Abortable};
use shared::{
    domain::{DatasetKind, SubmissionId},
    protocol::{decode_analysis, AnalysisResult},
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    routing::{classify_file_name, Endpoints},
    service::{AnalysisService, ServiceError},
    ClientEvent,
};

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("'{}' has no file name", .0.display())]
    NoFileName(PathBuf),
}

/// A file picked by the user. Cloning shares the underlying bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        let mime_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            name,
            mime_type,
            bytes: Arc::from(bytes.into()),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, SelectionError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| SelectionError::NoFileName(path.to_path_buf()))?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| SelectionError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Size as shown next to the file name, e.g. `2.40 MB`.
    pub fn size_label(&self) -> String {
        format!("{:.2} MB", self.size_bytes() as f64 / BYTES_PER_MEGABYTE)
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    Picker,
    DragDrop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadStep {
    #[default]
    Idle,
    Preprocessing,
    Analyzing,
}

/// Snapshot of the upload form.
///
/// `is_processing` implies `step != Idle`; `error` is only ever set while
/// not processing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadState {
    pub selected_file: Option<SelectedFile>,
    pub is_dragging: bool,
    pub is_processing: bool,
    pub step: UploadStep,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisCompletion {
    pub submission_id: SubmissionId,
    /// Kind the request was routed under by file name.
    pub routed_as: DatasetKind,
    pub result: AnalysisResult,
    pub completed_at: DateTime<Utc>,
    /// Controller generation the request was started in.
    pub generation: u64,
}

impl AnalysisCompletion {
    pub fn dataset(&self) -> DatasetKind {
        self.result.kind()
    }

    pub fn is_lung(&self) -> bool {
        self.dataset().is_lung()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoFileSelected,
    AlreadyProcessing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Completed(AnalysisCompletion),
    Failed {
        submission_id: SubmissionId,
        message: String,
    },
    Cancelled {
        submission_id: SubmissionId,
    },
    Ignored(IgnoreReason),
}

struct InFlight {
    submission_id: SubmissionId,
    abort: AbortHandle,
}

#[derive(Default)]
struct ControllerState {
    upload: UploadState,
    in_flight: Option<InFlight>,
    generation: u64,
}

impl ControllerState {
    fn owns(&self, submission_id: SubmissionId) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.submission_id == submission_id)
    }

    fn finish(&mut self) {
        self.in_flight = None;
        self.upload.is_processing = false;
        self.upload.step = UploadStep::Idle;
    }
}

struct ControllerShared {
    service: Arc<dyn AnalysisService>,
    endpoints: Endpoints,
    preprocessing_delay: Duration,
    state: Mutex<ControllerState>,
    events: broadcast::Sender<ClientEvent>,
}

impl ControllerShared {
    /// The guard is never held across an await point.
    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the upload form state and the one request it may have in flight.
///
/// Handles are cheap to clone and share state, so a front-end can await
/// [`UploadController::submit`] on a spawned task while the rest of the
/// session stays interactive.
#[derive(Clone)]
pub struct UploadController {
    inner: Arc<ControllerShared>,
}

impl UploadController {
    pub fn new(
        service: Arc<dyn AnalysisService>,
        endpoints: Endpoints,
        preprocessing_delay: Duration,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerShared {
                service,
                endpoints,
                preprocessing_delay,
                state: Mutex::new(ControllerState::default()),
                events,
            }),
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<ClientEvent> {
        self.inner.events.clone()
    }

    pub fn state(&self) -> UploadState {
        self.inner.lock_state().upload.clone()
    }

    pub fn is_processing(&self) -> bool {
        self.inner.lock_state().upload.is_processing
    }

    pub fn select_file(&self, file: SelectedFile, source: SelectionSource) {
        let event = ClientEvent::FileSelected {
            name: file.name().to_string(),
            size_bytes: file.size_bytes(),
            source,
        };
        {
            let mut state = self.inner.lock_state();
            debug!(file_name = file.name(), ?source, "file selected");
            state.upload.selected_file = Some(file);
            state.upload.error = None;
            // A running request keeps its own copy of the previous file.
            if !state.upload.is_processing {
                state.upload.step = UploadStep::Idle;
            }
        }
        self.emit(event);
    }

    pub fn drag_over(&self) {
        self.set_dragging(true);
    }

    pub fn drag_leave(&self) {
        self.set_dragging(false);
    }

    /// A drop without a file (e.g. dragged text) only ends the drag.
    pub fn drop_file(&self, file: Option<SelectedFile>) {
        self.set_dragging(false);
        if let Some(file) = file {
            self.select_file(file, SelectionSource::DragDrop);
        }
    }

    fn set_dragging(&self, dragging: bool) {
        let changed = {
            let mut state = self.inner.lock_state();
            let changed = state.upload.is_dragging != dragging;
            state.upload.is_dragging = dragging;
            changed
        };
        if changed {
            self.emit(ClientEvent::DragStateChanged(dragging));
        }
    }

    /// Sends the selected file for analysis.
    ///
    /// Issues at most one request. Calling this while a request is in flight
    /// (or with nothing selected) returns [`SubmitOutcome::Ignored`] and
    /// changes nothing. Dropping the returned future before it resolves
    /// cancels the request.
    pub async fn submit(&self) -> SubmitOutcome {
        let (submission_id, generation, file, registration) = {
            let mut state = self.inner.lock_state();
            if state.upload.is_processing {
                debug!("submit ignored: a request is already in flight");
                return SubmitOutcome::Ignored(IgnoreReason::AlreadyProcessing);
            }
            let Some(file) = state.upload.selected_file.clone() else {
                debug!("submit ignored: no file selected");
                return SubmitOutcome::Ignored(IgnoreReason::NoFileSelected);
            };

            let submission_id = SubmissionId::new();
            let (abort, registration) = AbortHandle::new_pair();
            state.upload.is_processing = true;
            state.upload.step = UploadStep::Preprocessing;
            state.upload.error = None;
            state.in_flight = Some(InFlight {
                submission_id,
                abort,
            });
            (submission_id, state.generation, file, registration)
        };
        self.emit(ClientEvent::StepChanged {
            submission_id,
            step: UploadStep::Preprocessing,
        });

        let routed_as = classify_file_name(file.name());
        let endpoint = self.inner.endpoints.for_kind(routed_as).clone();
        let mut guard = CancelOnDrop {
            shared: &self.inner,
            submission_id,
            armed: true,
        };

        let work = async {
            tokio::time::sleep(self.inner.preprocessing_delay).await;
            self.advance_to_analyzing(submission_id);
            info!(
                %submission_id,
                dataset = %routed_as,
                %endpoint,
                file_name = file.name(),
                "dispatching analysis request"
            );
            self.inner.service.analyze(&endpoint, &file).await
        };
        let response = Abortable::new(work, registration).await;
        guard.armed = false;

        let Ok(response) = response else {
            return SubmitOutcome::Cancelled { submission_id };
        };
        let decoded = response.and_then(|body| {
            decode_analysis(body, routed_as).map_err(ServiceError::Malformed)
        });

        let outcome = {
            let mut state = self.inner.lock_state();
            if !state.owns(submission_id) {
                // cancel() won the race and already reset the form.
                return SubmitOutcome::Cancelled { submission_id };
            }
            state.finish();
            match decoded {
                Ok(result) => {
                    state.upload.error = None;
                    SubmitOutcome::Completed(AnalysisCompletion {
                        submission_id,
                        routed_as,
                        result,
                        completed_at: Utc::now(),
                        generation,
                    })
                }
                Err(err) => {
                    let message = err.to_string();
                    state.upload.error = Some(message.clone());
                    SubmitOutcome::Failed {
                        submission_id,
                        message,
                    }
                }
            }
        };

        match &outcome {
            SubmitOutcome::Completed(completion) => {
                if completion.dataset() != routed_as {
                    info!(
                        %submission_id,
                        routed_as = %routed_as,
                        reported = %completion.dataset(),
                        "service reported a different dataset kind than the file name implied"
                    );
                }
                info!(%submission_id, dataset = %completion.dataset(), "analysis completed");
                self.emit(ClientEvent::AnalysisCompleted {
                    submission_id,
                    dataset: completion.dataset(),
                });
            }
            SubmitOutcome::Failed { message, .. } => {
                warn!(%submission_id, error = %message, "analysis failed");
                self.emit(ClientEvent::AnalysisFailed {
                    submission_id,
                    message: message.clone(),
                });
            }
            SubmitOutcome::Cancelled { .. } | SubmitOutcome::Ignored(_) => {}
        }
        outcome
    }

    /// Abandons the in-flight request, if any. The form returns to idle
    /// without an error. Returns whether anything was cancelled.
    pub fn cancel(&self) -> bool {
        let submission_id = {
            let mut state = self.inner.lock_state();
            let Some(in_flight) = state.in_flight.take() else {
                return false;
            };
            in_flight.abort.abort();
            state.finish();
            state.upload.error = None;
            in_flight.submission_id
        };
        info!(%submission_id, "analysis request cancelled");
        self.emit(ClientEvent::AnalysisCancelled { submission_id });
        true
    }

    /// Cancels any in-flight request and starts a new generation. Completions
    /// carrying an older generation are stale and should not be applied.
    pub fn start_over(&self) -> u64 {
        self.cancel();
        let generation = {
            let mut state = self.inner.lock_state();
            state.generation += 1;
            state.generation
        };
        debug!(generation, "controller generation advanced");
        generation
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock_state().generation
    }

    fn advance_to_analyzing(&self, submission_id: SubmissionId) {
        let advanced = {
            let mut state = self.inner.lock_state();
            if state.owns(submission_id) && state.upload.step == UploadStep::Preprocessing {
                state.upload.step = UploadStep::Analyzing;
                true
            } else {
                false
            }
        };
        if advanced {
            self.emit(ClientEvent::StepChanged {
                submission_id,
                step: UploadStep::Analyzing,
            });
        }
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.inner.events.send(event);
    }
}

/// Resets the form if a `submit()` future is dropped mid-request.
struct CancelOnDrop<'a> {
    shared: &'a ControllerShared,
    submission_id: SubmissionId,
    armed: bool,
}

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.shared.lock_state();
        if !state.owns(self.submission_id) {
            return;
        }
        if let Some(in_flight) = state.in_flight.take() {
            in_flight.abort.abort();
            state.finish();
            state.upload.error = None;
            debug!(submission_id = %self.submission_id, "abandoned analysis request on teardown");
            let _ = self.shared.events.send(ClientEvent::AnalysisCancelled {
                submission_id: self.submission_id,
            });
        }
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
