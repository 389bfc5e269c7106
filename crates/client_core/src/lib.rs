//! Client-side orchestration for GeneBridge: file selection, dispatch to the
//! remote analysis service, response classification, and the view state that
//! decides which dashboard is shown.

use shared::domain::{DatasetKind, Section, SubmissionId, Theme};

pub mod config;
pub mod dashboard;
pub mod routing;
pub mod scroll;
pub mod service;
pub mod session;
pub mod upload;
pub mod view_state;

pub use config::{load_settings, ClientSettings};
pub use dashboard::{select_view, DashboardModel, DashboardView};
pub use routing::{classify_file_name, EndpointError, Endpoints};
pub use scroll::{Navigator, ScrollOrchestrator};
pub use service::{AnalysisService, BaselineError, HttpAnalysisService, ServiceError};
pub use session::{AnalysisSession, SessionSetupError};
pub use upload::{
    AnalysisCompletion, IgnoreReason, SelectedFile, SelectionError, SelectionSource,
    SubmitOutcome, UploadController, UploadState, UploadStep,
};
pub use view_state::{ViewAction, ViewState, ViewTransition};

/// Notifications for a presentation layer. Nothing in the core depends on
/// anyone listening.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    FileSelected {
        name: String,
        size_bytes: u64,
        source: SelectionSource,
    },
    DragStateChanged(bool),
    StepChanged {
        submission_id: SubmissionId,
        step: UploadStep,
    },
    AnalysisCompleted {
        submission_id: SubmissionId,
        dataset: DatasetKind,
    },
    AnalysisFailed {
        submission_id: SubmissionId,
        message: String,
    },
    AnalysisCancelled {
        submission_id: SubmissionId,
    },
    ThemeChanged(Theme),
    Navigated(Section),
}

#[cfg(test)]
#[path = "tests/fixtures.rs"]
mod test_fixtures;
