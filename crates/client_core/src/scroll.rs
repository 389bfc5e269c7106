//! Turns view transitions into navigation requests.

use std::sync::Arc;

use shared::domain::{Section, SubmissionId};
use tracing::debug;

/// Presentation-layer capability that actually moves the viewport.
pub trait Navigator: Send + Sync {
    fn is_mounted(&self, section: Section) -> bool;
    fn smooth_scroll_to(&self, section: Section);
}

pub struct ScrollOrchestrator {
    navigator: Arc<dyn Navigator>,
    last_upload: Option<SubmissionId>,
}

impl ScrollOrchestrator {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self {
            navigator,
            last_upload: None,
        }
    }

    /// Scrolls to the results once per successful upload. Repeated calls for
    /// the same submission are ignored.
    pub fn on_upload_complete(&mut self, submission_id: SubmissionId) -> Option<Section> {
        if self.last_upload == Some(submission_id) {
            debug!(%submission_id, "upload scroll already handled");
            return None;
        }
        self.last_upload = Some(submission_id);
        self.navigate(Section::Analysis)
    }

    pub fn on_get_started(&self) -> Option<Section> {
        self.navigate(Section::Process)
    }

    fn navigate(&self, section: Section) -> Option<Section> {
        if !self.navigator.is_mounted(section) {
            debug!(section = section.anchor(), "navigation target not mounted; dropping");
            return None;
        }
        self.navigator.smooth_scroll_to(section);
        Some(section)
    }
}
