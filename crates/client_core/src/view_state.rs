//! The single source of truth for what the front-end renders.
//!
//! `ViewState` only changes through [`ViewState::dispatch`]; every change
//! reports a [`ViewTransition`] that presentation effects (scrolling,
//! animations) subscribe to.

use chrono::{DateTime, Utc};
use shared::{
    domain::{DatasetKind, SubmissionId, Theme},
    protocol::{AnalysisResult, BreastAnalysis, LungAnalysis},
};
use tracing::debug;

use crate::upload::AnalysisCompletion;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewAction {
    ToggleTheme,
    AnalysisCompleted(AnalysisCompletion),
    /// Starts the session over; the only way back to "not uploaded".
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewTransition {
    ThemeChanged(Theme),
    UploadCompleted {
        submission_id: SubmissionId,
        dataset: DatasetKind,
    },
    Reset,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    theme: Theme,
    has_uploaded: bool,
    result: Option<AnalysisResult>,
    completed_at: Option<DateTime<Utc>>,
}

impl ViewState {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            ..Self::default()
        }
    }

    pub fn dispatch(&mut self, action: ViewAction) -> ViewTransition {
        match action {
            ViewAction::ToggleTheme => ViewTransition::ThemeChanged(self.toggle_theme()),
            ViewAction::AnalysisCompleted(completion) => {
                let dataset = completion.dataset();
                self.apply_analysis_result(completion.result);
                self.completed_at = Some(completion.completed_at);
                ViewTransition::UploadCompleted {
                    submission_id: completion.submission_id,
                    dataset,
                }
            }
            ViewAction::Reset => {
                let theme = self.theme;
                *self = Self::new(theme);
                ViewTransition::Reset
            }
        }
    }

    /// Marks the session as uploaded and makes `result` the only active
    /// result. The variant decides which slot it lands in.
    pub fn apply_analysis_result(&mut self, result: AnalysisResult) {
        debug!(dataset = %result.kind(), "applying analysis result");
        self.has_uploaded = true;
        self.result = Some(result);
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn has_uploaded(&self) -> bool {
        self.has_uploaded
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn breast_result(&self) -> Option<&BreastAnalysis> {
        match &self.result {
            Some(AnalysisResult::Breast(result)) => Some(result),
            _ => None,
        }
    }

    pub fn lung_result(&self) -> Option<&LungAnalysis> {
        match &self.result {
            Some(AnalysisResult::Lung(result)) => Some(result),
            _ => None,
        }
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

#[cfg(test)]
#[path = "tests/view_state_tests.rs"]
mod tests;
