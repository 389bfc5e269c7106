//! Top-level application container.

use std::sync::Arc;

use shared::domain::{Section, Theme};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{
    config::ClientSettings,
    dashboard::{select_view, DashboardModel, DashboardView},
    routing::{EndpointError, Endpoints},
    scroll::{Navigator, ScrollOrchestrator},
    service::{AnalysisService, HttpAnalysisService, ServiceError},
    upload::{SubmitOutcome, UploadController},
    view_state::{ViewAction, ViewState, ViewTransition},
    ClientEvent,
};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum SessionSetupError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] ServiceError),
}

/// Owns the [`ViewState`] and is its only writer. Everything else reads it
/// through [`AnalysisSession::view`].
pub struct AnalysisSession {
    view: ViewState,
    controller: UploadController,
    scroll: ScrollOrchestrator,
    events: broadcast::Sender<ClientEvent>,
}

impl AnalysisSession {
    pub fn new(
        service: Arc<dyn AnalysisService>,
        endpoints: Endpoints,
        settings: &ClientSettings,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let controller = UploadController::new(
            service,
            endpoints,
            settings.preprocessing_delay(),
            events.clone(),
        );
        Self::with_controller(controller, navigator)
    }

    /// Builds a session that talks to the configured HTTP service.
    pub fn from_settings(
        settings: &ClientSettings,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, SessionSetupError> {
        let endpoints = settings.endpoints()?;
        let service = HttpAnalysisService::new(settings.request_timeout())?;
        Ok(Self::new(Arc::new(service), endpoints, settings, navigator))
    }

    pub fn with_controller(controller: UploadController, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            view: ViewState::default(),
            events: controller.event_sender(),
            controller,
            scroll: ScrollOrchestrator::new(navigator),
        }
    }

    pub fn controller(&self) -> &UploadController {
        &self.controller
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn dashboard(&self) -> DashboardView {
        select_view(&self.view)
    }

    pub fn dashboard_model(&self) -> DashboardModel {
        DashboardModel::project(&self.view)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Submits the selected file and applies the outcome.
    pub async fn submit(&mut self) -> SubmitOutcome {
        let outcome = self.controller.submit().await;
        self.apply_outcome(&outcome);
        outcome
    }

    /// Applies a controller outcome produced elsewhere, e.g. on a spawned
    /// task. Only completions touch the view; anything else is a no-op, and
    /// so is a completion from before the last [`AnalysisSession::reset`].
    pub fn apply_outcome(&mut self, outcome: &SubmitOutcome) -> Option<Section> {
        let SubmitOutcome::Completed(completion) = outcome else {
            return None;
        };
        let current = self.controller.generation();
        if completion.generation != current {
            debug!(
                submission_id = %completion.submission_id,
                generation = completion.generation,
                current,
                "ignoring completion from before a reset"
            );
            return None;
        }
        match self
            .view
            .dispatch(ViewAction::AnalysisCompleted(completion.clone()))
        {
            ViewTransition::UploadCompleted {
                submission_id,
                dataset,
            } => {
                info!(%submission_id, %dataset, "results ready");
                let target = self.scroll.on_upload_complete(submission_id);
                if let Some(section) = target {
                    self.emit(ClientEvent::Navigated(section));
                }
                target
            }
            ViewTransition::ThemeChanged(_) | ViewTransition::Reset => None,
        }
    }

    pub fn toggle_theme(&mut self) -> Theme {
        let theme = match self.view.dispatch(ViewAction::ToggleTheme) {
            ViewTransition::ThemeChanged(theme) => theme,
            _ => self.view.theme(),
        };
        self.emit(ClientEvent::ThemeChanged(theme));
        theme
    }

    pub fn get_started(&self) -> Option<Section> {
        let target = self.scroll.on_get_started();
        if let Some(section) = target {
            self.emit(ClientEvent::Navigated(section));
        }
        target
    }

    /// Abandons any in-flight request and returns to the locked dashboard.
    pub fn reset(&mut self) {
        self.controller.start_over();
        self.view.dispatch(ViewAction::Reset);
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
