use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlates one dispatched analysis request across log lines and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub Uuid);

impl SubmissionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Which analysis domain a file or result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Breast,
    Lung,
}

impl DatasetKind {
    pub fn is_lung(self) -> bool {
        self == DatasetKind::Lung
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DatasetKind::Breast => "breast",
            DatasetKind::Lung => "lung",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

/// Named page sections a navigation request can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Hero,
    Process,
    Upload,
    Analysis,
    Additional,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Hero,
        Section::Process,
        Section::Upload,
        Section::Analysis,
        Section::Additional,
    ];

    pub fn anchor(self) -> &'static str {
        match self {
            Section::Hero => "hero-section",
            Section::Process => "process-section",
            Section::Upload => "upload-section",
            Section::Analysis => "analysis-section",
            Section::Additional => "additional-section",
        }
    }
}
