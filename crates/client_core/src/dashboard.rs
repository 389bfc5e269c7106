//! Dashboard selection and the display-ready numbers each dashboard shows.

use std::collections::BTreeMap;

use shared::protocol::{BreastAnalysis, FairnessMetric, LungAnalysis};

use crate::view_state::ViewState;

pub const LOCKED_TITLE: &str = "Upload Required";
pub const LOCKED_MESSAGE: &str = "Please upload your genetic data file to view the analysis.";

/// Confidence assumed for a biased lung dataset that reports no accuracy.
const BIASED_FALLBACK_ACCURACY: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardView {
    LockedPlaceholder,
    BreastDashboard,
    LungDashboard,
}

/// Picks the dashboard for `state`. Never panics, whatever the state holds.
pub fn select_view(state: &ViewState) -> DashboardView {
    if !state.has_uploaded() {
        return DashboardView::LockedPlaceholder;
    }
    if state.lung_result().is_some() {
        DashboardView::LungDashboard
    } else if state.breast_result().is_some() {
        DashboardView::BreastDashboard
    } else {
        DashboardView::LockedPlaceholder
    }
}

/// Maps encoded ancestry groups to their display label.
pub fn ancestry_label(group: &str) -> String {
    match group {
        "0" => "White".to_string(),
        "1" => "Black".to_string(),
        "2" => "Asian".to_string(),
        "3" => "Unknown".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupAccuracy {
    pub group: String,
    pub accuracy_pct: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreastDashboardModel {
    pub risk_pct: f64,
    pub risk_label: String,
    pub confidence_pct: f64,
    pub disparity_pct: f64,
    pub fairness: Vec<GroupAccuracy>,
    pub demographics: Vec<Slice>,
    pub is_biased: bool,
    pub insights: String,
}

impl BreastDashboardModel {
    pub fn from_result(result: &BreastAnalysis) -> Self {
        Self {
            risk_pct: percent(result.risk_score),
            risk_label: result.risk_label.clone(),
            confidence_pct: equity_confidence(result.disparity_index),
            disparity_pct: percent(result.disparity_index),
            fairness: fairness_bars(&result.fairness_metrics),
            demographics: demographic_slices(&result.demographic_distribution),
            is_biased: result.is_biased,
            insights: result.insights.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LungDashboardModel {
    pub subtypes: Vec<Slice>,
    pub confidence_pct: f64,
    pub disparity_pct: f64,
    pub fairness: Vec<GroupAccuracy>,
    pub demographics: Vec<Slice>,
    pub is_biased: bool,
    pub insights: String,
}

impl LungDashboardModel {
    pub fn from_result(result: &LungAnalysis) -> Self {
        // Biased datasets are judged by measured accuracy, not by spread.
        let confidence_pct = if result.is_biased {
            percent(result.overall_accuracy.unwrap_or(BIASED_FALLBACK_ACCURACY))
        } else {
            equity_confidence(result.disparity_index)
        };

        Self {
            subtypes: result
                .subtype_distribution
                .iter()
                .map(|(label, value)| Slice {
                    label: label.clone(),
                    value: *value,
                })
                .collect(),
            confidence_pct,
            disparity_pct: percent(result.disparity_index),
            fairness: fairness_bars(&result.fairness_metrics),
            demographics: demographic_slices(&result.demographic_distribution),
            is_biased: result.is_biased,
            insights: result.insights.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardModel {
    Locked,
    Breast(BreastDashboardModel),
    Lung(LungDashboardModel),
}

impl DashboardModel {
    /// Projects the view that [`select_view`] picks for `state`.
    pub fn project(state: &ViewState) -> Self {
        match (select_view(state), state.breast_result(), state.lung_result()) {
            (DashboardView::BreastDashboard, Some(result), _) => {
                DashboardModel::Breast(BreastDashboardModel::from_result(result))
            }
            (DashboardView::LungDashboard, _, Some(result)) => {
                DashboardModel::Lung(LungDashboardModel::from_result(result))
            }
            _ => DashboardModel::Locked,
        }
    }

    pub fn view(&self) -> DashboardView {
        match self {
            DashboardModel::Locked => DashboardView::LockedPlaceholder,
            DashboardModel::Breast(_) => DashboardView::BreastDashboard,
            DashboardModel::Lung(_) => DashboardView::LungDashboard,
        }
    }
}

fn percent(fraction: f64) -> f64 {
    fraction * 100.0
}

/// `(1 - disparity)` as a percentage, floored at zero; amplified
/// disparities can exceed 1.
fn equity_confidence(disparity_index: f64) -> f64 {
    percent(1.0 - disparity_index).clamp(0.0, 100.0)
}

fn fairness_bars(metrics: &BTreeMap<String, FairnessMetric>) -> Vec<GroupAccuracy> {
    metrics
        .iter()
        .map(|(group, metric)| GroupAccuracy {
            group: ancestry_label(group),
            accuracy_pct: percent(metric.accuracy),
            count: metric.count,
        })
        .collect()
}

fn demographic_slices(distribution: &BTreeMap<String, u64>) -> Vec<Slice> {
    distribution
        .iter()
        .map(|(label, count)| Slice {
            label: label.clone(),
            value: *count as f64,
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
