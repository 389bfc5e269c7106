//! Plain-text rendering of dashboards and progress for the terminal.

use std::fmt::Write as _;

use client_core::{
    dashboard::{GroupAccuracy, Slice, LOCKED_MESSAGE, LOCKED_TITLE},
    ClientEvent, DashboardModel, UploadStep,
};
use shared::protocol::FairnessBaseline;

const BAR_WIDTH: usize = 30;

pub fn event_line(event: &ClientEvent) -> Option<String> {
    match event {
        ClientEvent::FileSelected {
            name, size_bytes, ..
        } => Some(format!("Selected {name} ({size_bytes} bytes)")),
        ClientEvent::StepChanged { step, .. } => match step {
            UploadStep::Preprocessing => Some("Preprocessing data...".to_string()),
            UploadStep::Analyzing => Some("Analyzing genetic markers...".to_string()),
            UploadStep::Idle => None,
        },
        ClientEvent::AnalysisCancelled { .. } => Some("Analysis cancelled".to_string()),
        ClientEvent::Navigated(section) => Some(format!("-> #{}", section.anchor())),
        ClientEvent::DragStateChanged(_)
        | ClientEvent::AnalysisCompleted { .. }
        | ClientEvent::AnalysisFailed { .. }
        | ClientEvent::ThemeChanged(_) => None,
    }
}

pub fn dashboard(model: &DashboardModel) -> String {
    let mut out = String::new();
    match model {
        DashboardModel::Locked => {
            let _ = writeln!(out, "{LOCKED_TITLE}\n{LOCKED_MESSAGE}");
        }
        DashboardModel::Breast(model) => {
            let _ = writeln!(out, "HER2 Breast Cancer Risk");
            let _ = writeln!(out, "  Risk score:        {:.1}% ({})", model.risk_pct, model.risk_label);
            let _ = writeln!(out, "  Equity confidence: {:.1}%", model.confidence_pct);
            let _ = writeln!(out, "  Disparity index:   {:.1}%", model.disparity_pct);
            write_bias(&mut out, model.is_biased);
            write_fairness(&mut out, &model.fairness);
            write_slices(&mut out, "Demographics", &model.demographics);
            write_insights(&mut out, &model.insights);
        }
        DashboardModel::Lung(model) => {
            let _ = writeln!(out, "Lung Cancer Subtypes");
            let _ = writeln!(out, "  Confidence:        {:.1}%", model.confidence_pct);
            let _ = writeln!(out, "  Disparity index:   {:.1}%", model.disparity_pct);
            write_bias(&mut out, model.is_biased);
            write_slices(&mut out, "Subtype distribution", &model.subtypes);
            write_fairness(&mut out, &model.fairness);
            write_slices(&mut out, "Demographics", &model.demographics);
            write_insights(&mut out, &model.insights);
        }
    }
    out
}

pub fn baseline(baseline: &FairnessBaseline) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Model fairness baseline");
    let _ = writeln!(out, "  Overall accuracy: {:.1}%", baseline.overall_accuracy * 100.0);
    let _ = writeln!(out, "  Disparity index:  {:.1}%", baseline.disparity_index * 100.0);
    for (group, metric) in &baseline.fairness_metrics {
        let _ = writeln!(
            out,
            "  {:<10} {} {:.1}% (n={})",
            client_core::dashboard::ancestry_label(group),
            bar(metric.accuracy),
            metric.accuracy * 100.0,
            metric.count
        );
    }
    out
}

fn write_bias(out: &mut String, is_biased: bool) {
    if is_biased {
        let _ = writeln!(out, "  ! Dataset flagged as biased");
    }
}

fn write_fairness(out: &mut String, groups: &[GroupAccuracy]) {
    if groups.is_empty() {
        return;
    }
    let _ = writeln!(out, "\nAccuracy by group");
    for group in groups {
        let _ = writeln!(
            out,
            "  {:<10} {} {:.1}% (n={})",
            group.group,
            bar(group.accuracy_pct / 100.0),
            group.accuracy_pct,
            group.count
        );
    }
}

fn write_slices(out: &mut String, title: &str, slices: &[Slice]) {
    let total: f64 = slices.iter().map(|slice| slice.value).sum();
    if slices.is_empty() || total <= 0.0 {
        return;
    }
    let _ = writeln!(out, "\n{title}");
    for slice in slices {
        let share = slice.value / total;
        let _ = writeln!(
            out,
            "  {:<16} {} {:.1}%",
            slice.label,
            bar(share),
            share * 100.0
        );
    }
}

fn write_insights(out: &mut String, insights: &str) {
    if insights.trim().is_empty() {
        return;
    }
    let _ = writeln!(out, "\nInsights");
    for line in insights.lines() {
        let _ = writeln!(out, "  {}", line.replace("**", ""));
    }
}

fn bar(fraction: f64) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::Section;

    #[test]
    fn locked_dashboard_shows_placeholder() {
        let text = dashboard(&DashboardModel::Locked);
        assert!(text.contains(LOCKED_TITLE));
        assert!(text.contains(LOCKED_MESSAGE));
    }

    #[test]
    fn bar_is_clamped_to_width() {
        assert_eq!(bar(2.0), "#".repeat(BAR_WIDTH));
        assert_eq!(bar(-1.0), ".".repeat(BAR_WIDTH));
        assert_eq!(bar(0.5).matches('#').count(), BAR_WIDTH / 2);
    }

    #[test]
    fn progress_events_have_lines() {
        assert_eq!(
            event_line(&ClientEvent::Navigated(Section::Analysis)).as_deref(),
            Some("-> #analysis-section")
        );
        assert!(event_line(&ClientEvent::DragStateChanged(true)).is_none());
    }
}
