//! Deterministic stand-ins for the breast and lung models.
//!
//! Uploads are read as CSV or TSV with a header row. When the columns the
//! real models key on are present their values shape the response; otherwise
//! fixed reference numbers are returned.

use std::collections::BTreeMap;

use shared::{
    domain::DatasetKind,
    protocol::{BreastAnalysis, FairnessBaseline, FairnessMetric, LungAnalysis},
};
use tracing::warn;

pub const ANCESTRY_COLUMNS: [&str; 2] = ["ancestry", "race"];
pub const HER2_COLUMN: &str = "her2_status";
pub const SUBTYPE_COLUMN: &str = "cancer_subtype";

const BREAST_RISK_SCORE: f64 = 0.62;
const BREAST_DISPARITY: f64 = 0.09;
const BREAST_ACCURACY: f64 = 0.51;
const LUNG_DISPARITY: f64 = 0.13;
const LUNG_ACCURACY: f64 = 0.74;
const BIAS_AMPLIFICATION: f64 = 1.5;

const SUBTYPE_LABELS: [(&str, &str); 3] = [
    ("0", "Adenocarcinoma"),
    ("1", "Squamous Cell"),
    ("2", "SCLC"),
];

/// Column-wise view over an uploaded table.
#[derive(Debug, Default, PartialEq)]
pub struct UploadSummary {
    pub rows: u64,
    columns: Vec<String>,
    records: Vec<Vec<String>>,
}

impl UploadSummary {
    /// Reads `bytes` as CSV, or TSV when the header row holds a tab. Lines
    /// starting with `#` are skipped. Reading stops at the first record the
    /// reader rejects.
    pub fn parse(bytes: &[u8]) -> Self {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(sniff_delimiter(bytes))
            .has_headers(true)
            .comment(Some(b'#'))
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let columns = match reader.byte_headers() {
            Ok(headers) => headers
                .iter()
                .map(|column| String::from_utf8_lossy(column).to_ascii_lowercase())
                .collect::<Vec<_>>(),
            Err(error) => {
                warn!(%error, "upload has no readable header row");
                return Self::default();
            }
        };
        if columns.iter().all(String::is_empty) {
            return Self::default();
        }

        let mut records = Vec::new();
        for record in reader.byte_records() {
            match record {
                Ok(record) => records.push(
                    record
                        .iter()
                        .map(|cell| String::from_utf8_lossy(cell).into_owned())
                        .collect(),
                ),
                Err(error) => {
                    warn!(%error, rows = records.len(), "stopped reading upload");
                    break;
                }
            }
        }

        Self {
            rows: records.len() as u64,
            columns,
            records,
        }
    }

    /// Counts the values of the first matching column, if any is present.
    pub fn value_counts(&self, names: &[&str]) -> Option<BTreeMap<String, u64>> {
        let index = self
            .columns
            .iter()
            .position(|column| names.contains(&column.as_str()))?;
        let mut counts = BTreeMap::new();
        for value in self.records.iter().filter_map(|record| record.get(index)) {
            if !value.is_empty() {
                *counts.entry(value.clone()).or_insert(0) += 1;
            }
        }
        Some(counts)
    }
}

fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let header = bytes
        .split(|byte| *byte == b'\n')
        .map(<[u8]>::trim_ascii)
        .find(|line| !line.is_empty() && !line.starts_with(b"#"));
    match header {
        Some(line) if line.contains(&b'\t') => b'\t',
        _ => b',',
    }
}

pub fn is_biased_upload(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().contains("biased")
}

pub fn fairness_baseline() -> FairnessBaseline {
    FairnessBaseline {
        overall_accuracy: BREAST_ACCURACY,
        fairness_metrics: metrics(&[("0", 0.52, 41), ("1", 0.51, 53), ("2", 0.55, 55), ("3", 0.45, 51)]),
        disparity_index: BREAST_DISPARITY,
    }
}

pub fn analyze_breast(file_name: &str, summary: &UploadSummary) -> BreastAnalysis {
    let is_biased = is_biased_upload(file_name);
    let risk_score = summary
        .value_counts(&[HER2_COLUMN])
        .and_then(|counts| positive_share(&counts))
        .unwrap_or(BREAST_RISK_SCORE);
    let risk_score = if is_biased {
        (risk_score * BREAST_ACCURACY).clamp(0.0, 1.0)
    } else {
        risk_score
    };
    let disparity_index = amplify(BREAST_DISPARITY, is_biased);
    let risk_label = if risk_score > 0.5 { "High" } else { "Low" };

    BreastAnalysis {
        kind: Some(DatasetKind::Breast),
        risk_score,
        risk_label: risk_label.to_string(),
        fairness_metrics: fairness_baseline().fairness_metrics,
        disparity_index,
        demographic_distribution: demographics(summary),
        is_biased,
        insights: breast_insights(risk_score, disparity_index, is_biased),
    }
}

pub fn analyze_lung(file_name: &str, summary: &UploadSummary) -> LungAnalysis {
    let is_biased = is_biased_upload(file_name);
    let mut subtype_distribution = summary
        .value_counts(&[SUBTYPE_COLUMN])
        .filter(|counts| !counts.is_empty())
        .map(label_subtypes)
        .unwrap_or_else(|| {
            BTreeMap::from([
                ("Adenocarcinoma".to_string(), 31.0),
                ("SCLC".to_string(), 3.0),
                ("Squamous Cell".to_string(), 12.0),
            ])
        });
    if is_biased {
        for count in subtype_distribution.values_mut() {
            *count = (*count * LUNG_ACCURACY).max(1.0);
        }
    }
    let disparity_index = amplify(LUNG_DISPARITY, is_biased);

    LungAnalysis {
        kind: Some(DatasetKind::Lung),
        insights: lung_insights(&subtype_distribution, disparity_index, is_biased),
        subtype_distribution,
        disparity_index,
        fairness_metrics: metrics(&[("0", 0.81, 40), ("1", 0.72, 22), ("2", 0.68, 18), ("3", 0.77, 20)]),
        demographic_distribution: demographics(summary),
        is_biased,
        overall_accuracy: Some(LUNG_ACCURACY),
    }
}

fn metrics(groups: &[(&str, f64, u64)]) -> BTreeMap<String, FairnessMetric> {
    groups
        .iter()
        .map(|(group, accuracy, count)| {
            (
                (*group).to_string(),
                FairnessMetric {
                    accuracy: *accuracy,
                    count: *count,
                },
            )
        })
        .collect()
}

fn amplify(disparity: f64, is_biased: bool) -> f64 {
    if is_biased {
        disparity * BIAS_AMPLIFICATION
    } else {
        disparity
    }
}

fn demographics(summary: &UploadSummary) -> BTreeMap<String, u64> {
    summary
        .value_counts(&ANCESTRY_COLUMNS)
        .unwrap_or_default()
}

fn positive_share(counts: &BTreeMap<String, u64>) -> Option<f64> {
    let total: u64 = counts.values().sum();
    if total == 0 {
        return None;
    }
    let positive: u64 = counts
        .iter()
        .filter(|(value, _)| matches!(value.to_ascii_lowercase().as_str(), "1" | "positive" | "pos"))
        .map(|(_, count)| count)
        .sum();
    Some(positive as f64 / total as f64)
}

fn label_subtypes(counts: BTreeMap<String, u64>) -> BTreeMap<String, f64> {
    counts
        .into_iter()
        .map(|(code, count)| {
            let label = SUBTYPE_LABELS
                .iter()
                .find(|(known, _)| *known == code)
                .map_or(code.clone(), |(_, label)| (*label).to_string());
            (label, count as f64)
        })
        .collect()
}

fn breast_insights(risk_score: f64, disparity_index: f64, is_biased: bool) -> String {
    let mut text = format!(
        "**Summary**\n- Average HER2-positive risk is {:.1}%\n- Disparity across ancestry groups is {:.1}%\n",
        risk_score * 100.0,
        disparity_index * 100.0
    );
    if is_biased {
        text.push_str("- The cohort looks skewed; rebalance under-represented groups before acting on this score\n");
    }
    text
}

fn lung_insights(distribution: &BTreeMap<String, f64>, disparity_index: f64, is_biased: bool) -> String {
    let dominant = distribution
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map_or("none", |(label, _)| label.as_str());
    let mut text = format!(
        "**Subtypes**\n- Most samples are predicted {dominant}\n- Disparity across ancestry groups is {:.1}%\n- Confirm with EGFR/KRAS molecular testing\n",
        disparity_index * 100.0
    );
    if is_biased {
        text.push_str("- Subtype counts were scaled down for a skewed cohort\n");
    }
    text
}

#[cfg(test)]
#[path = "tests/analysis_tests.rs"]
mod tests;
